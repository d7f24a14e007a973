//! End-to-end filtering across the local DB and custom sources

use flex_core::session::MY_VERSIONS_SHEET;
use flex_core::{
    apply_filter, list_all_tables, on_edit, CatalogKind, CellValue, EditEvent, EditOutcome, FilterOutcome, FlexConfig, Grid,
    MemoryProperties, MemoryStore, RecordingUi, Session, Sheet, Workbook,
};
use pretty_assertions::assert_eq;

const GAME: &str = "Game";
const FILTER: &str = "Filter Powers";

fn db() -> Workbook {
    Workbook::new("db", "DB", "admin@example.com").with_sheet(Sheet::with_grid(
        "Powers",
        Grid::from_text_rows(&[
            &["", "DropDown", "Type", "SubType", "TableName", "Source", "Usage", "Action", "AbilityName", "Effect"],
            &["Header", "", "", "", "", "", "", "", "", ""],
            &["", "Fire - Blast", "Elemental", "Fire", "Fire", "Core", "1/day", "Action", "Blast", "Burn"],
            &["", "Fire - Ward", "Elemental", "Fire", "Fire", "Core", "At will", "Reaction", "Ward", "Resist"],
            &["", "Ice - Shard", "Elemental", "Ice", "Ice", "Core", "At will", "Action", "Shard", "Chill"],
        ]),
    ))
}

fn codex(sources: &[&[&str]]) -> Workbook {
    let tags: &[&str] = &["", "SheetID", "SourceName", "Owner"];
    let header: &[&str] = &["Header", "", "", ""];
    let mut rows = vec![tags, header];
    rows.extend_from_slice(sources);
    Workbook::new("codex", "Codex", "me@example.com")
        .with_sheet(Sheet::with_grid(
            MY_VERSIONS_SHEET,
            Grid::from_text_rows(&[
                &["", "Version", "SSAbbr", "SSID"],
                &["Header", "", "", ""],
                &["", "3", "DB", "db"],
            ]),
        ))
        .with_sheet(Sheet::with_grid("CustomSources", Grid::from_text_rows(&rows)))
}

fn homebrew() -> Workbook {
    Workbook::new("cust1", "Homebrew", "me@example.com").with_sheet(Sheet::with_grid(
        "VerifiedPowers",
        Grid::from_text_rows(&[
            &["", "DropDown", "TableName", "Name", "Usage", "Action", "Effect", "Source"],
            &["Header", "", "", "", "", "", "", ""],
            &["", "Homebrew - Gust", "Homebrew", "Gust", "1/rest", "Bonus", "Push", "me@example.com"],
        ]),
    ))
}

fn character(filter_rows: &[&[&str]]) -> Workbook {
    Workbook::new("cs1", "Aria", "me@example.com")
        .with_sheet(Sheet::with_grid(FILTER, Grid::from_text_rows(filter_rows)))
        .with_sheet(Sheet::with_grid(
            GAME,
            Grid::from_text_rows(&[
                &["", "PowerDropDown1", "PowerUsage1", "PowerAction1", "PowerName1", "PowerEffect1"],
                &["PowerTableStart", "", "", "", "", ""],
                &["", "", "", "", "", ""],
                &["PowerTableEnd", "", "", "", "", ""],
            ]),
        ))
        .with_sheet(Sheet::new("PowerDataCache"))
}

fn config() -> FlexConfig {
    FlexConfig {
        codex_id: Some("codex".to_string()),
        user_email: "me@example.com".to_string(),
        ..FlexConfig::default()
    }
}

fn filter_names(store: &MemoryStore) -> Vec<String> {
    let grid = store
        .workbooks()
        .find(|w| w.id == "cs1")
        .unwrap()
        .sheet(FILTER)
        .unwrap()
        .grid();
    grid.rows()
        .skip(2)
        .map(|r| r.get(1).map(CellValue::to_string_value).unwrap_or_default())
        .filter(|n| !n.is_empty())
        .collect()
}

#[test]
fn test_bootstrap_select_filter_and_pick() {
    let mut store = MemoryStore::new();
    store.insert(db());
    store.insert(codex(&[&["", "cust1", "Homebrew", "Me"]]));
    store.insert(homebrew());
    store.insert(character(&[
        &["", "TableName", "Source", "IsActive"],
        &["Header", "", "", ""],
        &["", "", "", ""],
    ]));
    let mut props = MemoryProperties::new();
    let mut ui = RecordingUi::new();
    let config = config();

    {
        let mut session = Session::new(&mut store, &mut props, &mut ui, &config, "cs1");
        let outcome = apply_filter(&mut session, CatalogKind::Powers).unwrap();
        assert_eq!(outcome, FilterOutcome::Bootstrapped { tables: 3 });
    }
    assert_eq!(filter_names(&store), vec!["Fire", "Ice", "Cust - Homebrew"]);

    let mut session = Session::new(&mut store, &mut props, &mut ui, &config, "cs1");
    session
        .edit_sheet("cs1", FILTER, |sheet| {
            sheet.set_value(2, 3, CellValue::Boolean(true));
            sheet.set_value(4, 3, CellValue::Boolean(true));
            Ok(())
        })
        .unwrap();

    let outcome = apply_filter(&mut session, CatalogKind::Powers).unwrap();
    assert_eq!(outcome, FilterOutcome::Applied { entries: 3 });

    let picked = on_edit(&mut session, &EditEvent::new(GAME, 2, 1, "Homebrew - Gust")).unwrap();
    assert_eq!(picked, EditOutcome::Populated);
    drop(session);

    let cs = store.workbooks().find(|w| w.id == "cs1").unwrap();
    let game = cs.sheet(GAME).unwrap();
    let rule = game.validation_at(2, 1).unwrap();
    assert_eq!(rule.values, vec!["Fire - Blast", "Fire - Ward", "Homebrew - Gust"]);

    let details: Vec<String> = game.grid().row(2)[2..].iter().map(CellValue::to_string_value).collect();
    assert_eq!(details, vec!["1/rest", "Bonus", "Gust", "Push"]);
    assert_eq!(ui.alert_titles().last(), Some(&"✅ Success!"));
}

#[test]
fn test_listing_survives_a_failing_source() {
    let mut store = MemoryStore::new();
    store.insert(db());
    store.insert(codex(&[
        &["", "cust1", "Homebrew", "Me"],
        &["", "gone", "Ann's List", "ann@example.com"],
        &["", "cust2", "Storms", "bob@example.com"],
    ]));
    store.insert(homebrew());
    store.insert(Workbook::new("cust2", "Storms", "bob@example.com").with_sheet(Sheet::with_grid(
        "VerifiedPowers",
        Grid::from_text_rows(&[
            &["", "DropDown", "TableName", "Name", "Usage", "Action", "Effect"],
            &["Header", "", "", "", "", "", ""],
            &["", "Storm - Bolt", "Storm", "Bolt", "1/day", "Action", "Zap"],
        ]),
    )));
    store.insert(character(&[&["", "TableName", "Source", "IsActive"], &["Header", "", "", ""]]));
    let mut props = MemoryProperties::new();
    let mut ui = RecordingUi::new();
    let config = config();
    let mut session = Session::new(&mut store, &mut props, &mut ui, &config, "cs1");

    let listing = list_all_tables(&mut session, CatalogKind::Powers).unwrap();
    let names: Vec<&str> = listing.tables.iter().map(|t| t.table_name.as_str()).collect();
    assert_eq!(names, vec!["Fire", "Ice", "Cust - Homebrew", "Cust - Storm"]);
    assert_eq!(listing.warnings.len(), 1);
    assert!(listing.warnings[0].contains("Ann's List"));
}

#[test]
fn test_unreachable_source_is_skipped() {
    let mut store = MemoryStore::new();
    store.insert(db());
    store.insert(codex(&[
        &["", "gone", "Ann's List", "ann@example.com"],
        &["", "cust1", "Homebrew", "Me"],
    ]));
    store.insert(homebrew());
    store.insert(character(&[
        &["", "TableName", "Source", "IsActive"],
        &["Header", "", "", ""],
        &["", "Fire", "DB", "FALSE"],
        &["", "Cust - Homebrew", "Homebrew", "TRUE"],
        &["", "Cust - Retired", "Ann's List", "TRUE"],
    ]));
    let mut props = MemoryProperties::new();
    let mut ui = RecordingUi::new();
    let config = config();

    let outcome = {
        let mut session = Session::new(&mut store, &mut props, &mut ui, &config, "cs1");
        apply_filter(&mut session, CatalogKind::Powers).unwrap()
    };
    assert_eq!(outcome, FilterOutcome::Applied { entries: 1 });

    assert!(ui.toasts.iter().any(|t| t.contains("Ann's List") && t.contains("Skipping")));
    assert!(ui.alert_titles().contains(&"ℹ️ List Cleaned"));
    assert_eq!(filter_names(&store), vec!["Fire", "Cust - Homebrew"]);
}

#[test]
fn test_nothing_checked_leaves_game_sheet_alone() {
    let mut store = MemoryStore::new();
    store.insert(db());
    store.insert(codex(&[]));
    store.insert(character(&[
        &["", "TableName", "Source", "IsActive"],
        &["Header", "", "", ""],
        &["", "Fire", "DB", "FALSE"],
        &["", "Ice", "DB", ""],
    ]));
    let mut props = MemoryProperties::new();
    let mut ui = RecordingUi::new();
    let config = config();

    let outcome = {
        let mut session = Session::new(&mut store, &mut props, &mut ui, &config, "cs1");
        apply_filter(&mut session, CatalogKind::Powers).unwrap()
    };
    assert_eq!(outcome, FilterOutcome::NoSelection);

    let cs = store.workbooks().find(|w| w.id == "cs1").unwrap();
    assert!(cs.sheet(GAME).unwrap().validations().is_empty());
    assert_eq!(cs.sheet("PowerDataCache").unwrap().grid().row_count(), 0);
}
