//! Selection/filter engine
//!
//! Turns the player's checked tables into a flat cache sheet plus the
//! dropdown rules on the Game sheet. The steps of [`apply_filter`] run in a
//! fixed order; each one relies on the writes of the one before.

use crate::aggregator::{health_check, list_all_tables, registered_sources, TableListing, TableRef};
use crate::catalog::CatalogEntry;
use crate::error::Result;
use crate::grid::CellValue;
use crate::mutator::{replace_table_rows, HEADER_TAG};
use crate::schema::{CatalogKind, ColumnMap, Field, SourceConvention};
use crate::session::Session;
use crate::sheet::ColumnRange;
use tracing::{info, warn};

/// Game sheet carrying the dropdowns
pub const GAME_SHEET: &str = "Game";

/// Placeholder list value when no entries were selected
const EMPTY_LIST_PLACEHOLDER: &str = " ";

/// How [`apply_filter`] finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    /// The filter sheet was empty and has been filled with every table
    Bootstrapped { tables: usize },
    /// No table was checked; nothing was written
    NoSelection,
    /// Dropdowns now offer `entries` labels
    Applied { entries: usize },
}

/// Rewrite the filter sheet with every available table, all unchecked
pub fn refresh_available_tables(session: &mut Session<'_>, kind: CatalogKind) -> Result<usize> {
    let sheets = kind.sheets();
    session
        .ui
        .toast(&format!("⏳ Syncing {} tables...", sheets.noun.trim_end_matches('s')), &format!("Sync {} Tables", kind));

    let listing = list_all_tables(session, kind)?;
    let count = write_table_choices(session, kind, &listing)?;

    session.ui.alert(
        "✅ Success",
        &format!(
            "The <{}> sheet has been updated with {} tables.\n\nCheck the boxes for the lists you want to use and then run \"Filter {}\" again.",
            sheets.filter, count, kind
        ),
    );
    Ok(count)
}

fn write_table_choices(session: &mut Session<'_>, kind: CatalogKind, listing: &TableListing) -> Result<usize> {
    let sheets = kind.sheets();
    let active = session.active_id().to_string();
    let filter = session.active_data(sheets.filter, true)?;
    filter.header()?;
    let name_col = filter.require_col("tablename")?;
    let source_col = filter.require_col("source")?;
    let active_col = filter.require_col("isactive")?;
    let width = name_col.max(source_col).max(active_col) + 1;

    let rows: Vec<Vec<CellValue>> = listing
        .tables
        .iter()
        .map(|table| {
            let mut row = vec![CellValue::Empty; width];
            row[name_col] = CellValue::text(table.table_name.as_str());
            row[source_col] = CellValue::text(table.source.as_str());
            row[active_col] = CellValue::Boolean(false);
            row
        })
        .collect();

    session.edit_sheet(&active, sheets.filter, |sheet| replace_table_rows(sheet, &rows))?;
    Ok(rows.len())
}

/// Checked rows of the filter sheet, in sheet order
fn selected_tables(session: &mut Session<'_>, kind: CatalogKind) -> Result<(bool, Vec<TableRef>)> {
    let filter = session.active_data(kind.sheets().filter, true)?;
    let name_col = filter.require_col("tablename")?;
    let source_col = filter.require_col("source")?;
    let active_col = filter.require_col("isactive")?;

    let mut has_content = false;
    let mut selected = Vec::new();
    for (_, row) in filter.data_rows()? {
        let name = row.get(name_col).map(|c| c.to_string_value()).unwrap_or_default();
        if name.trim().is_empty() {
            continue;
        }
        has_content = true;
        if row.get(active_col).is_some_and(CellValue::is_checked) {
            selected.push(TableRef {
                table_name: name.trim().to_string(),
                source: row
                    .get(source_col)
                    .map(|c| c.to_string_value().trim().to_string())
                    .unwrap_or_default(),
            });
        }
    }
    Ok((has_content, selected))
}

/// Entries of the selected tables: DB tables first, then custom tables in
/// selection order
fn fetch_selected(session: &mut Session<'_>, kind: CatalogKind, selected: &[TableRef]) -> Result<Vec<CatalogEntry>> {
    let sheets = kind.sheets();
    let title = format!("Filter {}", kind);
    let mut entries = Vec::new();

    let db_id = session.local_db_id()?;
    let db = session.sheet_data(&db_id, sheets.db, false)?;
    let db_columns = ColumnMap::resolve(&db.tags, &db.name, SourceConvention::Local, &Field::ALL)?;

    let db_names: Vec<&str> = selected
        .iter()
        .filter(|t| !t.is_custom())
        .map(|t| t.table_name.as_str())
        .collect();
    if !db_names.is_empty() {
        for (_, row) in db.data_rows()? {
            let entry = CatalogEntry::from_row(row, &db_columns);
            if db_names.contains(&entry.table_name.as_str()) {
                entries.push(entry);
            }
        }
    }

    let custom: Vec<&TableRef> = selected.iter().filter(|t| t.is_custom()).collect();
    if custom.is_empty() {
        return Ok(entries);
    }

    let sources = registered_sources(session)?;
    for table in custom {
        let Some(source) = sources.iter().find(|s| s.name == table.source) else {
            warn!(source = %table.source, table = %table.table_name, "selected table has no registered source");
            continue;
        };

        session.ui.toast(&format!("Fetching from \"{}\"...", source.name), &title);
        let fetched = session
            .sheet_data(&source.sheet_id, sheets.verified, false)
            .and_then(|data| {
                let columns = ColumnMap::resolve(
                    &data.tags,
                    &data.name,
                    SourceConvention::Custom,
                    &[Field::Dropdown, Field::TableName],
                )?;
                let mut found = Vec::new();
                for (_, row) in data.data_rows()? {
                    let entry = CatalogEntry::from_row(row, &columns);
                    if entry.table_name == table.raw_name() {
                        found.push(entry);
                    }
                }
                Ok(found)
            });

        match fetched {
            Ok(found) => entries.extend(found),
            Err(e) => {
                warn!(source = %source.name, error = %e, "skipping unreachable custom source");
                session.ui.alert(
                    "⚠️ Warning",
                    &format!("Could not access the custom source \"{}\". Skipping.", source.name),
                );
            }
        }
    }

    Ok(entries)
}

fn write_cache(session: &mut Session<'_>, kind: CatalogKind, entries: &[CatalogEntry]) -> Result<()> {
    let active = session.active_id().to_string();
    let columns = ColumnMap::canonical();

    let mut rows = Vec::with_capacity(entries.len() + 1);
    let mut header = vec![CellValue::text("Header")];
    header.extend(Field::ALL.iter().map(|f| CellValue::text(f.heading())));
    rows.push(header);
    rows.extend(entries.iter().map(|e| e.to_row(&columns)));

    session.edit_sheet(&active, kind.sheets().cache, |sheet| {
        sheet.clear();
        sheet.write_block(0, 0, &rows);
        Ok(())
    })
}

fn apply_dropdowns(session: &mut Session<'_>, kind: CatalogKind, labels: Vec<String>) -> Result<usize> {
    let sheets = kind.sheets();
    let active = session.active_id().to_string();
    let game = session.active_data(GAME_SHEET, true)?;
    let first_row = game.tags.require_row(GAME_SHEET, sheets.range_start)?;
    let last_row = game.tags.require_row(GAME_SHEET, sheets.range_end)?;
    let columns: Vec<usize> = game
        .tags
        .cols_with_prefix(sheets.dropdown_prefix)
        .into_iter()
        .map(|(_, c)| c)
        .collect();

    let values = if labels.is_empty() {
        vec![EMPTY_LIST_PLACEHOLDER.to_string()]
    } else {
        labels
    };

    session.edit_sheet(&active, GAME_SHEET, |sheet| {
        for &c in &columns {
            sheet.set_list_validation(ColumnRange::new(c, first_row, last_row), values.clone());
        }
        Ok(())
    })?;
    Ok(columns.len())
}

/// Rebuild the dropdowns of `kind` from the player's checked tables
pub fn apply_filter(session: &mut Session<'_>, kind: CatalogKind) -> Result<FilterOutcome> {
    let sheets = kind.sheets();
    let title = format!("Filter {}", kind);
    session.ui.toast(&format!("⏳ Filtering {} lists...", sheets.noun.trim_end_matches('s')), &title);

    // 1. health check, or first-use bootstrap
    session.ui.toast(&format!("⚕️ Verifying {} sources...", sheets.noun.trim_end_matches('s')), &title);
    let listing = list_all_tables(session, kind)?;
    health_check(session, kind, &listing)?;

    let (has_content, selected) = selected_tables(session, kind)?;
    if !has_content {
        let tables = write_table_choices(session, kind, &listing)?;
        session.ui.alert(
            "✅ Success",
            &format!(
                "The <{}> sheet has been updated with {} tables.\n\nCheck the boxes for the lists you want to use and then run \"Filter {}\" again.",
                sheets.filter, tables, kind
            ),
        );
        return Ok(FilterOutcome::Bootstrapped { tables });
    }

    // 2. selection
    if selected.is_empty() {
        session.ui.alert(
            "ℹ️ No Filters Selected",
            &format!("Please check one or more boxes on the <{}> sheet before filtering.", sheets.filter),
        );
        return Ok(FilterOutcome::NoSelection);
    }

    // 3-4. fetch and concatenate
    session.ui.toast(&format!("Fetching all selected {}...", sheets.noun), &title);
    let entries = fetch_selected(session, kind, &selected)?;

    // 5. flat cache
    write_cache(session, kind, &entries)?;
    session.ui.toast(&format!("{} data cached locally.", kind), &title);

    // 6. dropdown rules
    let labels: Vec<String> = entries.iter().map(|e| e.dropdown.clone()).collect();
    let count = labels.len();
    let columns = apply_dropdowns(session, kind, labels)?;

    info!(kind = %kind, entries = count, columns, "filter applied");
    session.ui.alert(
        "✅ Success!",
        &format!("Your {} selection dropdowns have been updated with {} {}.", sheets.noun.trim_end_matches('s'), count, sheets.noun),
    );
    Ok(FilterOutcome::Applied { entries: count })
}

/// Whether a sheet's first row looks like a cache header
pub(crate) fn is_cache_header(row: &[CellValue]) -> bool {
    row.first()
        .and_then(CellValue::as_str)
        .is_some_and(|s| s.trim().eq_ignore_ascii_case(HEADER_TAG))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FlexConfig;
    use crate::grid::Grid;
    use crate::host::{MemoryProperties, MemoryStore, RecordingUi};
    use crate::session::MY_VERSIONS_SHEET;
    use crate::sheet::{Sheet, Workbook};

    fn character(filter_rows: &[&[&str]]) -> Workbook {
        Workbook::new("cs1", "Aria", "me")
            .with_sheet(Sheet::with_grid("Filter Powers", Grid::from_text_rows(filter_rows)))
            .with_sheet(Sheet::with_grid(
                GAME_SHEET,
                Grid::from_text_rows(&[
                    &["", "PowerDropDown1", "PowerUsage1"],
                    &["PowerTableStart", "", ""],
                    &["PowerTableEnd", "", ""],
                ]),
            ))
            .with_sheet(Sheet::new("PowerDataCache"))
    }

    fn store(filter_rows: &[&[&str]]) -> MemoryStore {
        let mut store = MemoryStore::new();
        store.insert(character(filter_rows));
        store.insert(
            Workbook::new("codex", "Codex", "me")
                .with_sheet(Sheet::with_grid(
                    MY_VERSIONS_SHEET,
                    Grid::from_text_rows(&[
                        &["", "Version", "SSAbbr", "SSID"],
                        &["Header", "", "", ""],
                        &["", "3", "DB", "db"],
                    ]),
                ))
                .with_sheet(Sheet::with_grid(
                    "CustomSources",
                    Grid::from_text_rows(&[&["", "SheetID", "SourceName", "Owner"], &["Header", "", "", ""]]),
                )),
        );
        store.insert(Workbook::new("db", "DB", "admin").with_sheet(Sheet::with_grid(
            "Powers",
            Grid::from_text_rows(&[
                &["", "DropDown", "Type", "SubType", "TableName", "Source", "Usage", "Action", "AbilityName", "Effect"],
                &["Header", "", "", "", "", "", "", "", "", ""],
                &["", "Fire - Blast", "", "", "Fire", "Core", "1/day", "Action", "Blast", "Burn"],
            ]),
        )));
        store
    }

    fn config() -> FlexConfig {
        FlexConfig {
            codex_id: Some("codex".to_string()),
            ..FlexConfig::default()
        }
    }

    #[test]
    fn test_no_selection_writes_nothing() {
        let mut store = store(&[
            &["", "TableName", "Source", "IsActive"],
            &["Header", "", "", ""],
            &["", "Fire", "DB", "FALSE"],
        ]);
        let mut props = MemoryProperties::new();
        let mut ui = RecordingUi::new();
        let config = config();
        let mut session = Session::new(&mut store, &mut props, &mut ui, &config, "cs1");

        let outcome = apply_filter(&mut session, CatalogKind::Powers).unwrap();
        assert_eq!(outcome, FilterOutcome::NoSelection);
        drop(session);

        let cs = store.workbooks().find(|w| w.id == "cs1").unwrap();
        assert!(cs.sheet(GAME_SHEET).unwrap().validations().is_empty());
        assert!(cs.sheet("PowerDataCache").unwrap().grid().row_count() == 0);
        assert_eq!(ui.alert_titles(), vec!["ℹ️ No Filters Selected"]);
    }

    #[test]
    fn test_empty_filter_sheet_bootstraps() {
        let mut store = store(&[&["", "TableName", "Source", "IsActive"], &["Header", "", "", ""], &["", "", "", ""]]);
        let mut props = MemoryProperties::new();
        let mut ui = RecordingUi::new();
        let config = config();
        let mut session = Session::new(&mut store, &mut props, &mut ui, &config, "cs1");

        let outcome = apply_filter(&mut session, CatalogKind::Powers).unwrap();
        assert_eq!(outcome, FilterOutcome::Bootstrapped { tables: 1 });
        drop(session);

        let cs = store.workbooks().find(|w| w.id == "cs1").unwrap();
        let filter = cs.sheet("Filter Powers").unwrap().grid();
        assert_eq!(filter.get(2, 1), &CellValue::text("Fire"));
        assert_eq!(filter.get(2, 3), &CellValue::Boolean(false));
    }

    #[test]
    fn test_applied_filter_sets_dropdowns_and_cache() {
        let mut store = store(&[
            &["", "TableName", "Source", "IsActive"],
            &["Header", "", "", ""],
            &["", "Fire", "DB", "TRUE"],
        ]);
        let mut props = MemoryProperties::new();
        let mut ui = RecordingUi::new();
        let config = config();
        let mut session = Session::new(&mut store, &mut props, &mut ui, &config, "cs1");

        let outcome = apply_filter(&mut session, CatalogKind::Powers).unwrap();
        assert_eq!(outcome, FilterOutcome::Applied { entries: 1 });
        drop(session);

        let cs = store.workbooks().find(|w| w.id == "cs1").unwrap();
        let rule = cs.sheet(GAME_SHEET).unwrap().validation_at(1, 1).unwrap();
        assert_eq!(rule.values, vec!["Fire - Blast".to_string()]);
        assert_eq!(rule.range, ColumnRange::new(1, 1, 2));

        let cache = cs.sheet("PowerDataCache").unwrap().grid();
        assert!(is_cache_header(cache.row(0)));
        assert_eq!(cache.get(1, 1), &CellValue::text("Fire - Blast"));
    }
}
