//! Catalog entries and the designer-facing DB build

use crate::cache::SheetData;
use crate::error::Result;
use crate::grid::CellValue;
use crate::mutator::replace_table_rows;
use crate::schema::{CatalogKind, ColumnMap, Field, SourceConvention};
use crate::session::Session;
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::info;

/// Master workbook abbreviation the DB is built from
pub const TABLES_ABBREVIATION: &str = "Tbls";

/// Sheets of the master workbook that hold powers
pub const POWER_SOURCE_SHEETS: [&str; 4] = ["Class", "Race", "CombatStyles", "Luck"];

const MAGIC_ITEM_CATEGORIES: [&str; 4] = ["Minor", "Lesser", "Greater", "Artifact"];

/// One power or magic item
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogEntry {
    pub dropdown: String,
    pub entry_type: String,
    pub sub_type: String,
    pub table_name: String,
    pub source: String,
    pub usage: String,
    pub action: String,
    pub ability_name: String,
    pub effect: String,
}

impl CatalogEntry {
    /// Read the mapped fields of one row
    pub fn from_row(row: &[CellValue], columns: &ColumnMap) -> Self {
        let mut entry = CatalogEntry::default();
        for field in Field::ALL {
            if let Some(cell) = columns.cell(row, field) {
                *entry.field_mut(field) = cell.to_string_value().trim().to_string();
            }
        }
        entry
    }

    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::Dropdown => &self.dropdown,
            Field::Type => &self.entry_type,
            Field::SubType => &self.sub_type,
            Field::TableName => &self.table_name,
            Field::Source => &self.source,
            Field::Usage => &self.usage,
            Field::Action => &self.action,
            Field::AbilityName => &self.ability_name,
            Field::Effect => &self.effect,
        }
    }

    pub fn field_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Dropdown => &mut self.dropdown,
            Field::Type => &mut self.entry_type,
            Field::SubType => &mut self.sub_type,
            Field::TableName => &mut self.table_name,
            Field::Source => &mut self.source,
            Field::Usage => &mut self.usage,
            Field::Action => &mut self.action,
            Field::AbilityName => &mut self.ability_name,
            Field::Effect => &mut self.effect,
        }
    }

    /// Lay the entry out as a full-width row for a sheet mapped by `columns`
    pub fn to_row(&self, columns: &ColumnMap) -> Vec<CellValue> {
        let mut row = vec![CellValue::Empty; columns.width()];
        for field in Field::ALL {
            if let Some(c) = columns.get(field) {
                row[c] = CellValue::text(self.field(field));
            }
        }
        row
    }

    /// Whether every data field is blank
    pub fn is_blank(&self) -> bool {
        Field::ALL.iter().all(|&f| self.field(f).is_empty())
    }

    /// Dropdown label in the style of `kind`
    pub fn label(&self, kind: CatalogKind) -> String {
        match kind {
            CatalogKind::Powers => format!(
                "{} - {}⚡ ({}, {}) ➡ {}",
                self.table_name, self.ability_name, self.usage, self.action, self.effect
            ),
            CatalogKind::MagicItems => format!(
                "{}{} - {} ({}, {}) ➡ {}",
                self.sub_type,
                category_emoji(&self.sub_type),
                self.ability_name,
                self.usage,
                self.action,
                self.effect
            ),
        }
    }
}

/// Emoji shown after a magic item category
pub fn category_emoji(category: &str) -> &'static str {
    match category {
        "Minor" => "🍺",
        "Lesser" => "🔮",
        "Greater" => "🪬",
        "Artifact" => "🌀",
        _ => "✨",
    }
}

fn category_rank(category: &str) -> usize {
    MAGIC_ITEM_CATEGORIES
        .iter()
        .position(|&c| c == category)
        .unwrap_or(MAGIC_ITEM_CATEGORIES.len())
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Sort entries the way the DB lists them
///
/// Powers sort by label; magic items by category rank, then name.
pub fn sort_entries(kind: CatalogKind, entries: &mut [CatalogEntry]) {
    match kind {
        CatalogKind::Powers => entries.sort_by(|a, b| compare_text(&a.dropdown, &b.dropdown)),
        CatalogKind::MagicItems => entries.sort_by(|a, b| {
            category_rank(&a.sub_type)
                .cmp(&category_rank(&b.sub_type))
                .then_with(|| compare_text(&a.ability_name, &b.ability_name))
        }),
    }
}

/// Drop entries whose label was already seen, keeping the first
pub fn dedupe_by_label(entries: Vec<CatalogEntry>) -> Vec<CatalogEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|e| seen.insert(e.dropdown.clone()))
        .collect()
}

fn is_placeholder(kind: CatalogKind, name: &str) -> bool {
    match kind {
        CatalogKind::Powers => name == "Power",
        CatalogKind::MagicItems => name.eq_ignore_ascii_case("item"),
    }
}

/// Columns a master sheet must carry to build labels
fn master_fields(kind: CatalogKind) -> &'static [Field] {
    match kind {
        CatalogKind::Powers => &[Field::TableName, Field::AbilityName, Field::Usage, Field::Action, Field::Effect],
        CatalogKind::MagicItems => &[Field::SubType, Field::AbilityName, Field::Usage, Field::Action, Field::Effect],
    }
}

/// Entries of one master sheet, with labels generated
pub fn entries_from_master(kind: CatalogKind, data: &SheetData) -> Result<Vec<CatalogEntry>> {
    let columns = ColumnMap::resolve(&data.tags, &data.name, SourceConvention::Local, master_fields(kind))?;

    let mut entries = Vec::new();
    for (_, row) in data.data_rows()? {
        let mut entry = CatalogEntry::from_row(row, &columns);
        if entry.ability_name.is_empty() || is_placeholder(kind, &entry.ability_name) {
            continue;
        }
        entry.dropdown = entry.label(kind);
        entries.push(entry);
    }
    Ok(entries)
}

/// Outcome of a DB rebuild
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub written: usize,
    /// Master sheets that were missing or had no Header row
    pub skipped_sheets: Vec<String>,
}

/// Rebuild the active DB workbook's catalog sheet from the master tables
pub fn build_catalog(session: &mut Session<'_>, kind: CatalogKind) -> Result<BuildReport> {
    let sheets = kind.sheets();
    let title = format!("Build {}", kind);
    session.ui.toast(&format!("⏳ Initializing {} build...", sheets.noun), &title);

    let version = session.config.current_version.clone();
    let tables_id = session.master_document_id(&version, TABLES_ABBREVIATION)?;
    let db_id = session.active_id().to_string();

    let dest = session.sheet_data(&db_id, sheets.db, true)?;
    dest.header()?;
    let dest_columns = ColumnMap::resolve(&dest.tags, &dest.name, SourceConvention::Local, &Field::ALL)?;

    let source_sheets: Vec<&str> = match kind {
        CatalogKind::Powers => POWER_SOURCE_SHEETS.to_vec(),
        CatalogKind::MagicItems => vec![sheets.db],
    };

    let mut report = BuildReport::default();
    let mut entries = Vec::new();
    for sheet_name in source_sheets {
        let has_sheet = session.workbook(&tables_id)?.sheet(sheet_name).is_some();
        if !has_sheet {
            session.ui.toast(&format!("⚠️ Could not find sheet: {}. Skipping.", sheet_name), &title);
            report.skipped_sheets.push(sheet_name.to_string());
            continue;
        }

        let data = session.sheet_data(&tables_id, sheet_name, false)?;
        if data.header().is_err() {
            session.ui.toast(&format!("⚠️ No \"Header\" tag in <{}>. Skipping.", sheet_name), &title);
            report.skipped_sheets.push(sheet_name.to_string());
            continue;
        }

        session.ui.toast(&format!("⏳ Processing <{}>...", sheet_name), &title);
        entries.extend(entries_from_master(kind, &data)?);
    }

    let mut entries = dedupe_by_label(entries);
    sort_entries(kind, &mut entries);

    let rows: Vec<Vec<CellValue>> = entries.iter().map(|e| e.to_row(&dest_columns)).collect();
    session.edit_sheet(&db_id, sheets.db, |sheet| replace_table_rows(sheet, &rows))?;

    report.written = rows.len();
    info!(kind = %kind, written = report.written, "catalog rebuilt");
    session.ui.alert(
        "✅ Success",
        &format!(
            "The <{}> sheet has been successfully rebuilt with {} {}.",
            sheets.db, report.written, sheets.noun
        ),
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::grid::Grid;

    fn entry(category: &str, name: &str) -> CatalogEntry {
        CatalogEntry {
            sub_type: category.to_string(),
            ability_name: name.to_string(),
            usage: "1/day".to_string(),
            action: "Action".to_string(),
            effect: "Heal".to_string(),
            ..CatalogEntry::default()
        }
    }

    #[test]
    fn test_power_label() {
        let power = CatalogEntry {
            table_name: "Fire".to_string(),
            ..entry("", "Blast")
        };
        assert_eq!(power.label(CatalogKind::Powers), "Fire - Blast⚡ (1/day, Action) ➡ Heal");
    }

    #[test]
    fn test_magic_item_label_uses_category_emoji() {
        assert_eq!(
            entry("Lesser", "Ring").label(CatalogKind::MagicItems),
            "Lesser🔮 - Ring (1/day, Action) ➡ Heal"
        );
        assert_eq!(
            entry("Odd", "Ring").label(CatalogKind::MagicItems),
            "Odd✨ - Ring (1/day, Action) ➡ Heal"
        );
    }

    #[test]
    fn test_magic_items_sort_by_category_then_name() {
        let mut items = vec![
            entry("Artifact", "Orb"),
            entry("Unknown", "Aaa"),
            entry("Minor", "zeta"),
            entry("Minor", "Alpha"),
            entry("Greater", "Cloak"),
        ];
        sort_entries(CatalogKind::MagicItems, &mut items);

        let names: Vec<&str> = items.iter().map(|e| e.ability_name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "zeta", "Cloak", "Orb", "Aaa"]);
    }

    #[test]
    fn test_dedupe_keeps_first() {
        let mut a = entry("Minor", "A");
        a.dropdown = "same".to_string();
        let mut b = entry("Minor", "B");
        b.dropdown = "same".to_string();

        let kept = dedupe_by_label(vec![a, b]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].ability_name, "A");
    }

    #[test]
    fn test_entries_from_master_skip_placeholders() {
        let data = SheetData::new(
            "Class",
            Grid::from_text_rows(&[
                &["", "TableName", "AbilityName", "Usage", "Action", "Effect"],
                &["Header", "Table", "Power", "Usage", "Action", "Effect"],
                &["", "Fire", "Blast", "1/day", "Action", "Burn"],
                &["", "Fire", "", "", "", ""],
            ]),
        );

        let entries = entries_from_master(CatalogKind::Powers, &data).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].dropdown, "Fire - Blast⚡ (1/day, Action) ➡ Burn");
    }

    #[test]
    fn test_magic_items_need_no_table_name() {
        let data = SheetData::new(
            "Magic Items",
            Grid::from_text_rows(&[
                &["", "SubType", "AbilityName", "Usage", "Action", "Effect"],
                &["Header", "Category", "Item", "Usage", "Action", "Effect"],
                &["", "Minor", "Tonic", "1/day", "Bonus", "Heal"],
                &["", "Minor", "Item", "", "", ""],
            ]),
        );

        let entries = entries_from_master(CatalogKind::MagicItems, &data).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].table_name, "");
        assert_eq!(entries[0].dropdown, "Minor🍺 - Tonic (1/day, Bonus) ➡ Heal");
        assert!(matches!(
            entries_from_master(CatalogKind::Powers, &data),
            Err(Error::MissingTag { .. })
        ));
    }

    #[test]
    fn test_row_roundtrip_through_column_map() {
        let columns = ColumnMap::canonical();
        let original = CatalogEntry {
            dropdown: "label".to_string(),
            table_name: "Ice".to_string(),
            ..entry("Minor", "Shard")
        };
        let row = original.to_row(&columns);
        assert_eq!(row.len(), 10);
        assert_eq!(row[0], CellValue::Empty);
        assert_eq!(CatalogEntry::from_row(&row, &columns), original);
    }
}
