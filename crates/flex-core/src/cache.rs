//! Per-operation memo of sheet grids and their tag maps

use crate::error::Result;
use crate::grid::{CellValue, Grid};
use crate::mutator::HEADER_TAG;
use crate::sheet::Workbook;
use crate::tags::TagMap;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

/// Cache key: a workbook id plus a sheet name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SheetKey {
    pub document: String,
    pub sheet: String,
}

impl SheetKey {
    pub fn new(document: impl Into<String>, sheet: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            sheet: sheet.into(),
        }
    }
}

/// A sheet's values together with its tag maps
#[derive(Debug, Clone)]
pub struct SheetData {
    pub name: String,
    pub grid: Grid,
    pub tags: TagMap,
}

impl SheetData {
    pub fn new(name: impl Into<String>, grid: Grid) -> Self {
        let tags = TagMap::build(&grid);
        Self {
            name: name.into(),
            grid,
            tags,
        }
    }

    /// Row index of the Header row
    pub fn header(&self) -> Result<usize> {
        self.tags.require_row(&self.name, HEADER_TAG)
    }

    pub fn require_col(&self, tag: &str) -> Result<usize> {
        self.tags.require_col(&self.name, tag)
    }

    /// Rows after the Header row, with their indices
    pub fn data_rows(&self) -> Result<impl Iterator<Item = (usize, &[CellValue])>> {
        let header = self.header()?;
        Ok(((header + 1)..self.grid.row_count()).map(move |r| (r, self.grid.row(r))))
    }

    /// Lay out a row with each value under its column tag
    pub fn build_row(&self, values: Vec<(&str, CellValue)>) -> Result<Vec<CellValue>> {
        let mut row = vec![CellValue::Empty; self.grid.column_count()];
        for (tag, value) in values {
            let col = self.require_col(tag)?;
            if row.len() <= col {
                row.resize(col + 1, CellValue::Empty);
            }
            row[col] = value;
        }
        Ok(row)
    }

    /// First data row whose `col` text equals `value`
    pub fn find_row(&self, col: usize, value: &str) -> Result<Option<usize>> {
        Ok(self
            .data_rows()?
            .find(|(_, cells)| cells.get(col).is_some_and(|c| c.to_string_value().trim() == value))
            .map(|(r, _)| r))
    }
}

/// The kind of change a host change event reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    Edit,
    InsertRow,
    RemoveRow,
    InsertColumn,
    RemoveColumn,
    Format,
    Other,
}

impl ChangeType {
    /// Row/column insertions and removals shift tag positions
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            ChangeType::InsertRow
                | ChangeType::RemoveRow
                | ChangeType::InsertColumn
                | ChangeType::RemoveColumn
        )
    }
}

/// Memoized sheet reads for one operation context
#[derive(Debug, Default)]
pub struct SheetCache {
    entries: HashMap<SheetKey, Rc<SheetData>>,
    reads: usize,
}

impl SheetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a sheet's data, reading it from the workbook on a miss or when
    /// `force_refresh` is set
    pub fn get_sheet_data(
        &mut self,
        document_key: &str,
        sheet_name: &str,
        workbook: &Workbook,
        force_refresh: bool,
    ) -> Result<Rc<SheetData>> {
        let key = SheetKey::new(document_key, sheet_name);

        if !force_refresh {
            if let Some(data) = self.entries.get(&key) {
                debug!(document = document_key, sheet = sheet_name, "sheet cache hit");
                return Ok(Rc::clone(data));
            }
        }

        let grid = workbook.require_sheet(sheet_name)?.grid().clone();
        self.reads += 1;
        debug!(
            document = document_key,
            sheet = sheet_name,
            rows = grid.row_count(),
            force_refresh,
            "loaded sheet"
        );

        let data = Rc::new(SheetData::new(sheet_name, grid));
        self.entries.insert(key, Rc::clone(&data));
        Ok(data)
    }

    pub fn invalidate(&mut self, document_key: &str, sheet_name: &str) {
        self.entries
            .remove(&SheetKey::new(document_key, sheet_name));
    }

    pub fn invalidate_document(&mut self, document_key: &str) {
        self.entries.retain(|key, _| key.document != document_key);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// React to a host change event; structural edits drop every entry
    pub fn observe_change(&mut self, change: ChangeType) {
        if change.is_structural() {
            debug!(?change, "structural edit, clearing sheet cache");
            self.clear();
        }
    }

    pub fn contains(&self, document_key: &str, sheet_name: &str) -> bool {
        self.entries
            .contains_key(&SheetKey::new(document_key, sheet_name))
    }

    /// Number of sheet reads performed against workbooks
    pub fn reads(&self) -> usize {
        self.reads
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::Sheet;

    fn workbook() -> Workbook {
        Workbook::new("cs1", "Character", "me").with_sheet(Sheet::with_grid(
            "Game",
            Grid::from_text_rows(&[&["", "PowerDropDown1"], &["Header", "Power"]]),
        ))
    }

    #[test]
    fn test_second_read_is_memoized() {
        let wb = workbook();
        let mut cache = SheetCache::new();

        let first = cache.get_sheet_data("cs1", "Game", &wb, false).unwrap();
        let second = cache.get_sheet_data("cs1", "Game", &wb, false).unwrap();

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(cache.reads(), 1);
        assert_eq!(first.tags.col("powerdropdown1"), Some(1));
        assert_eq!(first.header().unwrap(), 1);
    }

    #[test]
    fn test_force_refresh_rereads() {
        let mut wb = workbook();
        let mut cache = SheetCache::new();
        cache.get_sheet_data("cs1", "Game", &wb, false).unwrap();

        wb.sheet_mut("Game")
            .unwrap()
            .set_value(0, 2, CellValue::text("PowerDropDown2"));

        let stale = cache.get_sheet_data("cs1", "Game", &wb, false).unwrap();
        assert_eq!(stale.tags.col("powerdropdown2"), None);

        let fresh = cache.get_sheet_data("cs1", "Game", &wb, true).unwrap();
        assert_eq!(fresh.tags.col("powerdropdown2"), Some(2));
        assert_eq!(cache.reads(), 2);
    }

    #[test]
    fn test_build_and_find_row() {
        let data = SheetData::new(
            "CustomSources",
            Grid::from_text_rows(&[
                &["", "SheetID", "SourceName", "Owner"],
                &["Header", "", "", ""],
                &["", "cust1", "Mine", "Me"],
            ]),
        );
        let row = data
            .build_row(vec![("owner", CellValue::text("Me")), ("sheetid", CellValue::text("x"))])
            .unwrap();
        assert_eq!(row, vec![CellValue::Empty, CellValue::text("x"), CellValue::Empty, CellValue::text("Me")]);
        assert!(data.build_row(vec![("nope", CellValue::Empty)]).is_err());
        assert_eq!(data.find_row(1, "cust1").unwrap(), Some(2));
        assert_eq!(data.find_row(1, "other").unwrap(), None);
    }

    #[test]
    fn test_structural_change_clears_everything() {
        let wb = workbook();
        let mut cache = SheetCache::new();
        cache.get_sheet_data("cs1", "Game", &wb, false).unwrap();

        cache.observe_change(ChangeType::Edit);
        assert!(cache.contains("cs1", "Game"));

        cache.observe_change(ChangeType::RemoveRow);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_keys_separate_documents() {
        let wb = workbook();
        let mut cache = SheetCache::new();
        cache.get_sheet_data("cs1", "Game", &wb, false).unwrap();
        cache.get_sheet_data("cust1", "Game", &wb, false).unwrap();
        assert_eq!(cache.len(), 2);

        cache.invalidate_document("cust1");
        assert!(!cache.contains("cust1", "Game"));
        assert!(cache.contains("cs1", "Game"));
    }
}
