//! Workbooks, sheets and the list-validation rules applied to them

use crate::error::{Error, Result};
use crate::grid::{CellValue, Grid};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single-column block of cells, 0-based and inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRange {
    pub column: usize,
    pub first_row: usize,
    pub last_row: usize,
}

impl ColumnRange {
    pub fn new(column: usize, first_row: usize, last_row: usize) -> Self {
        Self {
            column,
            first_row,
            last_row,
        }
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        col == self.column && row >= self.first_row && row <= self.last_row
    }
}

/// A dropdown rule: cells in `range` must hold one of `values`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListValidation {
    pub range: ColumnRange,
    pub values: Vec<String>,
}

/// One named sheet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    grid: Grid,
    validations: Vec<ListValidation>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_grid(name: impl Into<String>, grid: Grid) -> Self {
        Self {
            name: name.into(),
            grid,
            validations: Vec::new(),
        }
    }

    /// The full used range
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn set_value(&mut self, row: usize, col: usize, value: CellValue) {
        self.grid.set(row, col, value);
    }

    /// Write a block of rows with its top-left cell at (`first_row`, `first_col`)
    pub fn write_block(&mut self, first_row: usize, first_col: usize, rows: &[Vec<CellValue>]) {
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                self.grid.set(first_row + r, first_col + c, value.clone());
            }
        }
    }

    /// Index of the last row with content
    pub fn last_row(&self) -> Option<usize> {
        self.grid.last_content_row()
    }

    pub fn delete_row(&mut self, row: usize) -> Option<Vec<CellValue>> {
        self.grid.remove_row(row)
    }

    pub fn insert_rows_after(&mut self, row: usize, count: usize) {
        self.grid.insert_rows(row + 1, count);
    }

    pub fn truncate_rows(&mut self, rows: usize) {
        self.grid.truncate(rows);
    }

    /// Clear every data cell of a row, leaving the tag cell in column 0
    ///
    /// Checkbox cells stay checkboxes and become unchecked.
    pub fn clear_data_cells(&mut self, row: usize) {
        if let Some(cells) = self.grid.row_mut(row) {
            for cell in cells.iter_mut().skip(1) {
                *cell = match cell {
                    CellValue::Boolean(_) => CellValue::Boolean(false),
                    _ => CellValue::Empty,
                };
            }
        }
    }

    /// Remove all content and validation rules
    pub fn clear(&mut self) {
        self.grid.clear();
        self.validations.clear();
    }

    /// Apply a list rule, replacing any rule over the same range
    pub fn set_list_validation(&mut self, range: ColumnRange, values: Vec<String>) {
        self.validations.retain(|v| v.range != range);
        self.validations.push(ListValidation { range, values });
    }

    pub fn validation_at(&self, row: usize, col: usize) -> Option<&ListValidation> {
        self.validations
            .iter()
            .rev()
            .find(|v| v.range.contains(row, col))
    }

    pub fn validations(&self) -> &[ListValidation] {
        &self.validations
    }

    pub(crate) fn set_validations(&mut self, validations: Vec<ListValidation>) {
        self.validations = validations;
    }
}

/// A spreadsheet document: id, display name, owner and its sheets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    pub id: String,
    pub name: String,
    pub owner: String,
    /// Emails this workbook has been shared with
    #[serde(default)]
    pub shared_with: Vec<String>,
    sheets: BTreeMap<String, Sheet>,
}

impl Workbook {
    pub fn new(id: impl Into<String>, name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            owner: owner.into(),
            ..Self::default()
        }
    }

    /// Builder-style sheet insertion
    pub fn with_sheet(mut self, sheet: Sheet) -> Self {
        self.add_sheet(sheet);
        self
    }

    pub fn add_sheet(&mut self, sheet: Sheet) {
        self.sheets.insert(sheet.name.clone(), sheet);
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.get(name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets.get_mut(name)
    }

    pub fn require_sheet(&self, name: &str) -> Result<&Sheet> {
        self.sheets.get(name).ok_or_else(|| Error::SheetNotFound {
            document: self.name.clone(),
            sheet: name.to_string(),
        })
    }

    pub fn require_sheet_mut(&mut self, name: &str) -> Result<&mut Sheet> {
        let document = self.name.clone();
        self.sheets.get_mut(name).ok_or(Error::SheetNotFound {
            document,
            sheet: name.to_string(),
        })
    }

    pub fn sheets(&self) -> impl Iterator<Item = &Sheet> {
        self.sheets.values()
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.keys().map(String::as_str).collect()
    }
}
