//! Cell values and the untyped 2D grid every sheet is read into

use serde::{Deserialize, Serialize};

static EMPTY: CellValue = CellValue::Empty;

/// A cell value with type detection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    /// Empty/null cell
    #[default]
    Empty,
    /// Checkbox or boolean literal
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Floating-point value
    Float(f64),
    /// String value
    String(String),
}

impl CellValue {
    /// Read a cell exactly as it was stored
    ///
    /// Only a literal `TRUE`/`FALSE` becomes a checkbox; everything else keeps
    /// its text untouched, so `"3.10"` and `"0042"` survive a reload.
    pub fn stored(s: &str) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else if s.eq_ignore_ascii_case("true") {
            CellValue::Boolean(true)
        } else if s.eq_ignore_ascii_case("false") {
            CellValue::Boolean(false)
        } else {
            CellValue::String(s.to_string())
        }
    }

    /// Text cell; an empty string becomes [`CellValue::Empty`]
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::String(s)
        }
    }

    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Empty, whitespace-only, or an unchecked checkbox
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty | CellValue::Boolean(false) => true,
            CellValue::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// A checked checkbox
    pub fn is_checked(&self) -> bool {
        matches!(self, CellValue::Boolean(true))
    }

    /// Borrow the text of a string cell
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to a display string
    pub fn to_string_value(&self) -> String {
        match self {
            CellValue::Boolean(true) => "TRUE".to_string(),
            CellValue::Boolean(false) => "FALSE".to_string(),
            CellValue::Integer(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::String(s) => s.clone(),
            CellValue::Empty => String::new(),
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Float(fl) => write!(f, "{}", fl),
            CellValue::String(s) => write!(f, "{}", s),
            CellValue::Empty => write!(f, ""),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::text(s)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::text(s)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

/// Rows of cells; rows may be ragged, missing cells read as empty
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    rows: Vec<Vec<CellValue>>,
}

impl Grid {
    /// Create a new empty grid
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    /// Build a grid from literal text, read like [`CellValue::stored`]
    pub fn from_text_rows(rows: &[&[&str]]) -> Self {
        Self {
            rows: rows
                .iter()
                .map(|row| row.iter().map(|s| CellValue::stored(s)).collect())
                .collect(),
        }
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Width of the widest row
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn get(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    pub fn row(&self, row: usize) -> &[CellValue] {
        self.rows.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn rows(&self) -> impl Iterator<Item = &[CellValue]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Set a cell, growing the grid as needed
    pub fn set(&mut self, row: usize, col: usize, value: CellValue) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize(col + 1, CellValue::Empty);
        }
        cells[col] = value;
    }

    pub(crate) fn row_mut(&mut self, row: usize) -> Option<&mut Vec<CellValue>> {
        self.rows.get_mut(row)
    }

    /// Index of the last row holding any non-empty cell
    pub fn last_content_row(&self) -> Option<usize> {
        self.rows
            .iter()
            .rposition(|r| r.iter().any(|c| !c.is_empty()))
    }

    pub fn insert_rows(&mut self, at: usize, count: usize) {
        let at = at.min(self.rows.len());
        self.rows
            .splice(at..at, std::iter::repeat_with(Vec::new).take(count));
    }

    pub fn remove_row(&mut self, row: usize) -> Option<Vec<CellValue>> {
        (row < self.rows.len()).then(|| self.rows.remove(row))
    }

    pub fn truncate(&mut self, rows: usize) {
        self.rows.truncate(rows);
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }
}

/// Spreadsheet column letters for a 0-based index (0 -> "A", 26 -> "AA")
pub fn column_letter(col: usize) -> String {
    let mut n = col + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// A1 notation for a 0-based cell position
pub fn a1(row: usize, col: usize) -> String {
    format!("{}{}", column_letter(col), row + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_cell_keeps_numeric_text() {
        assert_eq!(CellValue::stored("3.10"), CellValue::text("3.10"));
        assert_eq!(CellValue::stored("3.0"), CellValue::text("3.0"));
        assert_eq!(CellValue::stored("0042"), CellValue::text("0042"));
        assert_eq!(CellValue::stored("0042").to_string_value(), "0042");
    }

    #[test]
    fn test_stored_cell_boolean_literals() {
        assert_eq!(CellValue::stored("TRUE"), CellValue::Boolean(true));
        assert_eq!(CellValue::stored("false"), CellValue::Boolean(false));
        assert_eq!(CellValue::stored(" TRUE"), CellValue::text(" TRUE"));
    }

    #[test]
    fn test_stored_cell_keeps_whitespace() {
        assert_eq!(
            CellValue::stored(" Header, TableEnd "),
            CellValue::String(" Header, TableEnd ".to_string())
        );
        assert_eq!(CellValue::stored(""), CellValue::Empty);
        assert!(CellValue::stored("   ").is_blank());
    }

    #[test]
    fn test_cell_value_blank_and_checked() {
        assert!(CellValue::Boolean(false).is_blank());
        assert!(!CellValue::Boolean(false).is_empty());
        assert!(CellValue::Boolean(true).is_checked());
        assert!(!CellValue::text("x").is_blank());
    }

    #[test]
    fn test_grid_set_grows_and_get_defaults() {
        let mut grid = Grid::new();
        grid.set(2, 3, CellValue::text("x"));
        assert_eq!(grid.row_count(), 3);
        assert_eq!(grid.get(2, 3), &CellValue::text("x"));
        assert_eq!(grid.get(0, 0), &CellValue::Empty);
        assert_eq!(grid.get(10, 10), &CellValue::Empty);
    }

    #[test]
    fn test_grid_last_content_row_skips_trailing_blank_rows() {
        let grid = Grid::from_text_rows(&[&["Header", "a"], &["", "b"], &["", ""]]);
        assert_eq!(grid.last_content_row(), Some(1));
    }

    #[test]
    fn test_a1_notation() {
        assert_eq!(a1(0, 0), "A1");
        assert_eq!(a1(0, 2), "C1");
        assert_eq!(a1(9, 26), "AA10");
    }
}
