//! Tag normalization and tag maps
//!
//! Row 0 and column 0 of every sheet carry free-text tags. A tag cell such as
//! `"Header, TableEnd"` labels its row (or column) with every comma-separated
//! token, lowercased and stripped of whitespace. Higher-level code addresses
//! cells only through these tags, never through fixed offsets.

use crate::error::{Error, Result};
use crate::grid::{a1, CellValue, Grid};
use std::collections::{BTreeSet, HashMap};

/// Which edge of the grid a tag lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Tags in column 0, one per row
    Row,
    /// Tags in row 0, one per column
    Column,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::Row => write!(f, "row"),
            Axis::Column => write!(f, "column"),
        }
    }
}

/// Normalize a raw tag cell into its tokens
///
/// Non-string cells carry no tags. Tokens keep their first-seen order and
/// repeats within one cell are dropped.
pub fn normalize_tags(value: &CellValue) -> Vec<String> {
    match value {
        CellValue::String(s) => normalize_tag_str(s),
        _ => Vec::new(),
    }
}

/// Normalize raw tag text, see [`normalize_tags`]
pub fn normalize_tag_str(raw: &str) -> Vec<String> {
    let squashed: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();

    let mut tags: Vec<String> = Vec::new();
    for tag in squashed.split(',').filter(|t| !t.is_empty()) {
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

/// Merge two raw tag strings into one sorted, deduplicated, comma-joined string
///
/// Tokens are trimmed but keep their case, so `"Header"` survives as written.
pub fn clean_tags(first: &str, second: &str) -> String {
    let tags: BTreeSet<&str> = first
        .split(',')
        .chain(second.split(','))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();
    tags.into_iter().collect::<Vec<_>>().join(",")
}

/// Tag -> index lookups for one grid
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagMap {
    rows: HashMap<String, usize>,
    cols: HashMap<String, usize>,
}

impl TagMap {
    /// Build both maps from row 0 and column 0
    ///
    /// When a tag repeats, the first occurrence wins; use [`verify_tags`] to
    /// reject such grids.
    pub fn build(grid: &Grid) -> Self {
        let mut map = TagMap::default();

        for r in 0..grid.row_count() {
            for tag in normalize_tags(grid.get(r, 0)) {
                map.rows.entry(tag).or_insert(r);
            }
        }

        for (c, cell) in grid.row(0).iter().enumerate() {
            for tag in normalize_tags(cell) {
                map.cols.entry(tag).or_insert(c);
            }
        }

        map
    }

    /// Row index for a normalized tag
    pub fn row(&self, tag: &str) -> Option<usize> {
        self.rows.get(tag).copied()
    }

    /// Column index for a normalized tag
    pub fn col(&self, tag: &str) -> Option<usize> {
        self.cols.get(tag).copied()
    }

    pub fn require_row(&self, sheet: &str, tag: &str) -> Result<usize> {
        self.row(tag)
            .ok_or_else(|| Error::missing_row_tag(sheet, tag))
    }

    pub fn require_col(&self, sheet: &str, tag: &str) -> Result<usize> {
        self.col(tag)
            .ok_or_else(|| Error::missing_column_tag(sheet, tag))
    }

    pub fn row_tags(&self) -> &HashMap<String, usize> {
        &self.rows
    }

    pub fn col_tags(&self) -> &HashMap<String, usize> {
        &self.cols
    }

    /// Column tags starting with `prefix`, ordered by column index
    pub fn cols_with_prefix(&self, prefix: &str) -> Vec<(&str, usize)> {
        let mut found: Vec<(&str, usize)> = self
            .cols
            .iter()
            .filter(|(tag, _)| tag.starts_with(prefix))
            .map(|(tag, &c)| (tag.as_str(), c))
            .collect();
        found.sort_by_key(|&(_, c)| c);
        found
    }
}

/// Check that no normalized tag appears twice on either axis
///
/// Columns are checked before rows and the first duplicate found is
/// reported with both cell locations.
pub fn verify_tags(grid: &Grid) -> Result<()> {
    let mut seen: HashMap<String, String> = HashMap::new();
    for (c, cell) in grid.row(0).iter().enumerate() {
        check_cell(&mut seen, cell, a1(0, c), Axis::Column)?;
    }

    let mut seen: HashMap<String, String> = HashMap::new();
    for r in 0..grid.row_count() {
        check_cell(&mut seen, grid.get(r, 0), a1(r, 0), Axis::Row)?;
    }

    Ok(())
}

fn check_cell(
    seen: &mut HashMap<String, String>,
    cell: &CellValue,
    location: String,
    axis: Axis,
) -> Result<()> {
    for tag in normalize_tags(cell) {
        if let Some(original) = seen.get(&tag) {
            return Err(Error::DuplicateTag {
                tag,
                axis,
                original: original.clone(),
                duplicate: location,
            });
        }
        seen.insert(tag, location.clone());
    }
    Ok(())
}
