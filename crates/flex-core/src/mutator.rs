//! Row operations on Header-convention tables
//!
//! A table is a row tagged `Header` followed by data rows that run to the
//! last row with content. Column 0 of any row may carry structural tags
//! (markers such as `TableEnd` or `PowerTableStart`) that other code looks
//! up; row operations must never drop them.

use crate::error::{Error, Result};
use crate::grid::CellValue;
use crate::sheet::Sheet;
use crate::tags::{clean_tags, normalize_tags};
use tracing::debug;

/// Row tag that starts every table
pub const HEADER_TAG: &str = "header";

/// What [`delete_table_row`] did to the sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowDeletion {
    /// The row was removed
    Deleted,
    /// The row was the only data row; its contents were cleared instead
    Cleared,
}

/// Decision for one deletion
#[derive(Debug, Clone, PartialEq, Eq)]
enum RowPlan {
    Clear,
    DeleteWithTransplant { marker: String, onto: usize },
    Delete,
}

/// Index of the first row tagged `Header`
pub fn find_header(sheet: &Sheet) -> Option<usize> {
    let grid = sheet.grid();
    (0..grid.row_count()).find(|&r| {
        normalize_tags(grid.get(r, 0))
            .iter()
            .any(|t| t == HEADER_TAG)
    })
}

fn require_header(sheet: &Sheet) -> Result<usize> {
    find_header(sheet).ok_or_else(|| Error::missing_row_tag(&sheet.name, HEADER_TAG))
}

fn plan_deletion(sheet: &Sheet, header: usize, index: usize) -> RowPlan {
    let last = sheet.last_row().unwrap_or(header);
    if last <= header + 1 {
        return RowPlan::Clear;
    }

    match sheet.grid().get(index, 0) {
        CellValue::String(marker) if !marker.trim().is_empty() => {
            let onto = if index > header + 1 { index - 1 } else { index + 1 };
            RowPlan::DeleteWithTransplant {
                marker: marker.clone(),
                onto,
            }
        }
        _ => RowPlan::Delete,
    }
}

/// Delete a data row (1-based `row_number`) without breaking the table
///
/// The sole remaining data row is cleared rather than removed so the
/// sheet keeps its formatted row. A deleted row's column-0 tags move onto
/// the neighbouring surviving row.
pub fn delete_table_row(sheet: &mut Sheet, row_number: usize) -> Result<RowDeletion> {
    let header = require_header(sheet)?;
    let index = row_number.wrapping_sub(1);
    if row_number == 0 || index <= header || index >= sheet.grid().row_count() {
        return Err(Error::InvalidRow {
            sheet: sheet.name.clone(),
            row: row_number,
        });
    }

    match plan_deletion(sheet, header, index) {
        RowPlan::Clear => {
            debug!(sheet = %sheet.name, row = row_number, "clearing sole data row");
            sheet.clear_data_cells(index);
            Ok(RowDeletion::Cleared)
        }
        RowPlan::DeleteWithTransplant { marker, onto } => {
            let existing = sheet.grid().get(onto, 0).to_string_value();
            let merged = clean_tags(&existing, &marker);
            debug!(sheet = %sheet.name, row = row_number, tags = %merged, "moving row tags before delete");
            sheet.set_value(onto, 0, CellValue::text(merged));
            sheet.delete_row(index);
            Ok(RowDeletion::Deleted)
        }
        RowPlan::Delete => {
            sheet.delete_row(index);
            Ok(RowDeletion::Deleted)
        }
    }
}

/// Replace every data row of the table with `rows`
///
/// Rows are full-width; their column 0 is ignored. The first data row keeps
/// its column-0 tags. With no rows, one blank data row is left behind.
pub fn replace_table_rows(sheet: &mut Sheet, rows: &[Vec<CellValue>]) -> Result<()> {
    let header = require_header(sheet)?;
    let first = header + 1;
    let kept_tag = sheet.grid().get(first, 0).clone();

    sheet.truncate_rows(first);
    sheet.set_value(first, 0, kept_tag);

    for (offset, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate().skip(1) {
            sheet.set_value(first + offset, c, value.clone());
        }
    }

    Ok(())
}

/// Append a data row, filling the first data row if its `key_column` is blank
///
/// Returns the 0-based index written to.
pub fn append_table_row(sheet: &mut Sheet, row: &[CellValue], key_column: usize) -> Result<usize> {
    let header = require_header(sheet)?;
    let first = header + 1;

    let target = if sheet.grid().get(first, key_column).is_blank() {
        first
    } else {
        sheet.last_row().unwrap_or(header).max(first) + 1
    };

    if target < sheet.grid().row_count() && target != first {
        sheet.insert_rows_after(target - 1, 1);
    }

    for (c, value) in row.iter().enumerate().skip(1) {
        sheet.set_value(target, c, value.clone());
    }
    Ok(target)
}
