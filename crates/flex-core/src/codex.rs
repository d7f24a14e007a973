//! Links between a player's workbooks and their Codex

use crate::error::{Error, Result};
use crate::grid::CellValue;
use crate::sheet::Workbook;
use crate::tags::TagMap;
use tracing::warn;

pub const DATA_SHEET: &str = "Data";
const CODEX_ID_ROW: &str = "codexid";
const DATA_COL: &str = "data";

/// The Codex id a workbook points at, if it has a Data sheet with one
pub fn codex_id_of(workbook: &Workbook) -> Option<String> {
    let sheet = workbook.sheet(DATA_SHEET)?;
    let tags = TagMap::build(sheet.grid());
    let (row, col) = (tags.row(CODEX_ID_ROW)?, tags.col(DATA_COL)?);

    match sheet.grid().get(row, col) {
        cell if cell.is_blank() => None,
        cell => Some(cell.to_string_value().trim().to_string()),
    }
}

/// Write `codex_id` into the workbook's Data sheet
///
/// Returns `false` when the workbook has no Data sheet.
pub fn embed_codex_id(workbook: &mut Workbook, codex_id: &str) -> Result<bool> {
    let name = workbook.name.clone();
    let Some(sheet) = workbook.sheet_mut(DATA_SHEET) else {
        warn!(workbook = %name, "no Data sheet, codex id not embedded");
        return Ok(false);
    };

    let tags = TagMap::build(sheet.grid());
    let row = tags
        .row(CODEX_ID_ROW)
        .ok_or_else(|| Error::missing_row_tag(DATA_SHEET, CODEX_ID_ROW))?;
    let col = tags
        .col(DATA_COL)
        .ok_or_else(|| Error::missing_column_tag(DATA_SHEET, DATA_COL))?;

    sheet.set_value(row, col, CellValue::text(codex_id));
    Ok(true)
}
