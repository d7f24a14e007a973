//! Cell-edit handling on the Game sheet
//!
//! Picking a label in a `...dropdown{N}` column fills the detail columns of
//! slot N from the flat cache sheet; clearing the dropdown clears them.

use crate::catalog::CatalogEntry;
use crate::error::Result;
use crate::filter::{is_cache_header, GAME_SHEET};
use crate::grid::CellValue;
use crate::schema::{CatalogKind, ColumnMap, Field, SourceConvention};
use crate::session::Session;
use tracing::debug;

/// A single-cell edit reported by the host (0-based position)
#[derive(Debug, Clone, PartialEq)]
pub struct EditEvent {
    pub sheet: String,
    pub row: usize,
    pub col: usize,
    pub value: CellValue,
}

impl EditEvent {
    pub fn new(sheet: impl Into<String>, row: usize, col: usize, value: impl Into<CellValue>) -> Self {
        Self {
            sheet: sheet.into(),
            row,
            col,
            value: value.into(),
        }
    }
}

/// What [`on_edit`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// Not a dropdown cell inside the table range of the Game sheet
    Ignored,
    Cleared,
    Populated,
    /// The label is not in the cache sheet, or there is no cache sheet
    NotFound,
}

const DETAIL_FIELDS: [(&str, Field); 4] = [
    ("usage", Field::Usage),
    ("action", Field::Action),
    ("name", Field::AbilityName),
    ("effect", Field::Effect),
];

/// The catalog kind and slot suffix of a dropdown column
fn dropdown_slot(session: &mut Session<'_>, col: usize) -> Result<Option<(CatalogKind, String)>> {
    let game = session.active_data(GAME_SHEET, false)?;
    for kind in CatalogKind::ALL {
        let prefix = kind.sheets().dropdown_prefix;
        if let Some((tag, _)) = game
            .tags
            .cols_with_prefix(prefix)
            .into_iter()
            .find(|&(_, c)| c == col)
        {
            return Ok(Some((kind, tag[prefix.len()..].to_string())));
        }
    }
    Ok(None)
}

fn find_cached(session: &mut Session<'_>, kind: CatalogKind, label: &str) -> Result<Option<CatalogEntry>> {
    let cache_sheet = kind.sheets().cache;
    let has_cache = session
        .workbook(session.active_id())?
        .sheet(cache_sheet)
        .is_some();
    if !has_cache {
        return Ok(None);
    }

    let cache = session.active_data(cache_sheet, false)?;
    if !is_cache_header(cache.grid.row(0)) {
        return Ok(None);
    }
    let columns = ColumnMap::resolve(&cache.tags, &cache.name, SourceConvention::Local, &[Field::Dropdown])?;
    let found = cache
        .data_rows()?
        .map(|(_, row)| CatalogEntry::from_row(row, &columns))
        .find(|entry| entry.dropdown == label);
    Ok(found)
}

/// React to an edit of one cell
pub fn on_edit(session: &mut Session<'_>, event: &EditEvent) -> Result<EditOutcome> {
    if event.sheet != GAME_SHEET {
        return Ok(EditOutcome::Ignored);
    }
    let Some((kind, slot)) = dropdown_slot(session, event.col)? else {
        return Ok(EditOutcome::Ignored);
    };

    let game = session.active_data(GAME_SHEET, false)?;
    let sheets = kind.sheets();
    let in_table = match (game.tags.row(sheets.range_start), game.tags.row(sheets.range_end)) {
        (Some(first), Some(last)) => (first..=last).contains(&event.row),
        _ => false,
    };
    if !in_table {
        debug!(row = event.row, slot = %slot, "edit outside the dropdown table");
        return Ok(EditOutcome::Ignored);
    }

    let detail_prefix = sheets.detail_prefix;
    let targets: Vec<(usize, Field)> = DETAIL_FIELDS
        .iter()
        .filter_map(|&(suffix, field)| {
            let tag = format!("{}{}{}", detail_prefix, suffix, slot);
            game.tags.col(&tag).map(|c| (c, field))
        })
        .collect();

    let active = session.active_id().to_string();
    let label = event.value.to_string_value();
    let label = label.trim();

    if label.is_empty() {
        session.edit_sheet(&active, GAME_SHEET, |sheet| {
            for &(c, _) in &targets {
                sheet.set_value(event.row, c, CellValue::Empty);
            }
            Ok(())
        })?;
        debug!(row = event.row, slot = %slot, "cleared dropdown details");
        return Ok(EditOutcome::Cleared);
    }

    let Some(entry) = find_cached(session, kind, label)? else {
        debug!(label, "dropdown label not in cache");
        return Ok(EditOutcome::NotFound);
    };

    session.edit_sheet(&active, GAME_SHEET, |sheet| {
        for &(c, field) in &targets {
            sheet.set_value(event.row, c, CellValue::text(entry.field(field)));
        }
        Ok(())
    })?;
    debug!(row = event.row, slot = %slot, label, "filled dropdown details");
    Ok(EditOutcome::Populated)
}
