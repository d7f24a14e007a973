//! Table listings across the local DB and every registered custom source
//!
//! The DB is the one source that must be readable. A custom source that
//! cannot be opened or read is skipped with a warning so one bad id never
//! hides every other table.

use crate::cache::SheetData;
use crate::error::Result;
use crate::mutator::delete_table_row;
use crate::schema::CatalogKind;
use crate::session::Session;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Source name of tables from the local DB
pub const DB_SOURCE: &str = "DB";
/// Prefix that marks custom tables in listings
pub const CUSTOM_PREFIX: &str = "Cust - ";
/// Codex sheet listing registered custom sources
pub const SOURCES_SHEET: &str = "CustomSources";
/// Older name of the sources sheet, read when a Codex has no `CustomSources`
pub const LEGACY_SOURCES_SHEET: &str = "Custom Abilities";
/// Column tags naming a source, current first
const SOURCE_NAME_TAGS: [&str; 2] = ["sourcename", "custabilitiesname"];

/// A table as the filter sheet lists it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    /// Display name; custom tables carry [`CUSTOM_PREFIX`]
    pub table_name: String,
    /// `DB` or the registered source's friendly name
    pub source: String,
}

impl TableRef {
    pub fn db(name: impl Into<String>) -> Self {
        Self {
            table_name: name.into(),
            source: DB_SOURCE.to_string(),
        }
    }

    pub fn custom(name: &str, source: impl Into<String>) -> Self {
        Self {
            table_name: format!("{}{}", CUSTOM_PREFIX, name),
            source: source.into(),
        }
    }

    pub fn is_custom(&self) -> bool {
        self.source != DB_SOURCE
    }

    /// Table name as written in its source sheet
    pub fn raw_name(&self) -> &str {
        self.table_name
            .strip_prefix(CUSTOM_PREFIX)
            .unwrap_or(&self.table_name)
    }
}

/// Every table found, plus a note for each source that was skipped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableListing {
    pub tables: Vec<TableRef>,
    pub warnings: Vec<String>,
}

impl TableListing {
    pub fn names(&self) -> HashSet<&str> {
        self.tables.iter().map(|t| t.table_name.as_str()).collect()
    }
}

/// A custom workbook registered in the Codex
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredSource {
    pub sheet_id: String,
    pub name: String,
    pub owner: String,
    /// Row index in the sources sheet
    pub row: usize,
}

/// Name of the sources sheet in `codex`
pub(crate) fn sources_sheet(session: &Session<'_>, codex: &str) -> Result<&'static str> {
    let workbook = session.workbook(codex)?;
    if workbook.sheet(SOURCES_SHEET).is_none() && workbook.sheet(LEGACY_SOURCES_SHEET).is_some() {
        Ok(LEGACY_SOURCES_SHEET)
    } else {
        Ok(SOURCES_SHEET)
    }
}

/// Column and tag holding source names
pub(crate) fn source_name_col(data: &SheetData) -> Result<(usize, &'static str)> {
    if let Some(found) = SOURCE_NAME_TAGS
        .iter()
        .find_map(|&tag| data.tags.col(tag).map(|c| (c, tag)))
    {
        return Ok(found);
    }
    data.require_col(SOURCE_NAME_TAGS[0]).map(|c| (c, SOURCE_NAME_TAGS[0]))
}

/// Read the registered sources from the Codex, freshly
pub fn registered_sources(session: &mut Session<'_>) -> Result<Vec<RegisteredSource>> {
    let codex = session.codex_id()?;
    let sheet = sources_sheet(session, &codex)?;
    let data = session.sheet_data(&codex, sheet, true)?;
    read_sources(&data)
}

pub(crate) fn read_sources(data: &SheetData) -> Result<Vec<RegisteredSource>> {
    let id_col = data.require_col("sheetid")?;
    let (name_col, _) = source_name_col(data)?;
    let owner_col = data.tags.col("owner");

    let mut sources = Vec::new();
    for (row, cells) in data.data_rows()? {
        let text = |c: usize| {
            cells
                .get(c)
                .map(|v| v.to_string_value().trim().to_string())
                .unwrap_or_default()
        };
        let sheet_id = text(id_col);
        if sheet_id.is_empty() {
            continue;
        }
        sources.push(RegisteredSource {
            sheet_id,
            name: text(name_col),
            owner: owner_col.map(text).unwrap_or_default(),
            row,
        });
    }
    Ok(sources)
}

/// Distinct non-blank values of the `tablename` column, first-seen order
pub fn table_names(data: &SheetData) -> Result<Vec<String>> {
    let col = data.require_col("tablename")?;
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for (_, row) in data.data_rows()? {
        let name = row
            .get(col)
            .map(|v| v.to_string_value().trim().to_string())
            .unwrap_or_default();
        if !name.is_empty() && seen.insert(name.clone()) {
            names.push(name);
        }
    }
    Ok(names)
}

fn sort_by_name(tables: &mut [TableRef]) {
    tables.sort_by(|a, b| {
        a.table_name
            .to_lowercase()
            .cmp(&b.table_name.to_lowercase())
            .then_with(|| a.table_name.cmp(&b.table_name))
    });
}

/// List every table of `kind`: DB tables sorted, then custom tables sorted
pub fn list_all_tables(session: &mut Session<'_>, kind: CatalogKind) -> Result<TableListing> {
    let sheets = kind.sheets();
    let title = format!("Sync {} Tables", kind);

    let db_id = session.local_db_id()?;
    let db = session.sheet_data(&db_id, sheets.db, false)?;
    let mut db_tables: Vec<TableRef> = table_names(&db)?.into_iter().map(TableRef::db).collect();

    let mut listing = TableListing::default();
    let mut custom_tables = Vec::new();
    for source in registered_sources(session)? {
        let names = session
            .sheet_data(&source.sheet_id, sheets.verified, false)
            .and_then(|data| table_names(&data));

        match names {
            Ok(names) => {
                debug!(source = %source.name, tables = names.len(), "read custom source");
                custom_tables.extend(names.iter().map(|n| TableRef::custom(n, source.name.clone())));
            }
            Err(e) => {
                warn!(source = %source.name, id = %source.sheet_id, error = %e, "skipping custom source");
                let message = format!(
                    "Could not access custom source \"{}\" ({}). Skipping.",
                    source.name, source.sheet_id
                );
                session.ui.toast(&message, &title);
                listing.warnings.push(message);
            }
        }
    }

    sort_by_name(&mut db_tables);
    sort_by_name(&mut custom_tables);
    listing.tables = db_tables;
    listing.tables.extend(custom_tables);
    Ok(listing)
}

/// Rows of the filter sheet whose table is not in `valid`
pub fn find_orphans(filter: &SheetData, valid: &HashSet<&str>) -> Result<Vec<(usize, String)>> {
    let col = filter.require_col("tablename")?;
    let mut orphans = Vec::new();
    for (row, cells) in filter.data_rows()? {
        let name = cells
            .get(col)
            .map(|v| v.to_string_value().trim().to_string())
            .unwrap_or_default();
        if !name.is_empty() && !valid.contains(name.as_str()) {
            orphans.push((row, name));
        }
    }
    Ok(orphans)
}

/// Remove filter rows naming tables absent from `listing`
///
/// Rows are deleted bottom-up and reported to the user by name.
pub fn health_check(
    session: &mut Session<'_>,
    kind: CatalogKind,
    listing: &TableListing,
) -> Result<Vec<String>> {
    let sheets = kind.sheets();
    let active = session.active_id().to_string();

    let filter = session.sheet_data(&active, sheets.filter, true)?;
    let mut orphans = find_orphans(&filter, &listing.names())?;
    if orphans.is_empty() {
        return Ok(Vec::new());
    }

    orphans.sort_by(|a, b| b.0.cmp(&a.0));
    session.edit_sheet(&active, sheets.filter, |sheet| {
        for (row, _) in &orphans {
            delete_table_row(sheet, row + 1)?;
        }
        Ok(())
    })?;

    let mut removed: Vec<String> = orphans.into_iter().map(|(_, name)| name).collect();
    removed.reverse();
    warn!(kind = %kind, removed = ?removed, "removed stale filter rows");

    let list: Vec<String> = removed.iter().map(|n| format!("- {}", n)).collect();
    session.ui.alert(
        "ℹ️ List Cleaned",
        &format!(
            "The following {} tables could no longer be found and have been removed from your list:\n\n{}",
            sheets.noun.trim_end_matches('s'),
            list.join("\n")
        ),
    );
    Ok(removed)
}
