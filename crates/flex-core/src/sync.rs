//! Keeping the player's version table and cached ids current

use crate::error::{Error, Result};
use crate::grid::CellValue;
use crate::mutator::replace_table_rows;
use crate::resolver::{read_version_table, VersionIndex, SHEET_IDS_KEY};
use crate::session::{Session, MASTER_VERSIONS_SHEET, MY_VERSIONS_SHEET};
use tracing::{info, warn};

/// Columns copied from the master version table
pub const VERSION_COLUMNS: [&str; 6] = ["version", "releasedate", "ismaster", "ssfullname", "ssabbr", "ssid"];

/// Overwrite the Codex version table with the master rows, then rebuild the
/// id caches from it
///
/// Returns the number of rows copied. A missing master table is reported to
/// the user with the administrator's contact and copies nothing.
pub fn get_latest_versions(session: &mut Session<'_>) -> Result<usize> {
    let master_id = session.config.master_ver_id.clone();
    let source = match session.sheet_data(&master_id, MASTER_VERSIONS_SHEET, true) {
        Ok(source) => source,
        Err(e @ (Error::SheetNotFound { .. } | Error::DocumentUnavailable { .. })) => {
            warn!(error = %e, "master version table unavailable");
            let contact = match session.config.admin_email.as_str() {
                "" => String::new(),
                admin => format!(" at {}", admin),
            };
            session.ui.alert(
                "❌ Error",
                &format!(
                    "Could not find the master <{}> sheet. Please contact the administrator{}.",
                    MASTER_VERSIONS_SHEET, contact
                ),
            );
            return Ok(0);
        }
        Err(e) => return Err(e),
    };
    source.require_col("version")?;
    source.require_col("ssabbr")?;
    source.require_col("ssid")?;

    let codex = session.codex_id()?;
    let dest = session.sheet_data(&codex, MY_VERSIONS_SHEET, true)?;
    dest.header()?;

    let pairs: Vec<(usize, usize)> = VERSION_COLUMNS
        .iter()
        .filter_map(|tag| Some((source.tags.col(tag)?, dest.tags.col(tag)?)))
        .collect();
    let width = pairs.iter().map(|&(_, d)| d + 1).max().unwrap_or(1);

    let mut rows = Vec::new();
    for (_, cells) in source.data_rows()? {
        if pairs.iter().all(|&(s, _)| cells.get(s).map_or(true, CellValue::is_blank)) {
            continue;
        }
        let mut row = vec![CellValue::Empty; width];
        for &(s, d) in &pairs {
            row[d] = cells.get(s).cloned().unwrap_or_default();
        }
        rows.push(row);
    }

    session.edit_sheet(&codex, MY_VERSIONS_SHEET, |sheet| replace_table_rows(sheet, &rows))?;
    session.properties.delete(SHEET_IDS_KEY);
    session.rebuild_version_cache()?;

    info!(rows = rows.len(), "version table synced from master");
    let listing = version_lines(&read_version_table(&source)?);
    session.ui.alert(
        "✅ Success",
        &format!(
            "The latest version data has been successfully loaded and cached.\n\n{}",
            listing.join("\n")
        ),
    );
    Ok(rows.len())
}

/// One line per document, versions in descending key order
fn version_lines(index: &VersionIndex) -> Vec<String> {
    index
        .iter()
        .rev()
        .flat_map(|(_, docs)| docs.values())
        .map(|entry| {
            let name = if entry.full_name.is_empty() {
                entry.abbreviation.as_str()
            } else {
                entry.full_name.as_str()
            };
            match entry.release_date {
                Some(date) => format!("v{} {} (released {})", entry.version, name, date.format("%Y-%m-%d")),
                None => format!("v{} {}", entry.version, name),
            }
        })
        .collect()
}

/// Delete every persistent property
pub fn clear_properties(session: &mut Session<'_>) {
    session.properties.clear();
    info!("persistent properties cleared");
    session
        .ui
        .alert("✅ Properties Cleared", "All stored properties have been deleted.");
}
