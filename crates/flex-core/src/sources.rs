//! Registering, renaming, sharing and removing custom content sources

use crate::aggregator::{registered_sources, source_name_col, sources_sheet, RegisteredSource};
use crate::codex::embed_codex_id;
use crate::error::{Error, Result};
use crate::grid::CellValue;
use crate::mutator::{append_table_row, delete_table_row};
use crate::session::{Choice, Outcome, Session};
use tracing::info;

/// Owner marker for sources the player created
pub const OWNER_ME: &str = "Me";
/// Version-table abbreviation of the custom-content template
pub const CUSTOM_TEMPLATE: &str = "Cust";

fn register(session: &mut Session<'_>, sheet_id: &str, name: &str, owner: &str) -> Result<usize> {
    let codex = session.codex_id()?;
    let sources = sources_sheet(session, &codex)?;
    let data = session.sheet_data(&codex, sources, true)?;
    let (name_col, name_tag) = source_name_col(&data)?;
    let mut values = vec![("sheetid", CellValue::text(sheet_id)), (name_tag, CellValue::text(name))];
    if data.tags.col("owner").is_some() {
        values.push(("owner", CellValue::text(owner)));
    }
    let row = data.build_row(values)?;
    session.edit_sheet(&codex, sources, |sheet| append_table_row(sheet, &row, name_col))
}

fn prompt_text(session: &mut Session<'_>, title: &str, message: &str) -> Option<String> {
    session
        .ui
        .prompt(title, message)
        .map(|answer| answer.trim().to_string())
        .filter(|answer| !answer.is_empty())
}

/// Register another player's custom workbook by id
pub fn add_custom_source(session: &mut Session<'_>) -> Result<Outcome> {
    let title = "Add New Source";
    let Some(source_id) = prompt_text(
        session,
        "Add Custom Source",
        "Please enter the ID of the custom abilities file you want to add:",
    ) else {
        return Ok(session.canceled("Operation was canceled."));
    };

    session.ui.toast("Verifying ID and permissions...", title);
    let owner = match session.workbook(&source_id)?.owner.as_str() {
        "" => "Unknown".to_string(),
        owner => owner.to_string(),
    };

    if registered_sources(session)?.iter().any(|s| s.sheet_id == source_id) {
        session.ui.alert(
            "⚠️ Duplicate",
            "This custom source has already been added to your Codex.",
        );
        return Ok(Outcome::NothingToDo);
    }

    let Some(name) = prompt_text(
        session,
        "Name the Source",
        &format!(
            "✅ Success! File access verified.\n\nOwner: {}\n\nPlease enter a friendly name for this source (e.g., \"John's Custom List\"):",
            owner
        ),
    ) else {
        return Ok(session.canceled("Operation was canceled."));
    };

    register(session, &source_id, &name, &owner)?;
    info!(id = %source_id, name = %name, "custom source added");
    session.ui.alert(
        "✅ Success",
        &format!("The custom source \"{}\" has been successfully added to your Codex.", name),
    );
    Ok(Outcome::Completed)
}

/// Let the user pick a registered source, failing if they do not own it
fn pick_owned_source(session: &mut Session<'_>, title: &str) -> Result<Option<RegisteredSource>> {
    let sources = registered_sources(session)?;
    if sources.is_empty() {
        session
            .ui
            .alert("ℹ️ No Sources", "There are no custom sources registered in your Codex.");
        return Ok(None);
    }

    let items: Vec<String> = sources
        .iter()
        .map(|s| format!("{} (owner: {})", s.name, s.owner))
        .collect();
    match session.choose(title, "Which custom list?", &items) {
        Choice::Picked(i) => {
            let source = sources[i].clone();
            if !session.config.is_owner(&source.owner) {
                return Err(Error::NotOwner {
                    name: source.name,
                    owner: source.owner,
                });
            }
            Ok(Some(source))
        }
        Choice::Canceled => {
            session.canceled("Operation was canceled.");
            Ok(None)
        }
        Choice::Invalid => {
            session.ui.alert("⚠️ Invalid Choice", "That is not one of the listed numbers.");
            Ok(None)
        }
    }
}

/// Rename an owned custom workbook and its registration
pub fn rename_custom_list(session: &mut Session<'_>) -> Result<Outcome> {
    let Some(source) = pick_owned_source(session, "Rename Custom List")? else {
        return Ok(Outcome::Canceled);
    };
    let Some(new_name) = prompt_text(
        session,
        "Rename Custom List",
        &format!("Enter a new name for \"{}\":", source.name),
    ) else {
        return Ok(session.canceled("Rename was canceled."));
    };

    session.store.rename(&source.sheet_id, &new_name)?;

    let codex = session.codex_id()?;
    let sources = sources_sheet(session, &codex)?;
    let (name_col, _) = source_name_col(&*session.sheet_data(&codex, sources, true)?)?;
    session.edit_sheet(&codex, sources, |sheet| {
        sheet.set_value(source.row, name_col, CellValue::text(new_name.as_str()));
        Ok(())
    })?;

    info!(id = %source.sheet_id, from = %source.name, to = %new_name, "custom list renamed");
    session.ui.alert(
        "✅ Success",
        &format!("\"{}\" has been renamed to \"{}\".", source.name, new_name),
    );
    Ok(Outcome::Completed)
}

/// Trash an owned custom workbook and drop its registration
///
/// The registration row is removed after the workbook is trashed; a
/// failure in between leaves the row pointing at a trashed file.
pub fn delete_custom_list(session: &mut Session<'_>) -> Result<Outcome> {
    let Some(source) = pick_owned_source(session, "Delete Custom List")? else {
        return Ok(Outcome::Canceled);
    };

    let message = format!(
        "⚠️ This will move \"{}\" to the trash and remove it from your Codex.\n\nTo confirm, please type DELETE below.",
        source.name
    );
    if !session.confirm("Confirm Deletion", &message, "DELETE") {
        return Ok(session.canceled("Deletion has been canceled."));
    }

    session.store.trash(&source.sheet_id)?;
    session.cache.invalidate_document(&source.sheet_id);

    let codex = session.codex_id()?;
    let sources = sources_sheet(session, &codex)?;
    session.edit_sheet(&codex, sources, |sheet| delete_table_row(sheet, source.row + 1))?;

    info!(id = %source.sheet_id, name = %source.name, "custom list deleted");
    session
        .ui
        .alert("✅ Deletion Complete", &format!("\"{}\" has been deleted.", source.name));
    Ok(Outcome::Completed)
}

/// Add a recipient to an owned custom workbook's sharing list
pub fn share_custom_lists(session: &mut Session<'_>) -> Result<Outcome> {
    let Some(source) = pick_owned_source(session, "Share Custom List")? else {
        return Ok(Outcome::Canceled);
    };
    let Some(email) = prompt_text(
        session,
        "Share Custom List",
        &format!("Enter the email address to share \"{}\" with:", source.name),
    ) else {
        return Ok(session.canceled("Sharing was canceled."));
    };

    if !email.contains('@') {
        session
            .ui
            .alert("⚠️ Invalid Email", &format!("\"{}\" is not an email address.", email));
        return Ok(Outcome::NothingToDo);
    }

    let workbook = session.store.open_mut(&source.sheet_id)?;
    if !workbook.shared_with.iter().any(|e| e.eq_ignore_ascii_case(&email)) {
        workbook.shared_with.push(email.clone());
    }

    info!(id = %source.sheet_id, recipient = %email, "custom list shared");
    session.ui.alert(
        "✅ Shared",
        &format!(
            "\"{}\" is now shared with {}.\n\nSend them the file ID so they can add it as a source:\n{}",
            source.name, email, source.sheet_id
        ),
    );
    Ok(Outcome::Completed)
}

/// Copy the custom-content template into a new workbook linked to the Codex
pub fn create_custom_list(session: &mut Session<'_>) -> Result<Outcome> {
    let version = session.config.current_version.clone();
    let template = session.resolve_document_id(&version, CUSTOM_TEMPLATE)?;
    let Some(name) = prompt_text(
        session,
        "Create Custom List",
        "Please enter a name for your new custom list:",
    ) else {
        return Ok(session.canceled("Operation was canceled."));
    };

    let codex = session.codex_id()?;
    let owner = session.config.user_email.clone();
    let new_id = session.store.copy(&template, &name, &owner)?;
    embed_codex_id(session.store.open_mut(&new_id)?, &codex)?;
    register(session, &new_id, &name, OWNER_ME)?;

    info!(id = %new_id, name = %name, "custom list created");
    session.ui.alert(
        "✅ Success",
        &format!("Your new custom list \"{}\" has been created and added to your Codex.", name),
    );
    Ok(Outcome::Completed)
}
