//! Named commands and the single place errors become user alerts

use crate::catalog::build_catalog;
use crate::characters::{create_latest, create_legacy, delete_character, rename_character};
use crate::error::{Error, Result};
use crate::filter::{apply_filter, refresh_available_tables, GAME_SHEET};
use crate::publish::{delete_selected, verify_and_publish};
use crate::schema::CatalogKind;
use crate::session::Session;
use crate::skills::{prompt_skill_increment, verify_skills};
use crate::sources::{add_custom_source, create_custom_list, delete_custom_list, rename_custom_list, share_custom_lists};
use crate::sync::{clear_properties, get_latest_versions};
use crate::tags::verify_tags;
use std::fmt;
use std::str::FromStr;
use tracing::{error, info};

/// Every command a menu or script can run by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TagVerification,
    BuildPowers,
    BuildMagicItems,
    SyncPowerChoices,
    SyncMagicItemChoices,
    FilterPowers,
    FilterMagicItems,
    VerifyAndPublish,
    VerifyAndPublishMagicItems,
    DeleteSelectedPowers,
    DeleteSelectedMagicItems,
    AddNewCustomSource,
    RenameCustomList,
    DeleteCustomList,
    ShareCustomLists,
    CreateCustomList,
    CreateLatestCharacter,
    CreateLegacyCharacter,
    RenameCharacter,
    DeleteCharacter,
    GetLatestVersions,
    ClearProperties,
    VerifySkills,
    IncrementSkill,
    InvalidateGameCache,
}

impl Command {
    pub const ALL: [Command; 25] = [
        Command::TagVerification,
        Command::BuildPowers,
        Command::BuildMagicItems,
        Command::SyncPowerChoices,
        Command::SyncMagicItemChoices,
        Command::FilterPowers,
        Command::FilterMagicItems,
        Command::VerifyAndPublish,
        Command::VerifyAndPublishMagicItems,
        Command::DeleteSelectedPowers,
        Command::DeleteSelectedMagicItems,
        Command::AddNewCustomSource,
        Command::RenameCustomList,
        Command::DeleteCustomList,
        Command::ShareCustomLists,
        Command::CreateCustomList,
        Command::CreateLatestCharacter,
        Command::CreateLegacyCharacter,
        Command::RenameCharacter,
        Command::DeleteCharacter,
        Command::GetLatestVersions,
        Command::ClearProperties,
        Command::VerifySkills,
        Command::IncrementSkill,
        Command::InvalidateGameCache,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Command::TagVerification => "TagVerification",
            Command::BuildPowers => "BuildPowers",
            Command::BuildMagicItems => "BuildMagicItems",
            Command::SyncPowerChoices => "SyncPowerChoices",
            Command::SyncMagicItemChoices => "SyncMagicItemChoices",
            Command::FilterPowers => "FilterPowers",
            Command::FilterMagicItems => "FilterMagicItems",
            Command::VerifyAndPublish => "VerifyAndPublish",
            Command::VerifyAndPublishMagicItems => "VerifyAndPublishMagicItems",
            Command::DeleteSelectedPowers => "DeleteSelectedPowers",
            Command::DeleteSelectedMagicItems => "DeleteSelectedMagicItems",
            Command::AddNewCustomSource => "AddNewCustomSource",
            Command::RenameCustomList => "RenameCustomList",
            Command::DeleteCustomList => "DeleteCustomList",
            Command::ShareCustomLists => "ShareCustomLists",
            Command::CreateCustomList => "CreateCustomList",
            Command::CreateLatestCharacter => "CreateLatestCharacter",
            Command::CreateLegacyCharacter => "CreateLegacyCharacter",
            Command::RenameCharacter => "RenameCharacter",
            Command::DeleteCharacter => "DeleteCharacter",
            Command::GetLatestVersions => "GetLatestVersions",
            Command::ClearProperties => "ClearProperties",
            Command::VerifySkills => "VerifySkills",
            Command::IncrementSkill => "IncrementSkill",
            Command::InvalidateGameCache => "InvalidateGameCache",
        }
    }

    /// One-line description for listings
    pub fn summary(self) -> &'static str {
        match self {
            Command::TagVerification => "Check the active sheet for duplicate row/column tags",
            Command::BuildPowers => "Rebuild the DB Powers sheet from the master tables",
            Command::BuildMagicItems => "Rebuild the DB Magic Items sheet from the master tables",
            Command::SyncPowerChoices => "Refill <Filter Powers> with every available table",
            Command::SyncMagicItemChoices => "Refill <Filter Magic Items> with every available table",
            Command::FilterPowers => "Apply the checked power tables to the Game dropdowns",
            Command::FilterMagicItems => "Apply the checked magic item tables to the Game dropdowns",
            Command::VerifyAndPublish => "Validate and publish custom powers",
            Command::VerifyAndPublishMagicItems => "Validate and publish custom magic items",
            Command::DeleteSelectedPowers => "Delete the checked custom powers",
            Command::DeleteSelectedMagicItems => "Delete the checked custom magic items",
            Command::AddNewCustomSource => "Register another player's custom list",
            Command::RenameCustomList => "Rename a custom list you own",
            Command::DeleteCustomList => "Trash a custom list you own",
            Command::ShareCustomLists => "Share a custom list you own",
            Command::CreateCustomList => "Create a new custom list from the template",
            Command::CreateLatestCharacter => "Create a character on the current version",
            Command::CreateLegacyCharacter => "Create a character on an older version",
            Command::RenameCharacter => "Rename a character",
            Command::DeleteCharacter => "Delete a character",
            Command::GetLatestVersions => "Copy the master version table into the Codex",
            Command::ClearProperties => "Delete every stored property",
            Command::VerifySkills => "Fix skill-type emojis on the active sheet",
            Command::IncrementSkill => "Add one increment to a skill on the Game sheet",
            Command::InvalidateGameCache => "Drop the cached Game sheet",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Command::ALL
            .into_iter()
            .find(|c| c.name() == s.trim())
            .ok_or_else(|| Error::UnknownCommand(s.to_string()))
    }
}

fn verify_active_sheet_tags(session: &mut Session<'_>) -> Result<()> {
    let sheet = session.require_active_sheet()?;
    let active = session.active_id().to_string();
    let grid = session.workbook(&active)?.require_sheet(&sheet)?.grid();

    match verify_tags(grid) {
        Ok(()) => {
            session
                .ui
                .alert("Tag Verification", "✅ Success! All column and row tags are unique.");
            Ok(())
        }
        Err(Error::DuplicateTag {
            tag,
            axis,
            original,
            duplicate,
        }) => {
            session.ui.alert(
                "⚠️ Tag Verification Failed",
                &format!(
                    "Duplicate {} tag found: \"{}\"\n\nOriginal: {}\nDuplicate: {}",
                    axis, tag, original, duplicate
                ),
            );
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Run one command, returning its error instead of showing it
pub fn execute(session: &mut Session<'_>, command: Command) -> Result<()> {
    info!(%command, "running command");
    match command {
        Command::TagVerification => verify_active_sheet_tags(session)?,
        Command::BuildPowers => {
            build_catalog(session, CatalogKind::Powers)?;
        }
        Command::BuildMagicItems => {
            build_catalog(session, CatalogKind::MagicItems)?;
        }
        Command::SyncPowerChoices => {
            refresh_available_tables(session, CatalogKind::Powers)?;
        }
        Command::SyncMagicItemChoices => {
            refresh_available_tables(session, CatalogKind::MagicItems)?;
        }
        Command::FilterPowers => {
            apply_filter(session, CatalogKind::Powers)?;
        }
        Command::FilterMagicItems => {
            apply_filter(session, CatalogKind::MagicItems)?;
        }
        Command::VerifyAndPublish => {
            verify_and_publish(session, CatalogKind::Powers)?;
        }
        Command::VerifyAndPublishMagicItems => {
            verify_and_publish(session, CatalogKind::MagicItems)?;
        }
        Command::DeleteSelectedPowers => {
            delete_selected(session, CatalogKind::Powers)?;
        }
        Command::DeleteSelectedMagicItems => {
            delete_selected(session, CatalogKind::MagicItems)?;
        }
        Command::AddNewCustomSource => {
            add_custom_source(session)?;
        }
        Command::RenameCustomList => {
            rename_custom_list(session)?;
        }
        Command::DeleteCustomList => {
            delete_custom_list(session)?;
        }
        Command::ShareCustomLists => {
            share_custom_lists(session)?;
        }
        Command::CreateCustomList => {
            create_custom_list(session)?;
        }
        Command::CreateLatestCharacter => {
            create_latest(session)?;
        }
        Command::CreateLegacyCharacter => {
            create_legacy(session)?;
        }
        Command::RenameCharacter => {
            rename_character(session)?;
        }
        Command::DeleteCharacter => {
            delete_character(session)?;
        }
        Command::GetLatestVersions => {
            get_latest_versions(session)?;
        }
        Command::ClearProperties => clear_properties(session),
        Command::VerifySkills => {
            verify_skills(session)?;
        }
        Command::IncrementSkill => {
            prompt_skill_increment(session)?;
        }
        Command::InvalidateGameCache => {
            let active = session.active_id().to_string();
            session.cache.invalidate(&active, GAME_SHEET);
        }
    }
    Ok(())
}

/// Run a command by name, reporting any failure as an `❌ Error` alert
///
/// Returns whether the command succeeded.
pub fn run(session: &mut Session<'_>, name: &str) -> bool {
    let result = name.parse().and_then(|command| execute(session, command));
    match result {
        Ok(()) => true,
        Err(e) => {
            error!(command = name, error = %e, "command failed");
            session.ui.alert("❌ Error", &e.to_string());
            false
        }
    }
}
