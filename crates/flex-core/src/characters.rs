//! Character workbooks listed in the Codex

use crate::cache::SheetData;
use crate::codex::embed_codex_id;
use crate::error::{Error, Result};
use crate::grid::CellValue;
use crate::mutator::{append_table_row, delete_table_row};
use crate::session::{Choice, Outcome, Session};
use tracing::info;

pub const CHARACTERS_SHEET: &str = "Characters";
/// Version-table abbreviation of the character sheet template
pub const CHARACTER_TEMPLATE: &str = "CS";
/// Version-table abbreviation of the rules document
pub const RULES_DOCUMENT: &str = "Rules";

/// One row of the Codex character table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterRecord {
    pub document_id: String,
    pub version: String,
    pub name: String,
    pub rules_link: String,
    pub row: usize,
}

/// Every character with a document id, in table order
pub fn read_characters(data: &SheetData) -> Result<Vec<CharacterRecord>> {
    let id_col = data.require_col("documentid")?;
    let version_col = data.require_col("version")?;
    let name_col = data.require_col("name")?;
    let rules_col = data.tags.col("ruleslink");

    let mut characters = Vec::new();
    for (row, cells) in data.data_rows()? {
        let text = |c: usize| {
            cells
                .get(c)
                .map(|v| v.to_string_value().trim().to_string())
                .unwrap_or_default()
        };
        let document_id = text(id_col);
        if document_id.is_empty() {
            continue;
        }
        characters.push(CharacterRecord {
            document_id,
            version: text(version_col),
            name: text(name_col),
            rules_link: rules_col.map(text).unwrap_or_default(),
            row,
        });
    }
    Ok(characters)
}

pub fn list_characters(session: &mut Session<'_>) -> Result<Vec<CharacterRecord>> {
    let codex = session.codex_id()?;
    let data = session.sheet_data(&codex, CHARACTERS_SHEET, true)?;
    read_characters(&data)
}

/// Create a character on the configured current version
pub fn create_latest(session: &mut Session<'_>) -> Result<Outcome> {
    let version = session.config.current_version.clone();
    create_character(session, &version)
}

/// Create a character on a version the player picks
pub fn create_legacy(session: &mut Session<'_>) -> Result<Outcome> {
    let versions = session.known_versions()?;
    if versions.is_empty() {
        session.ui.alert("ℹ️ No Versions", "No versions are listed in your Codex.");
        return Ok(Outcome::NothingToDo);
    }

    let items: Vec<String> = versions.iter().map(|v| format!("Version {}", v)).collect();
    match session.choose("Create Legacy Character", "Which version should the character use?", &items) {
        Choice::Picked(i) => {
            let version = versions[i].clone();
            create_character(session, &version)
        }
        Choice::Canceled => Ok(session.canceled("Character creation was canceled.")),
        Choice::Invalid => {
            session.ui.alert("⚠️ Invalid Choice", "That is not one of the listed versions.");
            Ok(Outcome::Canceled)
        }
    }
}

/// Copy the version's character template, link it to the Codex and list it
pub fn create_character(session: &mut Session<'_>, version: &str) -> Result<Outcome> {
    let template = session.resolve_document_id(version, CHARACTER_TEMPLATE)?;
    let rules_link = match session.resolve_document_id(version, RULES_DOCUMENT) {
        Ok(id) => id,
        Err(Error::VersionNotFound { .. }) => String::new(),
        Err(e) => return Err(e),
    };

    let Some(name) = session
        .ui
        .prompt("Create Character", "Please enter a name for your new character:")
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
    else {
        return Ok(session.canceled("Character creation was canceled."));
    };

    let codex = session.codex_id()?;
    let owner = session.config.user_email.clone();
    let new_id = session.store.copy(&template, &name, &owner)?;
    embed_codex_id(session.store.open_mut(&new_id)?, &codex)?;

    let data = session.sheet_data(&codex, CHARACTERS_SHEET, true)?;
    let id_col = data.require_col("documentid")?;
    let row = data.build_row(vec![
        ("documentid", CellValue::text(new_id.as_str())),
        ("version", CellValue::text(version)),
        ("name", CellValue::text(name.as_str())),
        ("ruleslink", CellValue::text(rules_link)),
    ])?;
    session.edit_sheet(&codex, CHARACTERS_SHEET, |sheet| append_table_row(sheet, &row, id_col))?;

    info!(id = %new_id, name = %name, version, "character created");
    session.ui.alert(
        "✅ Character Created",
        &format!("\"{}\" (version {}) has been created and added to your Codex.", name, version),
    );
    Ok(Outcome::Completed)
}

fn pick_character(session: &mut Session<'_>, title: &str) -> Result<Option<CharacterRecord>> {
    let characters = list_characters(session)?;
    if characters.is_empty() {
        session.ui.alert("ℹ️ No Characters", "There are no characters listed in your Codex.");
        return Ok(None);
    }

    let items: Vec<String> = characters
        .iter()
        .map(|c| format!("{} (version {})", c.name, c.version))
        .collect();
    match session.choose(title, "Which character?", &items) {
        Choice::Picked(i) => Ok(characters.into_iter().nth(i)),
        Choice::Canceled => {
            session.canceled("Operation was canceled.");
            Ok(None)
        }
        Choice::Invalid => {
            session.ui.alert("⚠️ Invalid Choice", "That is not one of the listed characters.");
            Ok(None)
        }
    }
}

/// Rename a character's workbook and its Codex row
pub fn rename_character(session: &mut Session<'_>) -> Result<Outcome> {
    let Some(character) = pick_character(session, "Rename Character")? else {
        return Ok(Outcome::Canceled);
    };
    let Some(new_name) = session
        .ui
        .prompt("Rename Character", &format!("Enter a new name for \"{}\":", character.name))
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
    else {
        return Ok(session.canceled("Rename was canceled."));
    };

    session.store.rename(&character.document_id, &new_name)?;

    let codex = session.codex_id()?;
    let name_col = session.sheet_data(&codex, CHARACTERS_SHEET, true)?.require_col("name")?;
    session.edit_sheet(&codex, CHARACTERS_SHEET, |sheet| {
        sheet.set_value(character.row, name_col, CellValue::text(new_name.as_str()));
        Ok(())
    })?;

    info!(id = %character.document_id, to = %new_name, "character renamed");
    session.ui.alert(
        "✅ Success",
        &format!("\"{}\" has been renamed to \"{}\".", character.name, new_name),
    );
    Ok(Outcome::Completed)
}

/// Trash a character's workbook and remove its Codex row
///
/// Not transactional: if removing the row fails after the trash succeeded,
/// the workbook stays trashed.
pub fn delete_character(session: &mut Session<'_>) -> Result<Outcome> {
    let Some(character) = pick_character(session, "Delete Character")? else {
        return Ok(Outcome::Canceled);
    };

    let message = format!(
        "⚠️ Are you sure you wish to permanently DELETE \"{}\"?\n\nThis action cannot be undone.\n\nTo confirm, please type DELETE below.",
        character.name
    );
    if !session.confirm("Confirm Deletion", &message, "DELETE") {
        return Ok(session.canceled("Deletion has been canceled."));
    }

    session.store.trash(&character.document_id)?;
    session.cache.invalidate_document(&character.document_id);

    let codex = session.codex_id()?;
    session.edit_sheet(&codex, CHARACTERS_SHEET, |sheet| {
        delete_table_row(sheet, character.row + 1)
    })?;

    info!(id = %character.document_id, name = %character.name, "character deleted");
    session.ui.alert(
        "✅ Deletion Complete",
        &format!("\"{}\" has been deleted.", character.name),
    );
    Ok(Outcome::Completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codex::{codex_id_of, DATA_SHEET};
    use crate::config::FlexConfig;
    use crate::grid::Grid;
    use crate::host::{DocumentStore, MemoryProperties, MemoryStore, RecordingUi};
    use crate::session::MY_VERSIONS_SHEET;
    use crate::sheet::{Sheet, Workbook};

    fn template(id: &str) -> Workbook {
        Workbook::new(id, "Template", "admin").with_sheet(Sheet::with_grid(
            DATA_SHEET,
            Grid::from_text_rows(&[&["", "Data"], &["CodexID", ""]]),
        ))
    }

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.insert(
            Workbook::new("codex", "Codex", "me@example.com")
                .with_sheet(Sheet::with_grid(
                    CHARACTERS_SHEET,
                    Grid::from_text_rows(&[
                        &["", "DocumentID", "Version", "Name", "RulesLink"],
                        &["Header", "", "", "", ""],
                        &["", "", "", "", ""],
                    ]),
                ))
                .with_sheet(Sheet::with_grid(
                    MY_VERSIONS_SHEET,
                    Grid::from_text_rows(&[
                        &["", "Version", "SSAbbr", "SSID"],
                        &["Header", "", "", ""],
                        &["", "2", "CS", "cs-v2"],
                        &["", "3", "CS", "cs-v3"],
                        &["", "3", "Rules", "rules-v3"],
                    ]),
                )),
        );
        store.insert(template("cs-v2"));
        store.insert(template("cs-v3"));
        store
    }

    #[test]
    fn test_create_latest_lists_character() {
        let mut store = store();
        let mut props = MemoryProperties::new();
        let mut ui = RecordingUi::with_answers([Some("Aria")]);
        let config = FlexConfig::default();
        let mut session = Session::new(&mut store, &mut props, &mut ui, &config, "codex");

        assert_eq!(create_latest(&mut session).unwrap(), Outcome::Completed);
        let characters = list_characters(&mut session).unwrap();
        assert_eq!(characters.len(), 1);
        assert_eq!(characters[0].name, "Aria");
        assert_eq!(characters[0].version, "3");
        assert_eq!(characters[0].rules_link, "rules-v3");
        assert_eq!(characters[0].row, 2);
        let id = characters[0].document_id.clone();
        drop(session);

        assert_eq!(codex_id_of(store.open(&id).unwrap()).as_deref(), Some("codex"));
    }

    #[test]
    fn test_create_legacy_picks_version() {
        let mut store = store();
        let mut props = MemoryProperties::new();
        let mut ui = RecordingUi::with_answers([Some("1"), Some("Old Timer")]);
        let config = FlexConfig::default();
        let mut session = Session::new(&mut store, &mut props, &mut ui, &config, "codex");

        assert_eq!(create_legacy(&mut session).unwrap(), Outcome::Completed);
        let characters = list_characters(&mut session).unwrap();
        assert_eq!(characters[0].version, "2");
        assert_eq!(characters[0].rules_link, "");
    }

    #[test]
    fn test_rename_then_delete() {
        let mut store = store();
        let mut props = MemoryProperties::new();
        let mut ui = RecordingUi::with_answers([
            Some("Aria"),
            Some("1"),
            Some("Brin"),
            Some("1"),
            Some("nope"),
            Some("1"),
            Some("DELETE"),
        ]);
        let config = FlexConfig::default();
        let mut session = Session::new(&mut store, &mut props, &mut ui, &config, "codex");

        create_latest(&mut session).unwrap();
        assert_eq!(rename_character(&mut session).unwrap(), Outcome::Completed);
        let id = list_characters(&mut session).unwrap()[0].document_id.clone();
        assert_eq!(session.workbook(&id).unwrap().name, "Brin");

        assert_eq!(delete_character(&mut session).unwrap(), Outcome::Canceled);
        assert_eq!(delete_character(&mut session).unwrap(), Outcome::Completed);
        assert!(list_characters(&mut session).unwrap().is_empty());
        drop(session);
        assert!(!store.contains(&id));
    }
}
