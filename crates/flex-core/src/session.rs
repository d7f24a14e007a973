//! The operation context every workflow runs in

use crate::cache::{ChangeType, SheetCache, SheetData};
use crate::codex::codex_id_of;
use crate::config::FlexConfig;
use crate::error::{Error, Result};
use crate::host::{DocumentStore, PropertyStore, Ui};
use crate::resolver::{read_version_table, MasterResolver, VersionIndex, VersionResolver};
use crate::sheet::{Sheet, Workbook};
use std::rc::Rc;
use tracing::debug;

/// Sheet holding the player's copy of the version table in the Codex
pub const MY_VERSIONS_SHEET: &str = "MyVersions";
/// Sheet holding the authoritative version table in the master workbook
pub const MASTER_VERSIONS_SHEET: &str = "Versions";

/// How a user-facing workflow ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// The user canceled a prompt or failed a confirmation
    Canceled,
    /// There was nothing to act on
    NothingToDo,
}

/// Result of asking the user to pick from a numbered list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Choice {
    Picked(usize),
    Canceled,
    Invalid,
}

/// Host collaborators plus the caches of one command execution
pub struct Session<'a> {
    pub store: &'a mut dyn DocumentStore,
    pub properties: &'a mut dyn PropertyStore,
    pub ui: &'a mut dyn Ui,
    pub config: &'a FlexConfig,
    pub cache: SheetCache,
    versions: VersionResolver,
    master: MasterResolver,
    active: String,
    active_sheet: Option<String>,
    codex: Option<String>,
}

impl<'a> Session<'a> {
    /// A session acting on the workbook `active`
    pub fn new(
        store: &'a mut dyn DocumentStore,
        properties: &'a mut dyn PropertyStore,
        ui: &'a mut dyn Ui,
        config: &'a FlexConfig,
        active: impl Into<String>,
    ) -> Self {
        Self {
            store,
            properties,
            ui,
            config,
            cache: SheetCache::new(),
            versions: VersionResolver::new(),
            master: MasterResolver::new(),
            active: active.into(),
            active_sheet: None,
            codex: None,
        }
    }

    pub fn with_active_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.active_sheet = Some(sheet.into());
        self
    }

    pub fn active_id(&self) -> &str {
        &self.active
    }

    pub fn active_sheet(&self) -> Option<&str> {
        self.active_sheet.as_deref()
    }

    pub fn set_active_sheet(&mut self, sheet: Option<String>) {
        self.active_sheet = sheet;
    }

    /// The active sheet's name, or an error for commands that need one
    pub fn require_active_sheet(&self) -> Result<String> {
        self.active_sheet.clone().ok_or(Error::NoActiveSheet)
    }

    pub fn workbook(&self, id: &str) -> Result<&Workbook> {
        self.store.open(id)
    }

    /// Cached sheet data of any workbook
    pub fn sheet_data(&mut self, document_id: &str, sheet: &str, force_refresh: bool) -> Result<Rc<SheetData>> {
        let workbook = self.store.open(document_id)?;
        self.cache
            .get_sheet_data(document_id, sheet, workbook, force_refresh)
    }

    /// Cached sheet data of the active workbook
    pub fn active_data(&mut self, sheet: &str, force_refresh: bool) -> Result<Rc<SheetData>> {
        let active = self.active.clone();
        self.sheet_data(&active, sheet, force_refresh)
    }

    /// Mutate one sheet and drop its cache entry
    ///
    /// A change in the sheet's row or column count is reported to the cache
    /// as a structural change, which drops every entry.
    pub fn edit_sheet<T, F>(&mut self, document_id: &str, sheet: &str, edit: F) -> Result<T>
    where
        F: FnOnce(&mut Sheet) -> Result<T>,
    {
        let target = self
            .store
            .open_mut(document_id)?
            .require_sheet_mut(sheet)?;
        let (rows, cols) = (target.grid().row_count(), target.grid().column_count());
        let result = edit(&mut *target);
        let (new_rows, new_cols) = (target.grid().row_count(), target.grid().column_count());

        let change = if new_rows > rows {
            ChangeType::InsertRow
        } else if new_rows < rows {
            ChangeType::RemoveRow
        } else if new_cols > cols {
            ChangeType::InsertColumn
        } else if new_cols < cols {
            ChangeType::RemoveColumn
        } else {
            ChangeType::Edit
        };
        if change.is_structural() {
            self.cache.observe_change(change);
        } else {
            self.cache.invalidate(document_id, sheet);
        }
        result
    }

    /// Id of the player's Codex
    ///
    /// Configuration wins; otherwise the active workbook's Data-sheet link
    /// is followed, and a workbook without one is its own Codex.
    pub fn codex_id(&mut self) -> Result<String> {
        if let Some(id) = &self.config.codex_id {
            return Ok(id.clone());
        }
        if let Some(id) = &self.codex {
            return Ok(id.clone());
        }

        let active = self.store.open(&self.active)?;
        let id = codex_id_of(active).unwrap_or_else(|| self.active.clone());
        debug!(codex = %id, "resolved codex");
        self.codex = Some(id.clone());
        Ok(id)
    }

    fn player_version_table(&mut self) -> Result<VersionIndex> {
        let codex = self.codex_id()?;
        let data = self.sheet_data(&codex, MY_VERSIONS_SHEET, true)?;
        read_version_table(&data)
    }

    /// Document id for a version/abbreviation from the player's tables
    pub fn resolve_document_id(&mut self, version: &str, abbreviation: &str) -> Result<String> {
        let codex = self.codex_id()?;
        let Session {
            store,
            properties,
            cache,
            versions,
            ..
        } = self;
        versions.resolve(version, abbreviation, &mut **properties, || {
            let workbook = store.open(&codex)?;
            let data = cache.get_sheet_data(&codex, MY_VERSIONS_SHEET, workbook, true)?;
            read_version_table(&data)
        })
    }

    /// Document id from the protected master Versions table
    pub fn master_document_id(&mut self, version: &str, abbreviation: &str) -> Result<String> {
        let master_id = self.config.master_ver_id.clone();
        let Session {
            store, cache, master, ..
        } = self;
        master.resolve(version, abbreviation, || {
            let workbook = store.open(&master_id)?;
            let data = cache.get_sheet_data(&master_id, MASTER_VERSIONS_SHEET, workbook, false)?;
            read_version_table(&data)
        })
    }

    /// Id of the player's local DB for the current version
    pub fn local_db_id(&mut self) -> Result<String> {
        let version = self.config.current_version.clone();
        self.resolve_document_id(&version, "DB")
    }

    pub fn known_versions(&mut self) -> Result<Vec<String>> {
        let codex = self.codex_id()?;
        let Session {
            store,
            properties,
            cache,
            versions,
            ..
        } = self;
        versions.known_versions(&mut **properties, || {
            let workbook = store.open(&codex)?;
            let data = cache.get_sheet_data(&codex, MY_VERSIONS_SHEET, workbook, true)?;
            read_version_table(&data)
        })
    }

    /// Drop every cached version id and re-read the player's table into
    /// memory and properties
    pub fn rebuild_version_cache(&mut self) -> Result<()> {
        self.versions.clear_memory();
        let index = self.player_version_table()?;
        self.versions.rebuild(index, &mut *self.properties)
    }

    pub(crate) fn canceled(&mut self, message: &str) -> Outcome {
        self.ui.alert("ℹ️ Canceled", message);
        Outcome::Canceled
    }

    /// Ask for a 1-based choice from `items`
    pub(crate) fn choose(&mut self, title: &str, intro: &str, items: &[String]) -> Choice {
        let listing: Vec<String> = items
            .iter()
            .enumerate()
            .map(|(i, item)| format!("{}. {}", i + 1, item))
            .collect();
        let message = format!(
            "{}\n\n{}\n\nEnter a number from 1 to {}.",
            intro,
            listing.join("\n"),
            items.len()
        );

        match self.ui.prompt(title, &message) {
            None => Choice::Canceled,
            Some(answer) => match answer.trim().parse::<usize>() {
                Ok(n) if n >= 1 && n <= items.len() => Choice::Picked(n - 1),
                _ => Choice::Invalid,
            },
        }
    }

    /// Ask the user to type `keyword` (case-insensitive) to confirm
    pub(crate) fn confirm(&mut self, title: &str, message: &str, keyword: &str) -> bool {
        self.ui
            .prompt(title, message)
            .is_some_and(|answer| answer.trim().eq_ignore_ascii_case(keyword))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{CellValue, Grid};
    use crate::host::{MemoryProperties, MemoryStore, RecordingUi};
    use crate::resolver::SHEET_IDS_KEY;

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.insert(
            Workbook::new("codex", "Player's Codex", "me").with_sheet(Sheet::with_grid(
                MY_VERSIONS_SHEET,
                Grid::from_text_rows(&[
                    &["", "Version", "SSAbbr", "SSID"],
                    &["Header", "Version", "Abbr", "Id"],
                    &["", "3", "DB", "db-3"],
                    &["", "3", "CS", "cs-3"],
                ]),
            )),
        );
        store.insert(
            Workbook::new("cs1", "Aria", "me").with_sheet(Sheet::with_grid(
                "Data",
                Grid::from_text_rows(&[&["", "Data"], &["CodexID", "codex"]]),
            )),
        );
        store
    }

    #[test]
    fn test_codex_found_through_data_sheet() {
        let mut store = store();
        let mut props = MemoryProperties::new();
        let mut ui = RecordingUi::new();
        let config = FlexConfig::default();
        let mut session = Session::new(&mut store, &mut props, &mut ui, &config, "cs1");

        assert_eq!(session.codex_id().unwrap(), "codex");
        assert_eq!(session.local_db_id().unwrap(), "db-3");
        assert_eq!(session.resolve_document_id("3", "CS").unwrap(), "cs-3");
        drop(session);
        assert!(props.get(SHEET_IDS_KEY).is_some());
    }

    #[test]
    fn test_workbook_without_data_sheet_is_its_own_codex() {
        let mut store = store();
        let mut props = MemoryProperties::new();
        let mut ui = RecordingUi::new();
        let config = FlexConfig::default();
        let mut session = Session::new(&mut store, &mut props, &mut ui, &config, "codex");
        assert_eq!(session.codex_id().unwrap(), "codex");
    }

    #[test]
    fn test_edit_sheet_invalidates_cache() {
        let mut store = store();
        let mut props = MemoryProperties::new();
        let mut ui = RecordingUi::new();
        let config = FlexConfig::default();
        let mut session = Session::new(&mut store, &mut props, &mut ui, &config, "cs1");

        session.active_data("Data", false).unwrap();
        session
            .edit_sheet("cs1", "Data", |sheet| {
                sheet.set_value(1, 1, CellValue::text("other"));
                Ok(())
            })
            .unwrap();
        assert!(!session.cache.contains("cs1", "Data"));
    }

    #[test]
    fn test_row_removal_clears_every_cached_sheet() {
        let mut store = store();
        let mut props = MemoryProperties::new();
        let mut ui = RecordingUi::new();
        let config = FlexConfig::default();
        let mut session = Session::new(&mut store, &mut props, &mut ui, &config, "cs1");

        session.active_data("Data", false).unwrap();
        session.sheet_data("codex", MY_VERSIONS_SHEET, false).unwrap();
        session
            .edit_sheet("cs1", "Data", |sheet| {
                sheet.set_value(0, 1, CellValue::text("Notes"));
                Ok(())
            })
            .unwrap();
        assert!(session.cache.contains("codex", MY_VERSIONS_SHEET));

        session.active_data("Data", false).unwrap();
        session
            .edit_sheet("codex", MY_VERSIONS_SHEET, |sheet| {
                sheet.delete_row(3);
                Ok(())
            })
            .unwrap();
        assert!(session.cache.is_empty());
    }

    #[test]
    fn test_choose_and_confirm() {
        let mut store = store();
        let mut props = MemoryProperties::new();
        let mut ui = RecordingUi::with_answers([Some("2"), Some("7"), None, Some(" delete all ")]);
        let config = FlexConfig::default();
        let mut session = Session::new(&mut store, &mut props, &mut ui, &config, "cs1");
        let items = vec!["a".to_string(), "b".to_string()];

        assert_eq!(session.choose("t", "pick", &items), Choice::Picked(1));
        assert_eq!(session.choose("t", "pick", &items), Choice::Invalid);
        assert_eq!(session.choose("t", "pick", &items), Choice::Canceled);
        assert!(session.confirm("t", "sure?", "DELETE ALL"));
    }
}
