//! Version/abbreviation -> document id resolution
//!
//! [`VersionResolver`] answers from three tiers: its own memory, the
//! persistent property store and finally the player's version table, each
//! miss filling the tiers above it. [`MasterResolver`] reads the protected
//! master table and only ever caches in memory.

use crate::cache::SheetData;
use crate::error::{Error, Result};
use crate::grid::CellValue;
use crate::host::PropertyStore;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Property key the version index is stored under
pub const SHEET_IDS_KEY: &str = "sheetIDs";

/// One document of one rules version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    pub version: String,
    pub abbreviation: String,
    pub document_id: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
}

/// version -> abbreviation -> entry
pub type VersionIndex = BTreeMap<String, BTreeMap<String, VersionEntry>>;

fn cell_text(cell: Option<&CellValue>) -> String {
    cell.map(|c| c.to_string_value().trim().to_string())
        .unwrap_or_default()
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    ["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Read a version table (`version`, `ssabbr`, `ssid`, optional
/// `ssfullname`/`releasedate`) into an index
///
/// Rows missing a version, abbreviation or id are skipped.
pub fn read_version_table(data: &SheetData) -> Result<VersionIndex> {
    let version_col = data.require_col("version")?;
    let abbr_col = data.require_col("ssabbr")?;
    let id_col = data.require_col("ssid")?;
    let name_col = data.tags.col("ssfullname");
    let date_col = data.tags.col("releasedate");

    let mut index = VersionIndex::new();
    for (_, row) in data.data_rows()? {
        let version = cell_text(row.get(version_col));
        let abbreviation = cell_text(row.get(abbr_col));
        let document_id = cell_text(row.get(id_col));
        if version.is_empty() || abbreviation.is_empty() || document_id.is_empty() {
            continue;
        }

        let entry = VersionEntry {
            version: version.clone(),
            abbreviation: abbreviation.clone(),
            document_id,
            full_name: cell_text(name_col.and_then(|c| row.get(c))),
            release_date: parse_date(&cell_text(date_col.and_then(|c| row.get(c)))),
        };
        index.entry(version).or_default().insert(abbreviation, entry);
    }

    Ok(index)
}

fn lookup(index: &VersionIndex, version: &str, abbreviation: &str) -> Option<String> {
    index
        .get(version)
        .and_then(|docs| docs.get(abbreviation))
        .map(|e| e.document_id.clone())
}

fn not_found(version: &str, abbreviation: &str) -> Error {
    Error::VersionNotFound {
        version: version.to_string(),
        abbreviation: abbreviation.to_string(),
    }
}

/// Which tier answered the last lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Memory,
    Properties,
    Table,
}

/// Player-facing resolver over memory, properties and the version table
#[derive(Debug, Default)]
pub struct VersionResolver {
    memory: VersionIndex,
    last_tier: Option<Tier>,
}

impl VersionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a document id, calling `load_table` only when neither cache
    /// tier knows the pair
    pub fn resolve<F>(
        &mut self,
        version: &str,
        abbreviation: &str,
        properties: &mut dyn PropertyStore,
        load_table: F,
    ) -> Result<String>
    where
        F: FnOnce() -> Result<VersionIndex>,
    {
        if let Some(id) = lookup(&self.memory, version, abbreviation) {
            self.last_tier = Some(Tier::Memory);
            return Ok(id);
        }

        if let Some(stored) = Self::read_properties(properties) {
            for (v, docs) in stored {
                self.memory.entry(v).or_default().extend(docs);
            }
            if let Some(id) = lookup(&self.memory, version, abbreviation) {
                debug!(version, abbreviation, "version id loaded from properties");
                self.last_tier = Some(Tier::Properties);
                return Ok(id);
            }
        }

        self.memory = load_table()?;
        properties.set(SHEET_IDS_KEY, serde_json::to_string(&self.memory)?);
        debug!(
            versions = self.memory.len(),
            "version index rebuilt from table"
        );
        self.last_tier = Some(Tier::Table);

        lookup(&self.memory, version, abbreviation).ok_or_else(|| not_found(version, abbreviation))
    }

    /// Versions known to the caches, loading them through the tiers if needed
    pub fn known_versions<F>(
        &mut self,
        properties: &mut dyn PropertyStore,
        load_table: F,
    ) -> Result<Vec<String>>
    where
        F: FnOnce() -> Result<VersionIndex>,
    {
        if self.memory.is_empty() {
            match Self::read_properties(properties) {
                Some(stored) if !stored.is_empty() => self.memory = stored,
                _ => {
                    self.memory = load_table()?;
                    properties.set(SHEET_IDS_KEY, serde_json::to_string(&self.memory)?);
                }
            }
        }
        Ok(self.memory.keys().cloned().collect())
    }

    /// Replace every tier with a freshly read index
    pub fn rebuild(&mut self, index: VersionIndex, properties: &mut dyn PropertyStore) -> Result<()> {
        properties.set(SHEET_IDS_KEY, serde_json::to_string(&index)?);
        self.memory = index;
        Ok(())
    }

    pub fn clear_memory(&mut self) {
        self.memory.clear();
        self.last_tier = None;
    }

    pub fn last_tier(&self) -> Option<Tier> {
        self.last_tier
    }

    fn read_properties(properties: &dyn PropertyStore) -> Option<VersionIndex> {
        let raw = properties.get(SHEET_IDS_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(index) => Some(index),
            Err(e) => {
                warn!(error = %e, "ignoring unreadable {} property", SHEET_IDS_KEY);
                None
            }
        }
    }
}

/// Designer-facing resolver over the master Versions table
#[derive(Debug, Default)]
pub struct MasterResolver {
    memory: Option<VersionIndex>,
}

impl MasterResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve<F>(&mut self, version: &str, abbreviation: &str, load_table: F) -> Result<String>
    where
        F: FnOnce() -> Result<VersionIndex>,
    {
        let index = match self.memory.take() {
            Some(index) => index,
            None => load_table()?,
        };
        let found = lookup(&index, version, abbreviation);
        self.memory = Some(index);
        found.ok_or_else(|| not_found(version, abbreviation))
    }
}
