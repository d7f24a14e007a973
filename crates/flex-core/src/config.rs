//! Installation settings

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Settings shared by every command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlexConfig {
    /// Rules version new characters and lookups default to
    pub current_version: String,
    /// Id of the authoritative Versions workbook
    pub master_ver_id: String,
    /// Id of the player's Codex; discovered from the Data sheet when unset
    pub codex_id: Option<String>,
    /// The acting user
    pub user_email: String,
    pub admin_email: String,
}

impl Default for FlexConfig {
    fn default() -> Self {
        Self {
            current_version: "3".to_string(),
            master_ver_id: "Ver".to_string(),
            codex_id: None,
            user_email: String::new(),
            admin_email: String::new(),
        }
    }
}

impl FlexConfig {
    /// Load settings from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Load settings, or the defaults when the file does not exist
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save settings to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Whether `owner` (an email or the `Me` marker) is the acting user
    pub fn is_owner(&self, owner: &str) -> bool {
        let owner = owner.trim();
        owner.eq_ignore_ascii_case("me")
            || (!self.user_email.is_empty() && owner.eq_ignore_ascii_case(&self.user_email))
    }
}
