//! Collaborators supplied by the spreadsheet host
//!
//! Every workflow talks to the outside world through three seams:
//! - [`DocumentStore`]: opening, copying and trashing workbooks by id
//! - [`PropertyStore`]: the persistent string key-value store
//! - [`Ui`]: modal alerts, transient toasts and text prompts
//!
//! In-memory implementations live here; the directory-backed store is in
//! [`crate::fs_store`].

use crate::error::{Error, Result};
use crate::sheet::Workbook;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fs;
use std::path::Path;

/// Access to workbooks by id
pub trait DocumentStore {
    /// Open a workbook for reading; fails when it is missing or not shared
    fn open(&self, id: &str) -> Result<&Workbook>;

    fn open_mut(&mut self, id: &str) -> Result<&mut Workbook>;

    /// Copy a workbook under a new name, returning the copy's id
    fn copy(&mut self, id: &str, new_name: &str, owner: &str) -> Result<String>;

    fn rename(&mut self, id: &str, new_name: &str) -> Result<()> {
        self.open_mut(id)?.name = new_name.to_string();
        Ok(())
    }

    /// Move a workbook to the trash
    fn trash(&mut self, id: &str) -> Result<()>;
}

/// Workbooks held in memory, keyed by id
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    workbooks: BTreeMap<String, Workbook>,
    copies: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, workbook: Workbook) {
        self.workbooks.insert(workbook.id.clone(), workbook);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.workbooks.contains_key(id)
    }

    pub fn workbooks(&self) -> impl Iterator<Item = &Workbook> {
        self.workbooks.values()
    }

    fn unavailable(id: &str) -> Error {
        Error::DocumentUnavailable {
            id: id.to_string(),
            reason: "no such file, or it has not been shared with you".to_string(),
        }
    }
}

impl DocumentStore for MemoryStore {
    fn open(&self, id: &str) -> Result<&Workbook> {
        self.workbooks.get(id).ok_or_else(|| Self::unavailable(id))
    }

    fn open_mut(&mut self, id: &str) -> Result<&mut Workbook> {
        self.workbooks.get_mut(id).ok_or_else(|| Self::unavailable(id))
    }

    fn copy(&mut self, id: &str, new_name: &str, owner: &str) -> Result<String> {
        let mut copy = self.open(id)?.clone();

        let new_id = loop {
            self.copies += 1;
            let candidate = format!("{}-copy{}", id, self.copies);
            if !self.workbooks.contains_key(&candidate) {
                break candidate;
            }
        };

        copy.id = new_id.clone();
        copy.name = new_name.to_string();
        copy.owner = owner.to_string();
        copy.shared_with.clear();
        self.insert(copy);
        Ok(new_id)
    }

    fn trash(&mut self, id: &str) -> Result<()> {
        self.workbooks
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Self::unavailable(id))
    }
}

/// Persistent string key -> JSON string value store
pub trait PropertyStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
    fn delete(&mut self, key: &str);
    /// Delete every property
    fn clear(&mut self);
}

/// Properties held in a map, optionally persisted as a JSON file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryProperties {
    values: HashMap<String, String>,
}

impl MemoryProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load properties from a file, or start empty if it does not exist
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PropertyStore for MemoryProperties {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }

    fn delete(&mut self, key: &str) {
        self.values.remove(key);
    }

    fn clear(&mut self) {
        self.values.clear();
    }
}

/// User-facing notification and input channel
pub trait Ui {
    /// Modal message the user must dismiss
    fn alert(&mut self, title: &str, message: &str);

    /// Transient progress notice
    fn toast(&mut self, message: &str, title: &str);

    /// Ask for text; `None` means the user canceled
    fn prompt(&mut self, title: &str, message: &str) -> Option<String>;
}

/// Records everything shown and replays scripted prompt answers
///
/// Once the scripted answers run out every prompt is treated as canceled.
#[derive(Debug, Clone, Default)]
pub struct RecordingUi {
    pub alerts: Vec<(String, String)>,
    pub toasts: Vec<String>,
    pub prompts: Vec<String>,
    answers: VecDeque<Option<String>>,
}

impl RecordingUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answers<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(|a| a.map(Into::into)).collect(),
            ..Self::default()
        }
    }

    pub fn push_answer(&mut self, answer: Option<&str>) {
        self.answers.push_back(answer.map(str::to_string));
    }

    /// Titles of every alert shown so far
    pub fn alert_titles(&self) -> Vec<&str> {
        self.alerts.iter().map(|(t, _)| t.as_str()).collect()
    }

    pub fn last_alert(&self) -> Option<&(String, String)> {
        self.alerts.last()
    }
}

impl Ui for RecordingUi {
    fn alert(&mut self, title: &str, message: &str) {
        self.alerts.push((title.to_string(), message.to_string()));
    }

    fn toast(&mut self, message: &str, _title: &str) {
        self.toasts.push(message.to_string());
    }

    fn prompt(&mut self, _title: &str, message: &str) -> Option<String> {
        self.prompts.push(message.to_string());
        self.answers.pop_front().flatten()
    }
}
