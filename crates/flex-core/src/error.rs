//! Error types for flex-core

use crate::tags::Axis;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in flex-core
#[derive(Debug, Error)]
pub enum Error {
    /// The same normalized tag labels two cells on one axis
    #[error("duplicate {axis} tag found: \"{tag}\"\n\nOriginal: {original}\nDuplicate: {duplicate}")]
    DuplicateTag {
        tag: String,
        axis: Axis,
        original: String,
        duplicate: String,
    },

    /// A tag the operation depends on is not present
    #[error("the <{sheet}> sheet is missing a \"{tag}\" {axis} tag")]
    MissingTag {
        sheet: String,
        tag: String,
        axis: Axis,
    },

    /// Sheet not found in a workbook
    #[error("could not find the <{sheet}> sheet in '{document}'")]
    SheetNotFound { document: String, sheet: String },

    /// Another workbook could not be opened
    #[error("could not access the spreadsheet '{id}': {reason}")]
    DocumentUnavailable { id: String, reason: String },

    /// No document id is recorded for a version/abbreviation pair
    #[error("could not find Sheet ID for version \"{version}\", abbreviation \"{abbreviation}\"")]
    VersionNotFound {
        version: String,
        abbreviation: String,
    },

    /// The dispatcher received a command it does not know
    #[error("unknown command received: {0}")]
    UnknownCommand(String),

    /// A command that works on the active sheet was run without one
    #[error("this command needs an active sheet")]
    NoActiveSheet,

    /// A row number outside the data area of a table
    #[error("row {row} is not a data row of the <{sheet}> table")]
    InvalidRow { sheet: String, row: usize },

    /// A skill token that is not `count_skillname`
    #[error("malformed skill entry '{0}', expected count_skillname")]
    MalformedSkill(String),

    /// Rename/delete attempted on a source owned by someone else
    #[error("only the owner can change \"{name}\" (owner: {owner})")]
    NotOwner { name: String, owner: String },

    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV error from the csv crate
    #[error("CSV error in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn missing_row_tag(sheet: &str, tag: &str) -> Self {
        Error::MissingTag {
            sheet: sheet.to_string(),
            tag: tag.to_string(),
            axis: Axis::Row,
        }
    }

    pub(crate) fn missing_column_tag(sheet: &str, tag: &str) -> Self {
        Error::MissingTag {
            sheet: sheet.to_string(),
            tag: tag.to_string(),
            axis: Axis::Column,
        }
    }
}
