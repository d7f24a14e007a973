//! flex-core: tagged-table engine behind the Flex character sheets
//!
//! This library provides functionality to:
//! - Address spreadsheet cells by free-text row and column tags
//! - Verify tag uniqueness and report duplicates with A1 locations
//! - Resolve versioned template ids through a three-tier cache
//! - Aggregate power and magic-item catalogs from the master database and
//!   player-registered custom sources
//! - Filter catalogs into Game-sheet dropdowns and fill slot details on edit
//! - Manage custom sources, characters and the player's version table
//!
//! The host (documents, persistent properties, user prompts) sits behind the
//! traits in [`host`]; [`fs_store::FsStore`] keeps workbooks as csv files on
//! disk.

pub mod aggregator;
pub mod cache;
pub mod catalog;
pub mod characters;
pub mod codex;
pub mod config;
pub mod dispatch;
pub mod edit;
pub mod error;
pub mod filter;
pub mod fs_store;
pub mod grid;
pub mod host;
pub mod mutator;
pub mod publish;
pub mod resolver;
pub mod schema;
pub mod session;
pub mod sheet;
pub mod skills;
pub mod sources;
pub mod sync;
pub mod tags;

pub use aggregator::{health_check, list_all_tables, TableListing, TableRef};
pub use cache::{SheetCache, SheetData, SheetKey};
pub use catalog::{build_catalog, BuildReport, CatalogEntry};
pub use config::FlexConfig;
pub use dispatch::{execute, run, Command};
pub use edit::{on_edit, EditEvent, EditOutcome};
pub use error::{Error, Result};
pub use filter::{apply_filter, refresh_available_tables, FilterOutcome};
pub use fs_store::FsStore;
pub use grid::{a1, CellValue, Grid};
pub use host::{DocumentStore, MemoryProperties, MemoryStore, PropertyStore, RecordingUi, Ui};
pub use schema::{CatalogKind, Field};
pub use session::{Outcome, Session};
pub use sheet::{Sheet, Workbook};
pub use skills::{increment_skill, SkillCount, SkillSet, SkillType};
pub use tags::{normalize_tags, verify_tags, Axis, TagMap};
