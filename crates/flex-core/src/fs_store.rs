//! Directory-backed document store
//!
//! Layout under the root directory:
//! ```text
//! <root>/<workbook id>/workbook.json   name, owner, sharing, validations
//! <root>/<workbook id>/<sheet>.csv     one file per sheet, no header row
//! <root>/.trash/<workbook id>/         trashed workbooks
//! ```

use crate::error::{Error, Result};
use crate::grid::{CellValue, Grid};
use crate::host::{DocumentStore, MemoryStore};
use crate::sheet::{ListValidation, Sheet, Workbook};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

pub const METADATA_FILE: &str = "workbook.json";
pub const TRASH_DIR: &str = ".trash";

/// Everything about a workbook that does not live in its csv files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WorkbookMeta {
    name: String,
    owner: String,
    #[serde(default)]
    shared_with: Vec<String>,
    /// Sheet name -> dropdown rules
    #[serde(default)]
    validations: BTreeMap<String, Vec<ListValidation>>,
}

/// Workbooks loaded from a directory tree, written back by [`FsStore::save`]
#[derive(Debug)]
pub struct FsStore {
    root: PathBuf,
    workbooks: MemoryStore,
    trashed: Vec<String>,
}

impl FsStore {
    /// Load every workbook directory under `root`
    ///
    /// A directory without `workbook.json` is still loaded, named after itself
    /// with no owner.
    pub fn load<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let mut found: BTreeMap<String, (Workbook, WorkbookMeta)> = BTreeMap::new();

        for entry in WalkDir::new(&root)
            .min_depth(1)
            .max_depth(2)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.file_name() != TRASH_DIR)
        {
            let entry = entry?;
            let path = entry.path();
            if entry.depth() == 1 {
                if entry.file_type().is_dir() {
                    let id = entry.file_name().to_string_lossy().to_string();
                    let mut meta = read_meta_file(path)?;
                    let name = if meta.name.is_empty() { id.clone() } else { std::mem::take(&mut meta.name) };
                    let mut workbook = Workbook::new(id.as_str(), name, std::mem::take(&mut meta.owner));
                    workbook.shared_with = std::mem::take(&mut meta.shared_with);
                    found.insert(id, (workbook, meta));
                }
                continue;
            }

            if path.extension().map_or(true, |ext| ext != "csv") {
                continue;
            }
            let Some(id) = path
                .parent()
                .and_then(Path::file_name)
                .map(|n| n.to_string_lossy().to_string())
            else {
                continue;
            };
            let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
                continue;
            };
            let sheet = parse_sheet(path, &stem)?;
            if let Some((workbook, _)) = found.get_mut(&id) {
                workbook.add_sheet(sheet);
            }
        }

        let mut workbooks = MemoryStore::new();
        for (id, (mut workbook, meta)) in found {
            for (sheet_name, rules) in meta.validations {
                match workbook.sheet_mut(&sheet_name) {
                    Some(sheet) => sheet.set_validations(rules),
                    None => warn!(workbook = %id, sheet = %sheet_name, "validations for a missing sheet"),
                }
            }
            workbooks.insert(workbook);
        }
        debug!(root = %root.display(), "workbook directory loaded");

        Ok(Self {
            root,
            workbooks,
            trashed: Vec::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn workbooks(&self) -> impl Iterator<Item = &Workbook> {
        self.workbooks.workbooks()
    }

    /// Write every workbook back and move trashed ones under `.trash`
    pub fn save(&mut self) -> Result<()> {
        fs::create_dir_all(&self.root)?;

        for workbook in self.workbooks.workbooks() {
            write_workbook(&self.root.join(&workbook.id), workbook)?;
        }

        for id in self.trashed.drain(..) {
            let from = self.root.join(&id);
            if !from.exists() {
                continue;
            }
            let trash = self.root.join(TRASH_DIR);
            fs::create_dir_all(&trash)?;
            let to = trash.join(&id);
            if to.exists() {
                fs::remove_dir_all(&to)?;
            }
            fs::rename(&from, &to)?;
            debug!(id = %id, "workbook moved to trash");
        }
        Ok(())
    }
}

impl DocumentStore for FsStore {
    fn open(&self, id: &str) -> Result<&Workbook> {
        self.workbooks.open(id)
    }

    fn open_mut(&mut self, id: &str) -> Result<&mut Workbook> {
        self.workbooks.open_mut(id)
    }

    fn copy(&mut self, id: &str, new_name: &str, owner: &str) -> Result<String> {
        self.workbooks.copy(id, new_name, owner)
    }

    fn trash(&mut self, id: &str) -> Result<()> {
        self.workbooks.trash(id)?;
        self.trashed.push(id.to_string());
        Ok(())
    }
}

fn read_meta_file(dir: &Path) -> Result<WorkbookMeta> {
    let path = dir.join(METADATA_FILE);
    if !path.exists() {
        return Ok(WorkbookMeta::default());
    }
    let content = fs::read_to_string(&path).map_err(|e| Error::FileRead {
        path: path.clone(),
        source: e,
    })?;
    Ok(serde_json::from_str(&content)?)
}

/// Parse one sheet file; every row is data, cells kept as stored text
pub fn parse_sheet<P: AsRef<Path>>(path: P, name: &str) -> Result<Sheet> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| Error::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;
        rows.push(record.iter().map(CellValue::stored).collect());
    }
    Ok(Sheet::with_grid(name, Grid::from_rows(rows)))
}

/// Parse sheet text directly (useful for tests)
pub fn parse_sheet_str(content: &str, name: &str) -> Result<Sheet> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| Error::Csv {
            path: PathBuf::from("<string>"),
            source: e,
        })?;
        rows.push(record.iter().map(CellValue::stored).collect());
    }
    Ok(Sheet::with_grid(name, Grid::from_rows(rows)))
}

/// Write a sheet as csv, padding every row to the grid width so that row
/// positions survive a reload
pub fn write_sheet<P: AsRef<Path>>(path: P, sheet: &Sheet) -> Result<()> {
    let path = path.as_ref();
    let csv_err = |e| Error::Csv {
        path: path.to_path_buf(),
        source: e,
    };

    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;

    let width = sheet.grid().column_count().max(1);
    for row in sheet.grid().rows() {
        let mut record: Vec<String> = row.iter().map(CellValue::to_string_value).collect();
        record.resize(width, String::new());
        writer.write_record(&record).map_err(csv_err)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_workbook(dir: &Path, workbook: &Workbook) -> Result<()> {
    fs::create_dir_all(dir)?;

    let mut meta = WorkbookMeta {
        name: workbook.name.clone(),
        owner: workbook.owner.clone(),
        shared_with: workbook.shared_with.clone(),
        validations: BTreeMap::new(),
    };
    for sheet in workbook.sheets() {
        write_sheet(dir.join(format!("{}.csv", sheet.name)), sheet)?;
        if !sheet.validations().is_empty() {
            meta.validations
                .insert(sheet.name.clone(), sheet.validations().to_vec());
        }
    }

    let content = serde_json::to_string_pretty(&meta)?;
    fs::write(dir.join(METADATA_FILE), content)?;
    Ok(())
}
