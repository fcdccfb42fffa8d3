use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter, Lines};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};
use crate::codec::PortableValue;
use crate::models::{DatabaseInfo, TableRef, TypeDescriptor};
use crate::{MigrantToolsError, Result};

mod data_format;

pub use data_format::*;

pub const MANIFEST_FILE_NAME: &str = "catalog.json";
const MANIFEST_VERSION: u32 = 1;

/// What a dump unit read its rows from.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowSet {
    Table {
        #[serde(flatten)]
        table: TableRef,
    },
    Query {
        name: String,
        query: String,
    },
}

impl RowSet {
    pub fn name(&self) -> String {
        match self {
            RowSet::Table { table } => table.to_string(),
            RowSet::Query { name, .. } => name.clone(),
        }
    }

    pub fn table(&self) -> Option<&TableRef> {
        match self {
            RowSet::Table { table } => Some(table),
            RowSet::Query { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct EncodedColumn {
    pub name: String,
    pub descriptor: TypeDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
}

impl EncodedColumn {
    pub fn new(name: impl Into<String>, descriptor: TypeDescriptor) -> Self {
        EncodedColumn {
            name: name.into(),
            descriptor,
            precision: None,
            scale: None,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    /// Data file name, relative to the catalog directory.
    pub file: String,
    pub row_set: RowSet,
    pub columns: Vec<EncodedColumn>,
    pub row_count: u64,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct CatalogManifest {
    pub version: u32,
    pub format: DataFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<DatabaseInfo>,
    pub entries: Vec<CatalogEntry>,
}

/// A dataset directory: one manifest plus one data file per entry.
#[derive(Debug, Clone)]
pub struct Catalog {
    dir: PathBuf,
    format: DataFormat,
}

impl Catalog {
    pub fn new(dir: impl Into<PathBuf>, format: DataFormat) -> Self {
        Catalog {
            dir: dir.into(),
            format,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn format(&self) -> DataFormat {
        self.format
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE_NAME)
    }

    pub async fn open_writer(&self) -> Result<CatalogWriter> {
        self.format.validate()?;
        tokio::fs::create_dir_all(&self.dir).await?;

        Ok(CatalogWriter {
            dir: self.dir.clone(),
            format: self.format,
            entries: Vec::new(),
            file_names: HashMap::new(),
        })
    }

    /// Reads the manifest. The data format stored in it wins over the one this catalog was
    /// created with.
    #[instrument(skip_all)]
    pub async fn open_reader(&self) -> Result<CatalogReader> {
        let content = tokio::fs::read_to_string(self.manifest_path()).await?;
        let manifest: CatalogManifest = serde_json::from_str(&content)?;

        if manifest.version != MANIFEST_VERSION {
            return Err(MigrantToolsError::InvalidCatalog(format!(
                "unsupported catalog version {}",
                manifest.version
            )));
        }
        manifest.format.validate()?;

        info!("Opened catalog with {} entries", manifest.entries.len());

        Ok(CatalogReader {
            dir: self.dir.clone(),
            manifest,
        })
    }
}

/// Writes the data files of a catalog. Dropping the writer without calling
/// [`CatalogWriter::finish`] leaves the directory without a manifest.
pub struct CatalogWriter {
    dir: PathBuf,
    format: DataFormat,
    entries: Vec<Arc<EntryWriter>>,
    file_names: HashMap<String, usize>,
}

impl CatalogWriter {
    pub fn format(&self) -> DataFormat {
        self.format
    }

    /// Creates the data file of a new entry.
    pub async fn add_row_set(&mut self, row_set: RowSet) -> Result<Arc<EntryWriter>> {
        let name = row_set.name();
        let base = sanitize_file_name(&name);
        let sequence = self.file_names.entry(base.clone()).or_insert(0);
        let file_name = format!("{}.{}.{}", base, sequence, self.format.extension());
        *sequence += 1;

        debug!("Creating data file {} for {}", file_name, name);
        let file = File::create(self.dir.join(&file_name)).await?;

        let writer = Arc::new(EntryWriter {
            name,
            file_name,
            row_set,
            format: self.format,
            state: Mutex::new(EntryState {
                file: BufWriter::new(file),
                columns: None,
                row_count: 0,
            }),
        });

        self.entries.push(writer.clone());
        Ok(writer)
    }

    /// Closes every data file, then writes the manifest atomically.
    #[instrument(skip_all)]
    pub async fn finish(self, source: Option<DatabaseInfo>) -> Result<CatalogManifest> {
        let mut entries = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            entries.push(entry.close().await?);
        }

        let manifest = CatalogManifest {
            version: MANIFEST_VERSION,
            format: self.format,
            source,
            entries,
        };

        let content = serde_json::to_vec_pretty(&manifest)?;
        let temp_path = self.dir.join(format!("{}.tmp", MANIFEST_FILE_NAME));
        let mut file = File::create(&temp_path).await?;
        file.write_all(&content).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&temp_path, self.dir.join(MANIFEST_FILE_NAME)).await?;

        info!("Wrote catalog manifest with {} entries", manifest.entries.len());

        Ok(manifest)
    }
}

struct EntryState {
    file: BufWriter<File>,
    columns: Option<Vec<EncodedColumn>>,
    row_count: u64,
}

/// The append stream of one entry, shared by every split of the entry.
pub struct EntryWriter {
    name: String,
    file_name: String,
    row_set: RowSet,
    format: DataFormat,
    state: Mutex<EntryState>,
}

impl EntryWriter {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn row_set(&self) -> &RowSet {
        &self.row_set
    }

    pub fn format(&self) -> DataFormat {
        self.format
    }

    /// Appends a chunk of complete, encoded rows. The first call writes the header, later
    /// calls must describe the same columns.
    pub async fn append(&self, columns: &[EncodedColumn], rows: &str, row_count: u64) -> Result {
        let mut state = self.state.lock().await;

        match &state.columns {
            None => {
                let mut header = String::new();
                let names = columns.iter().map(|c| c.name.clone()).collect::<Vec<_>>();
                self.format.encode_header(&names, &mut header)?;
                state.file.write_all(header.as_bytes()).await?;
                state.columns = Some(columns.to_vec());
            }
            Some(existing) if existing.len() != columns.len() => {
                return Err(MigrantToolsError::InvalidCatalog(format!(
                    "entry {} was started with {} columns, got a chunk with {}",
                    self.name,
                    existing.len(),
                    columns.len()
                )));
            }
            Some(_) => {}
        }

        state.file.write_all(rows.as_bytes()).await?;
        state.row_count += row_count;

        Ok(())
    }

    async fn close(&self) -> Result<CatalogEntry> {
        let mut state = self.state.lock().await;
        state.file.flush().await?;

        Ok(CatalogEntry {
            name: self.name.clone(),
            file: self.file_name.clone(),
            row_set: self.row_set.clone(),
            columns: state.columns.clone().unwrap_or_default(),
            row_count: state.row_count,
        })
    }
}

pub struct CatalogReader {
    dir: PathBuf,
    manifest: CatalogManifest,
}

impl CatalogReader {
    pub fn manifest(&self) -> &CatalogManifest {
        &self.manifest
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.manifest.entries
    }

    /// Opens the data file of an entry and validates its header against the manifest.
    pub async fn open_entry(&self, entry: &CatalogEntry) -> Result<EntryReader> {
        let file = File::open(self.dir.join(&entry.file)).await?;
        let mut lines = BufReader::new(file).lines();
        let format = self.manifest.format;

        match lines.next_line().await? {
            Some(header) => {
                let names = format.decode_header(&header)?;
                let expected = entry.columns.iter().map(|c| c.name.as_str());
                if !names.iter().map(|n| n.as_str()).eq(expected) {
                    return Err(MigrantToolsError::InvalidCatalog(format!(
                        "header of {} does not match the manifest: {:?}",
                        entry.file, names
                    )));
                }
            }
            None if entry.columns.is_empty() => {}
            None => {
                return Err(MigrantToolsError::InvalidCatalog(format!("data file {} has no header", entry.file)));
            }
        }

        Ok(EntryReader {
            lines,
            format,
            columns: entry.columns.clone(),
        })
    }
}

pub struct EntryReader {
    lines: Lines<BufReader<File>>,
    format: DataFormat,
    columns: Vec<EncodedColumn>,
}

impl EntryReader {
    pub fn columns(&self) -> &[EncodedColumn] {
        &self.columns
    }

    pub async fn next_row(&mut self) -> Result<Option<Vec<PortableValue>>> {
        match self.lines.next_line().await? {
            Some(line) => Ok(Some(self.format.decode_row(&line, self.columns.len())?)),
            None => Ok(None),
        }
    }
}

fn sanitize_file_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' { c } else { '_' })
        .collect();

    if sanitized.is_empty() {
        "entry".to_string()
    } else {
        sanitized
    }
}
