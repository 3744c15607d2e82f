//! Document store for persisting reference data to disk
//!
//! Provides a `DocumentStore` that keeps each collection as a JSON array in its
//! own file, with bulk insert, upsert-by-key and read-all operations.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Errors that can occur when reading or writing a collection
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the collection file failed
    #[error("store I/O error: {0}")]
    Io(#[from] io::Error),

    /// The collection file does not hold the expected records
    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Reads and writes JSON collections under a data directory
///
/// Uses `~/.local/share/farewatch/` on Linux, or the equivalent platform data
/// directory elsewhere. A missing collection file reads as an empty collection.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    /// Directory where collection files are stored
    dir: PathBuf,
}

impl DocumentStore {
    /// Creates a store in the platform data directory
    ///
    /// Returns `None` if the directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "farewatch")?;
        Some(Self {
            dir: project_dirs.data_dir().to_path_buf(),
        })
    }

    /// Creates a store rooted at a custom directory
    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.dir.join(format!("{}.json", collection))
    }

    /// Returns every record in the collection, in insertion order
    pub fn read_all<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>, StoreError> {
        match fs::read_to_string(self.collection_path(collection)) {
            Ok(content) if content.trim().is_empty() => Ok(Vec::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Appends all `records` to the collection without checking for duplicates
    pub fn insert_many<T>(&self, collection: &str, records: &[T]) -> Result<(), StoreError>
    where
        T: Serialize + DeserializeOwned + Clone,
    {
        let mut existing: Vec<T> = self.read_all(collection)?;
        existing.extend_from_slice(records);
        self.write_all(collection, &existing)
    }

    /// Replaces the first record matching `matches` with `record`, or appends it
    pub fn upsert_by<T, F>(&self, collection: &str, record: T, matches: F) -> Result<(), StoreError>
    where
        T: Serialize + DeserializeOwned,
        F: Fn(&T) -> bool,
    {
        let mut existing: Vec<T> = self.read_all(collection)?;
        match existing.iter_mut().find(|r| matches(&**r)) {
            Some(slot) => *slot = record,
            None => existing.push(record),
        }
        self.write_all(collection, &existing)
    }

    /// Rewrites the collection file, going through a temp file so readers never see a partial write
    fn write_all<T: Serialize>(&self, collection: &str, records: &[T]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;

        let json = serde_json::to_string_pretty(records)?;
        let path = self.collection_path(collection);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}
