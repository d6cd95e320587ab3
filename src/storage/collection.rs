use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Extension of every record file.
pub const RECORD_EXTENSION: &str = "json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record '{0}' already exists")]
    AlreadyExists(String),
    #[error("Invalid record key '{0}'")]
    InvalidKey(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Record '{0}' not found")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    fn io(e: std::io::Error) -> Self {
        StoreError::Io(first_segment(&e.to_string()))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(first_segment(&e.to_string()))
    }
}

/// Keep only the first line and the first comma-separated segment of a message.
fn first_segment(message: &str) -> String {
    message
        .lines()
        .next()
        .unwrap_or_default()
        .split(',')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Whether `key` names a file directly inside a collection root.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && key != "." && !key.contains(['/', '\\', '\0']) && !key.contains("..")
}

/// A value persisted as one file inside a collection.
pub trait Record: Serialize + DeserializeOwned + Default + Send + Sync + 'static {
    /// Directory name of the collection under the data root.
    const COLLECTION: &'static str;
}

/// Result of listing a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    Empty,
    Keys(Vec<String>),
}

impl Listing {
    pub fn keys(&self) -> &[String] {
        match self {
            Listing::Empty => &[],
            Listing::Keys(keys) => keys,
        }
    }
}

/// A directory of records of one type, one `<key>.json` file per record.
///
/// The collection owns everything below its root. Operations on the same key
/// are not coordinated: two concurrent read-modify-write sequences race and
/// the last `update` wins.
#[derive(Debug)]
pub struct Collection<T: Record> {
    root: PathBuf,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            _record: PhantomData,
        }
    }
}

impl<T: Record> Collection<T> {
    /// Open (creating if needed) the collection directory under `data_dir`.
    pub async fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, StoreError> {
        let root = data_dir.as_ref().join(T::COLLECTION);
        fs::create_dir_all(&root).await.map_err(StoreError::io)?;
        Ok(Self {
            root,
            _record: PhantomData,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        if !is_valid_key(key) {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.{RECORD_EXTENSION}")))
    }

    /// Write a new record. Never overwrites an existing file.
    pub async fn create(&self, key: &str, record: &T) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let data = serde_json::to_vec(record)?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => StoreError::AlreadyExists(key.to_string()),
                _ => StoreError::io(e),
            })?;
        file.write_all(&data).await.map_err(StoreError::io)?;
        file.flush().await.map_err(StoreError::io)?;

        tracing::debug!(collection = T::COLLECTION, key = %key, "Created record");
        Ok(())
    }

    /// Read a record.
    ///
    /// Content that does not parse as `T` yields `T::default()` instead of an
    /// error, so a damaged file reads as an empty record.
    pub async fn read(&self, key: &str) -> Result<T, StoreError> {
        let path = self.path_for(key)?;
        let raw = fs::read(&path)
            .await
            .map_err(|_| StoreError::NotFound(key.to_string()))?;

        match serde_json::from_slice(&raw) {
            Ok(record) => Ok(record),
            Err(e) => {
                tracing::warn!(
                    collection = T::COLLECTION,
                    key = %key,
                    error = %e,
                    "Malformed record, treating as empty"
                );
                Ok(T::default())
            }
        }
    }

    /// Replace the full contents of an existing record.
    pub async fn update(&self, key: &str, record: &T) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let data = serde_json::to_vec(record)?;

        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => StoreError::NotFound(key.to_string()),
                _ => StoreError::io(e),
            })?;
        file.write_all(&data).await.map_err(StoreError::io)?;
        file.flush().await.map_err(StoreError::io)?;

        tracing::debug!(collection = T::COLLECTION, key = %key, "Updated record");
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        fs::remove_file(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StoreError::NotFound(key.to_string()),
            _ => StoreError::io(e),
        })?;

        tracing::debug!(collection = T::COLLECTION, key = %key, "Deleted record");
        Ok(())
    }

    /// Whether a readable record exists for `key`. Never fails.
    pub async fn exists(&self, key: &str) -> bool {
        match self.path_for(key) {
            Ok(path) => fs::read(&path).await.is_ok(),
            Err(_) => false,
        }
    }

    /// List the keys of every record in the collection, sorted.
    pub async fn list(&self) -> Result<Listing, StoreError> {
        let mut entries = fs::read_dir(&self.root).await.map_err(StoreError::io)?;

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(StoreError::io)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }

        if keys.is_empty() {
            return Ok(Listing::Empty);
        }
        keys.sort();
        Ok(Listing::Keys(keys))
    }
}
