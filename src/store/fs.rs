//! Directory-backed byte store.
//!
//! Each artifact is one file, `<dir>/<key>.<ext>`, where `<key>` is the
//! key's `Display` rendering. File names are assembled in a fixed-size
//! [`TextBuilder`] so lookups do not allocate for the name.
//!
//! Writes go to a temporary file in the same directory and are renamed into
//! place, so a concurrent reader sees either no artifact or a complete one.
//!
//! The insert/update split in [`StoreMetrics`] is approximate: it is decided
//! from whether the file existed before the write, so two racing first
//! writes of one key both count as inserts.
//!
//! ## Example Usage
//! ```rust
//! use std::sync::Arc;
//!
//! use derivekit::store::fs::DirStore;
//! use derivekit::store::traits::ArtifactStore;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let store = DirStore::open(dir.path(), "bin").unwrap();
//! store.put("A000796", Arc::new(vec![3, 1, 4])).unwrap();
//! assert_eq!(store.get(&"A000796").unwrap().as_deref(), Some(&vec![3, 1, 4]));
//! assert!(dir.path().join("A000796.bin").exists());
//! ```
use std::fmt::Display;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;

use crate::ds::TextBuilder;
use crate::error::ConfigError;
use crate::store::traits::{ArtifactStore, StoreCounters, StoreError, StoreMetrics};

/// Longest file name (key plus extension) in bytes.
pub const MAX_FILE_NAME: usize = 255;

type FileName = TextBuilder<MAX_FILE_NAME>;

/// Stores `Vec<u8>` artifacts as files in one directory.
#[derive(Debug)]
pub struct DirStore {
    dir: PathBuf,
    extension: String,
    metrics: StoreCounters,
}

impl DirStore {
    /// Opens (creating if missing) a store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if `extension` is empty or contains a
    /// path separator or dot, and [`StoreError::Io`] if the directory cannot
    /// be created.
    pub fn open(dir: impl Into<PathBuf>, extension: &str) -> Result<Self, StoreError> {
        if extension.is_empty() || extension.contains(['/', '\\', '.']) {
            return Err(ConfigError::new(format!("invalid file extension {extension:?}")).into());
        }
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        tracing::debug!(dir = %dir.display(), "dir_store.open");
        Ok(Self {
            dir,
            extension: extension.to_owned(),
            metrics: StoreCounters::default(),
        })
    }

    /// Root directory of the store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file that holds `key`'s artifact.
    pub fn path_for<K: Display + ?Sized>(&self, key: &K) -> Result<PathBuf, StoreError> {
        let name = self.file_name(key)?;
        Ok(self.dir.join(name.as_str()))
    }

    fn file_name<K: Display + ?Sized>(&self, key: &K) -> Result<FileName, StoreError> {
        let invalid = || StoreError::InvalidKey(key.to_string());

        let mut name = FileName::new();
        name.append_fmt(key).map_err(|_| invalid())?;
        let stem = name.as_str();
        if stem.is_empty() || stem == "." || stem == ".." || stem.contains(['/', '\\']) {
            return Err(invalid());
        }
        name.append_char('.').map_err(|_| invalid())?;
        name.append_str(&self.extension).map_err(|_| invalid())?;
        Ok(name)
    }
}

impl<K> ArtifactStore<K, Vec<u8>> for DirStore
where
    K: Display + Send + Sync,
{
    fn get(&self, key: &K) -> Result<Option<Arc<Vec<u8>>>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(self.metrics.record(Some(Arc::new(bytes)))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(self.metrics.record(None)),
            Err(err) => Err(err.into()),
        }
    }

    fn put(&self, key: K, value: Arc<Vec<u8>>) -> Result<(), StoreError> {
        let path = self.path_for(&key)?;
        let existed = path.exists();

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&value)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|err| err.error)?;

        if existed {
            self.metrics.inc_update();
        } else {
            self.metrics.inc_insert();
        }
        tracing::trace!(path = %path.display(), bytes = value.len(), "dir_store.put");
        Ok(())
    }

    fn metrics(&self) -> StoreMetrics {
        self.metrics.snapshot()
    }
}
