use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use course_core::{KeyValueStore, StorageError};
use course_logging::course_trace;
use fd_lock::RwLock;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("state directory {path:?} is unusable: {source}")]
    StateDir { path: PathBuf, source: io::Error },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("could not decode {path:?}: {message}")]
    Decode { path: PathBuf, message: String },
    #[error("could not encode storage: {0}")]
    Encode(String),
}

impl From<PersistError> for StorageError {
    fn from(err: PersistError) -> Self {
        match err {
            PersistError::Io(io) => StorageError::Io(io),
            other => StorageError::Backend(other.to_string()),
        }
    }
}

/// Creates `dir` and its parents; fails if something other than a directory
/// is in the way.
pub fn ensure_state_dir(dir: &Path) -> Result<(), PersistError> {
    fs::create_dir_all(dir).map_err(|source| PersistError::StateDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Durable key/value storage kept in one `ron` file.
///
/// Every read goes back to disk so separate processes sharing the file see
/// each other's writes, the way browser tabs share local storage. Writes take
/// an exclusive advisory lock on a sidecar `.lock` file for the whole
/// read-modify-replace cycle, so concurrent writers never drop each other's
/// keys. Readers need no lock: the data file is only ever replaced whole.
pub struct FileStorage {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "storage.ron".to_string());
        let lock_path = path.with_file_name(format!(".{name}.lock"));
        Self { path, lock_path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn load(&self) -> Result<BTreeMap<String, String>, PersistError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(err.into()),
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        ron::from_str(&content).map_err(|err| PersistError::Decode {
            path: self.path.clone(),
            message: err.to_string(),
        })
    }

    /// Writes a sibling temp file and renames it over the data file.
    fn replace(&self, entries: &BTreeMap<String, String>) -> Result<(), PersistError> {
        let content = ron::ser::to_string_pretty(entries, ron::ser::PrettyConfig::new())
            .map_err(|err| PersistError::Encode(err.to_string()))?;

        let mut tmp = NamedTempFile::new_in(self.dir())?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|err| PersistError::Io(err.error))?;
        course_trace!("Saved {} entries to {:?}", entries.len(), self.path);
        Ok(())
    }

    fn modify(
        &self,
        edit: impl FnOnce(&mut BTreeMap<String, String>) -> bool,
    ) -> Result<(), PersistError> {
        ensure_state_dir(self.dir())?;
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)?;
        let mut lock = RwLock::new(lock_file);
        let _guard = lock.write()?;

        let mut entries = self.load()?;
        if edit(&mut entries) {
            self.replace(&entries)?;
        }
        Ok(())
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.modify(|entries| {
            entries.insert(key.to_string(), value.to_string()).as_deref() != Some(value)
        })?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.modify(|entries| entries.remove(key).is_some())?;
        Ok(())
    }
}
