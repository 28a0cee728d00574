//! Persistence facility for profile lists and catalogs.
//!
//! Values are stored as pretty-printed JSON inside a small versioned
//! envelope, one file per value, in a managed state directory that is
//! created on first use. Writes go to a temp file in the same directory and
//! are moved over the target, so a crash mid-save leaves either the previous
//! content or the new content on disk.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Current on-disk format version. Files carrying any other version load as
/// "no data".
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    version: u32,
    data: &'a T,
}

#[derive(Deserialize)]
struct Envelope {
    version: u32,
    data: serde_json::Value,
}

/// Handle to the managed state directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateDir {
    root: PathBuf,
}

impl StateDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of a persisted file inside the state directory.
    pub fn path_of(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    /// Create the state directory if it does not exist yet.
    pub fn ensure(&self) -> Result<()> {
        if self.root.is_dir() {
            return Ok(());
        }
        fs::create_dir_all(&self.root).map_err(|e| Error::storage(&self.root, e))?;
        log::info!("Created state directory {}", self.root.display());
        Ok(())
    }

    pub fn exists(&self, file_name: &str) -> bool {
        self.path_of(file_name).is_file()
    }

    /// Load a persisted value.
    ///
    /// Returns `Ok(None)` when the file is absent, unreadable, or does not
    /// parse as the expected type. Only a state directory that cannot be
    /// created is reported as an error.
    pub fn load<T: DeserializeOwned>(&self, file_name: &str) -> Result<Option<T>> {
        self.ensure()?;
        let path = self.path_of(file_name);

        if !path.exists() {
            log::debug!("load: {} does not exist yet", path.display());
            return Ok(None);
        }

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                log::warn!("load: failed to read {}: {}, treating as empty", path.display(), e);
                return Ok(None);
            }
        };

        match decode(&contents) {
            Ok(value) => Ok(Some(value)),
            Err(reason) => {
                log::warn!("load: ignoring {}: {}", path.display(), reason);
                Ok(None)
            }
        }
    }

    /// Persist a value, replacing any previous content of the file.
    pub fn save<T: Serialize>(&self, file_name: &str, value: &T) -> Result<()> {
        self.ensure()?;
        let path = self.path_of(file_name);

        let envelope = EnvelopeRef {
            version: FORMAT_VERSION,
            data: value,
        };
        let json = serde_json::to_string_pretty(&envelope)
            .map_err(|e| Error::storage(&path, io::Error::from(e)))?;

        let mut tmp = NamedTempFile::new_in(&self.root).map_err(|e| Error::storage(&self.root, e))?;
        if let Err(e) = write_synced(&mut tmp, json.as_bytes()) {
            return Err(Error::storage(tmp.path(), e));
        }
        tmp.persist(&path).map_err(|e| Error::storage(&path, e.error))?;

        log::debug!("save: wrote {}", path.display());
        Ok(())
    }

    /// Remove a persisted file. Returns whether a file was removed.
    pub fn remove(&self, file_name: &str) -> Result<bool> {
        let path = self.path_of(file_name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::storage(&path, e)),
        }
    }
}

fn write_synced(file: &mut NamedTempFile, bytes: &[u8]) -> io::Result<()> {
    file.write_all(bytes)?;
    file.flush()?;
    file.as_file().sync_all()
}

fn decode<T: DeserializeOwned>(contents: &str) -> std::result::Result<T, String> {
    let envelope: Envelope = serde_json::from_str(contents).map_err(|e| e.to_string())?;
    if envelope.version != FORMAT_VERSION {
        return Err(format!("unsupported format version {}", envelope.version));
    }
    serde_json::from_value(envelope.data).map_err(|e| e.to_string())
}
