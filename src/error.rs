use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The managed state directory or a persistence file could not be
    /// created, read or written. The tool cannot function without it.
    #[error("storage unavailable at {}: {source}", path.display())]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configured media root does not exist.
    #[error("media root not found: {}", .0.display())]
    MediaNotFound(PathBuf),

    /// A folder, track or profile referenced by the caller is not in memory.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid profile: {0}")]
    InvalidProfile(String),

    #[error("scan cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::StorageUnavailable {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
