//! Profiles, catalogs and deletion marks for music on removable media.
//!
//! A profile binds a name to a media root. Scanning the root renames files
//! with characters a car stereo cannot display and records every top-level
//! folder with its audio files. Tracks can then be marked by their on-screen
//! number and the marked files deleted in one commit.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod error_log;
pub mod file_utils;
pub mod profile;
pub mod scan;
pub mod storage;

pub use catalog::{Catalog, FileFailure, FolderCounts, FolderEntry, TrackEntry};
pub use engine::{CatalogEngine, CommitReport, ScanSummary};
pub use error::{Error, Result};
pub use profile::{Profile, ProfileStore};
pub use scan::{CancelFlag, FolderProgress, NoProgress, ScanPhase, ScanProgress};
pub use storage::StateDir;
