use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TrackEntry {
    pub filename: String,
    pub marked_for_deletion: bool,
}

impl TrackEntry {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            marked_for_deletion: false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FolderEntry {
    pub folder_name: String,
    pub tracks: Vec<TrackEntry>,
}

/// Track totals shown in a folder header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FolderCounts {
    pub total: usize,
    pub marked: usize,
}

impl FolderEntry {
    pub fn new(folder_name: impl Into<String>) -> Self {
        Self {
            folder_name: folder_name.into(),
            tracks: Vec::new(),
        }
    }

    pub fn counts(&self) -> FolderCounts {
        FolderCounts {
            total: self.tracks.len(),
            marked: self.tracks.iter().filter(|t| t.marked_for_deletion).count(),
        }
    }

    /// Look up a track by its on-screen number. Ordinals are 1-based and
    /// valid in `1..=tracks.len()`.
    pub fn by_ordinal(&self, ordinal: usize) -> Option<&TrackEntry> {
        ordinal.checked_sub(1).and_then(|idx| self.tracks.get(idx))
    }
}

/// A single file that could not be renamed or deleted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub folder_name: String,
    pub filename: String,
    pub error: String,
}

/// Per-folder track listing for one media root, in directory listing order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Catalog {
    pub folders: Vec<FolderEntry>,
}

impl Catalog {
    pub fn new(folders: Vec<FolderEntry>) -> Self {
        Self { folders }
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    pub fn folder(&self, folder_name: &str) -> Option<&FolderEntry> {
        self.folders.iter().find(|f| f.folder_name == folder_name)
    }

    fn folder_mut(&mut self, folder_name: &str) -> Option<&mut FolderEntry> {
        self.folders.iter_mut().find(|f| f.folder_name == folder_name)
    }

    pub fn folder_names(&self) -> Vec<&str> {
        self.folders.iter().map(|f| f.folder_name.as_str()).collect()
    }

    /// Tracks of a folder, or an empty slice when the folder is unknown.
    pub fn tracks_in(&self, folder_name: &str) -> &[TrackEntry] {
        self.folder(folder_name)
            .map(|f| f.tracks.as_slice())
            .unwrap_or(&[])
    }

    /// Find a track by folder and 1-based ordinal.
    pub fn find_by_ordinal(&self, folder_name: &str, ordinal: usize) -> Option<&TrackEntry> {
        self.folder(folder_name).and_then(|f| f.by_ordinal(ordinal))
    }

    /// Total number of tracks currently marked for deletion.
    pub fn marked_count(&self) -> usize {
        self.folders.iter().map(|f| f.counts().marked).sum()
    }

    /// Flip the deletion mark of the track at `track_index` (0-based).
    /// Returns the new mark.
    pub fn toggle_delete_mark(&mut self, folder_name: &str, track_index: usize) -> Result<bool> {
        let folder = self
            .folder_mut(folder_name)
            .ok_or_else(|| Error::NotFound(format!("folder '{}'", folder_name)))?;
        let count = folder.tracks.len();
        let track = folder.tracks.get_mut(track_index).ok_or_else(|| {
            Error::NotFound(format!(
                "track {} in folder '{}' ({} tracks)",
                track_index, folder_name, count
            ))
        })?;
        track.marked_for_deletion = !track.marked_for_deletion;
        Ok(track.marked_for_deletion)
    }

    /// Replace a folder's tracks with those accepted by `keep`, preserving
    /// order. Returns the number of tracks dropped.
    pub fn retain_tracks<F>(&mut self, folder_name: &str, keep: F) -> usize
    where
        F: FnMut(&TrackEntry) -> bool,
    {
        match self.folder_mut(folder_name) {
            Some(folder) => {
                let kept = filter_tracks(&folder.tracks, keep);
                let dropped = folder.tracks.len() - kept.len();
                folder.tracks = kept;
                dropped
            }
            None => 0,
        }
    }
}

/// Pure filter over a track list.
pub fn filter_tracks<F>(tracks: &[TrackEntry], mut keep: F) -> Vec<TrackEntry>
where
    F: FnMut(&TrackEntry) -> bool,
{
    tracks.iter().filter(|t| keep(t)).cloned().collect()
}
