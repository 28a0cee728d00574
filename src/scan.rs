//! Media root scanning: filename sanitization followed by catalog building.
//!
//! Only the first level of the tree is considered. Every directory directly
//! under the media root becomes a folder entry and every audio file directly
//! inside such a folder becomes a track entry. Anything deeper is ignored,
//! the way a car stereo ignores it.

use crate::catalog::{Catalog, FileFailure, FolderEntry, TrackEntry};
use crate::error::{Error, Result};
use crate::file_utils;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    /// Renaming files with disallowed characters.
    Sanitize,
    /// Reading folder contents into the catalog.
    Catalog,
}

/// "Folder `index + 1` of `total`" progress event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderProgress {
    pub phase: ScanPhase,
    /// 0-based position of the folder in listing order.
    pub index: usize,
    pub total: usize,
    pub folder_name: String,
}

/// Observer for long-running scans.
///
/// Called on the scanning thread; implementations must not assume they run
/// on a UI thread.
pub trait ScanProgress {
    fn folder_started(&mut self, progress: &FolderProgress);

    /// Polled between folders and between files. Returning `true` stops the
    /// scan with [`Error::Cancelled`] before anything is persisted.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Progress sink that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ScanProgress for NoProgress {
    fn folder_started(&mut self, _progress: &FolderProgress) {}
}

impl<F> ScanProgress for F
where
    F: FnMut(&FolderProgress),
{
    fn folder_started(&mut self, progress: &FolderProgress) {
        self(progress)
    }
}

/// Shared cancellation switch, settable from any thread.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Attach this flag to a progress sink.
    pub fn wrap<P: ScanProgress>(&self, inner: P) -> Cancellable<P> {
        Cancellable {
            inner,
            flag: self.clone(),
        }
    }
}

pub struct Cancellable<P> {
    inner: P,
    flag: CancelFlag,
}

impl<P: ScanProgress> ScanProgress for Cancellable<P> {
    fn folder_started(&mut self, progress: &FolderProgress) {
        self.inner.folder_started(progress);
    }

    fn is_cancelled(&self) -> bool {
        self.flag.is_cancelled() || self.inner.is_cancelled()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub folder_name: String,
    pub from: String,
    pub to: String,
}

/// Result of a completed scan. Nothing here has been persisted yet.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub catalog: Catalog,
    pub renamed: Vec<Rename>,
    pub rename_failures: Vec<FileFailure>,
}

/// Sanitize filenames under `media_root` and build a fresh catalog.
pub fn scan_media<P>(media_root: &Path, progress: &mut P) -> Result<ScanOutcome>
where
    P: ScanProgress + ?Sized,
{
    scan_media_with(media_root, progress, |from: &Path, to: &Path| fs::rename(from, to))
}

/// [`scan_media`] with the rename step supplied by the caller.
fn scan_media_with<P, R>(media_root: &Path, progress: &mut P, mut rename: R) -> Result<ScanOutcome>
where
    P: ScanProgress + ?Sized,
    R: FnMut(&Path, &Path) -> io::Result<()>,
{
    if !media_root.is_dir() {
        return Err(Error::MediaNotFound(media_root.to_path_buf()));
    }

    let folders = top_level_folders(media_root)?;
    let total = folders.len();
    log::info!("Scanning {} ({} folders)", media_root.display(), total);

    let mut outcome = ScanOutcome::default();

    for (index, (folder_name, folder_path)) in folders.iter().enumerate() {
        check_cancelled(progress)?;
        progress.folder_started(&FolderProgress {
            phase: ScanPhase::Sanitize,
            index,
            total,
            folder_name: folder_name.clone(),
        });
        sanitize_folder(folder_name, folder_path, progress, &mut rename, &mut outcome)?;
    }

    for (index, (folder_name, folder_path)) in folders.iter().enumerate() {
        check_cancelled(progress)?;
        progress.folder_started(&FolderProgress {
            phase: ScanPhase::Catalog,
            index,
            total,
            folder_name: folder_name.clone(),
        });
        let tracks = collect_tracks(folder_path, progress)?;
        outcome.catalog.folders.push(FolderEntry {
            folder_name: folder_name.clone(),
            tracks,
        });
    }

    log::info!(
        "Scan finished: {} folders, {} renamed, {} rename failures",
        outcome.catalog.folders.len(),
        outcome.renamed.len(),
        outcome.rename_failures.len()
    );
    Ok(outcome)
}

fn check_cancelled<P: ScanProgress + ?Sized>(progress: &P) -> Result<()> {
    if progress.is_cancelled() {
        log::info!("Scan cancelled");
        return Err(Error::Cancelled);
    }
    Ok(())
}

fn list_dir(path: &Path) -> io::Result<Vec<fs::DirEntry>> {
    fs::read_dir(path)?.collect()
}

/// Directories directly under the media root, in listing order.
fn top_level_folders(media_root: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut folders = Vec::new();
    for entry in list_dir(media_root)? {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => folders.push((name, path)),
            Err(raw) => log::warn!("Skipping folder with non-UTF-8 name {:?}", raw),
        }
    }
    Ok(folders)
}

fn sanitize_folder<P, R>(
    folder_name: &str,
    folder_path: &Path,
    progress: &P,
    rename: &mut R,
    outcome: &mut ScanOutcome,
) -> Result<()>
where
    P: ScanProgress + ?Sized,
    R: FnMut(&Path, &Path) -> io::Result<()>,
{
    let entries = match list_dir(folder_path) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Cannot list {}: {}", folder_path.display(), e);
            return Ok(());
        }
    };

    for entry in entries {
        check_cancelled(progress)?;

        let original = entry.file_name();
        let name = original.to_string_lossy();
        let path = entry.path();
        if !file_utils::is_audio_file_name(&name) || !path.is_file() {
            continue;
        }

        let candidate = file_utils::sanitize_filename(&name);
        if original.to_str() == Some(candidate.as_str()) {
            continue;
        }

        let target = file_utils::resolve_collision(folder_path, &candidate, |p| {
            fs::symlink_metadata(p).is_ok()
        });

        match rename(&path, &folder_path.join(&target)) {
            Ok(()) => {
                log::debug!("Renamed {:?} -> {:?} in {}", name, target, folder_name);
                outcome.renamed.push(Rename {
                    folder_name: folder_name.to_string(),
                    from: name.into_owned(),
                    to: target,
                });
            }
            Err(e) => {
                log::warn!("Failed to rename {}: {}", path.display(), e);
                outcome.rename_failures.push(FileFailure {
                    folder_name: folder_name.to_string(),
                    filename: name.into_owned(),
                    error: e.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Audio files directly inside a folder, in listing order, unmarked.
fn collect_tracks<P>(folder_path: &Path, progress: &P) -> Result<Vec<TrackEntry>>
where
    P: ScanProgress + ?Sized,
{
    let entries = match list_dir(folder_path) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Cannot list {}: {}", folder_path.display(), e);
            return Ok(Vec::new());
        }
    };

    let mut tracks = Vec::new();
    for entry in entries {
        check_cancelled(progress)?;

        let path = entry.path();
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                log::warn!("Skipping file with non-UTF-8 name {:?}", raw);
                continue;
            }
        };
        if file_utils::is_audio_file_name(&name) && path.is_file() {
            tracks.push(TrackEntry::new(name));
        }
    }
    Ok(tracks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, path.to_string_lossy().as_bytes()).unwrap();
    }

    fn names_on_disk(dir: &Path) -> HashSet<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect()
    }

    #[test]
    fn test_road_trip_scenario() {
        let media = TempDir::new().unwrap();
        let folder = media.path().join("Road Trip");
        touch(&folder.join("Track#1.mp3"));
        touch(&folder.join("Track#2.mp3"));
        touch(&folder.join("notes.txt"));

        let outcome = scan_media(media.path(), &mut NoProgress).unwrap();

        assert_eq!(outcome.catalog.folders.len(), 1);
        let entry = &outcome.catalog.folders[0];
        assert_eq!(entry.folder_name, "Road Trip");

        let names: HashSet<_> = entry.tracks.iter().map(|t| t.filename.as_str()).collect();
        assert_eq!(names, HashSet::from(["Track1.mp3", "Track2.mp3"]));
        assert!(entry.tracks.iter().all(|t| !t.marked_for_deletion));

        assert_eq!(
            names_on_disk(&folder),
            HashSet::from([
                "Track1.mp3".to_string(),
                "Track2.mp3".to_string(),
                "notes.txt".to_string()
            ])
        );
        assert_eq!(outcome.renamed.len(), 2);
    }

    #[test]
    fn test_second_scan_renames_nothing() {
        let media = TempDir::new().unwrap();
        touch(&media.path().join("A").join("Hit!!.mp3"));
        touch(&media.path().join("A").join("Кино (live).flac"));
        touch(&media.path().join("B").join("ok.wav"));

        let first = scan_media(media.path(), &mut NoProgress).unwrap();
        assert_eq!(first.renamed.len(), 2);

        let second = scan_media(media.path(), &mut NoProgress).unwrap();
        assert!(second.renamed.is_empty());
        assert!(second.rename_failures.is_empty());
        assert_eq!(first.catalog.folders.len(), second.catalog.folders.len());
    }

    #[test]
    fn test_collisions_keep_every_file() {
        let media = TempDir::new().unwrap();
        let folder = media.path().join("Mix");
        let originals = ["Song#.mp3", "Song!.mp3", "Song?.mp3", "So#ng.mp3"];
        for name in originals {
            touch(&folder.join(name));
        }

        let outcome = scan_media(media.path(), &mut NoProgress).unwrap();
        let on_disk = names_on_disk(&folder);

        assert_eq!(on_disk.len(), originals.len());
        for name in &on_disk {
            let stem = name.strip_suffix(".mp3").unwrap();
            let markers = stem.strip_prefix("Song").unwrap();
            assert_eq!(markers.len() % file_utils::RENAMED_MARKER.len(), 0);
            assert!(markers.is_empty() || markers.split("-RENAMED").all(|p| p.is_empty()));
        }
        assert_eq!(outcome.catalog.folders[0].tracks.len(), originals.len());

        // Content survives: every original path is stored as file content.
        let contents: HashSet<String> = on_disk
            .iter()
            .map(|n| fs::read_to_string(folder.join(n)).unwrap())
            .collect();
        assert_eq!(contents.len(), originals.len());
    }

    #[test]
    fn test_existing_clean_name_is_not_overwritten() {
        let media = TempDir::new().unwrap();
        let folder = media.path().join("F");
        touch(&folder.join("Track1.mp3"));
        touch(&folder.join("Track#1.mp3"));

        scan_media(media.path(), &mut NoProgress).unwrap();

        assert_eq!(
            names_on_disk(&folder),
            HashSet::from(["Track1.mp3".to_string(), "Track1-RENAMED.mp3".to_string()])
        );
        let original = fs::read_to_string(folder.join("Track1.mp3")).unwrap();
        assert!(original.ends_with("Track1.mp3"));
    }

    #[test]
    fn test_ignores_nested_and_root_files() {
        let media = TempDir::new().unwrap();
        touch(&media.path().join("loose#.mp3"));
        touch(&media.path().join("Top").join("Deep").join("inner#.mp3"));
        touch(&media.path().join("Top").join("Upper.MP3"));

        let outcome = scan_media(media.path(), &mut NoProgress).unwrap();

        assert_eq!(outcome.catalog.folder_names(), vec!["Top"]);
        assert!(outcome.catalog.tracks_in("Top").is_empty());
        assert!(media.path().join("loose#.mp3").exists());
        assert!(media.path().join("Top").join("Deep").join("inner#.mp3").exists());
    }

    #[test]
    fn test_missing_media_root() {
        let media = TempDir::new().unwrap();
        let missing = media.path().join("unplugged");

        let err = scan_media(&missing, &mut NoProgress).unwrap_err();
        assert!(matches!(err, Error::MediaNotFound(p) if p == missing));
    }

    #[test]
    fn test_progress_reports_each_folder() {
        let media = TempDir::new().unwrap();
        for name in ["One", "Two", "Three"] {
            touch(&media.path().join(name).join("a.mp3"));
        }

        let mut events = Vec::new();
        let outcome = scan_media(media.path(), &mut |p: &FolderProgress| events.push(p.clone())).unwrap();

        let catalog_events: Vec<_> = events
            .iter()
            .filter(|e| e.phase == ScanPhase::Catalog)
            .collect();
        assert_eq!(catalog_events.len(), 3);
        for (i, event) in catalog_events.iter().enumerate() {
            assert_eq!(event.index, i);
            assert_eq!(event.total, 3);
            assert_eq!(event.folder_name, outcome.catalog.folders[i].folder_name);
        }
        assert_eq!(events.iter().filter(|e| e.phase == ScanPhase::Sanitize).count(), 3);
    }

    #[test]
    fn test_cancel_stops_scan() {
        let media = TempDir::new().unwrap();
        touch(&media.path().join("One").join("a.mp3"));
        touch(&media.path().join("Two").join("b.mp3"));

        let flag = CancelFlag::new();
        let trigger = flag.clone();
        let mut progress = flag.wrap(move |_: &FolderProgress| trigger.cancel());

        let err = scan_media(media.path(), &mut progress).unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[test]
    fn test_failed_rename_is_isolated() {
        let media = TempDir::new().unwrap();
        let folder = media.path().join("Road Trip");
        touch(&folder.join("Track#1.mp3"));
        touch(&folder.join("Track#2.mp3"));
        touch(&folder.join("Track#3.mp3"));

        let outcome = scan_media_with(media.path(), &mut NoProgress, |from: &Path, to: &Path| {
            if from.ends_with("Track#2.mp3") {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
            }
            fs::rename(from, to)
        })
        .unwrap();

        assert_eq!(outcome.renamed.len(), 2);
        assert_eq!(
            outcome.rename_failures,
            vec![FileFailure {
                folder_name: "Road Trip".to_string(),
                filename: "Track#2.mp3".to_string(),
                error: "read-only".to_string(),
            }]
        );

        let names: HashSet<_> = outcome.catalog.folders[0]
            .tracks
            .iter()
            .map(|t| t.filename.as_str())
            .collect();
        assert_eq!(names, HashSet::from(["Track1.mp3", "Track#2.mp3", "Track3.mp3"]));
        assert!(folder.join("Track#2.mp3").exists());
    }
}
