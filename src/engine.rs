//! The active catalog of one profile, and the operations that change it.
//!
//! Every mutation is written back to the catalog file before the call
//! returns. Persistence is always the last step, so a scan that fails or is
//! cancelled never touches the stored catalog.

use crate::catalog::{filter_tracks, Catalog, FileFailure, FolderEntry, TrackEntry};
use crate::error::{Error, Result};
use crate::scan::{self, Rename, ScanOutcome, ScanProgress};
use crate::storage::StateDir;
use std::fs;
use std::path::Path;

/// What a scan changed on the media, without the catalog itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub folders: usize,
    pub tracks: usize,
    pub renamed: Vec<Rename>,
    pub rename_failures: Vec<FileFailure>,
}

/// Aggregate result of [`CatalogEngine::commit_deletions`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub deleted: usize,
    pub failed: usize,
    pub failures: Vec<FileFailure>,
}

pub struct CatalogEngine {
    state: StateDir,
    catalog_file_name: String,
    catalog: Catalog,
}

impl CatalogEngine {
    /// Load a persisted catalog. A missing or unreadable file yields an
    /// empty catalog; that is the normal first-run state.
    pub fn load(state: StateDir, catalog_file_name: &str) -> Result<Self> {
        let catalog: Catalog = state.load(catalog_file_name)?.unwrap_or_default();
        Ok(Self {
            state,
            catalog_file_name: catalog_file_name.to_string(),
            catalog,
        })
    }

    /// Load the catalog if one was stored for this name, otherwise scan the
    /// media root and store the result.
    ///
    /// Returns the scan summary when a scan happened.
    pub fn choose_or_scan<P>(
        state: StateDir,
        catalog_file_name: &str,
        media_root: &Path,
        progress: &mut P,
    ) -> Result<(Self, Option<ScanSummary>)>
    where
        P: ScanProgress + ?Sized,
    {
        if let Some(catalog) = state.load::<Catalog>(catalog_file_name)? {
            log::info!("Loaded catalog {}", catalog_file_name);
            let engine = Self {
                state,
                catalog_file_name: catalog_file_name.to_string(),
                catalog,
            };
            return Ok((engine, None));
        }

        let mut engine = Self {
            state,
            catalog_file_name: catalog_file_name.to_string(),
            catalog: Catalog::default(),
        };
        let summary = engine.rescan(media_root, progress)?;
        Ok((engine, Some(summary)))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn catalog_file_name(&self) -> &str {
        &self.catalog_file_name
    }

    /// Scan the media root again, replacing the catalog (and every mark in
    /// it) once the scan has completed.
    pub fn rescan<P>(&mut self, media_root: &Path, progress: &mut P) -> Result<ScanSummary>
    where
        P: ScanProgress + ?Sized,
    {
        let ScanOutcome {
            catalog,
            renamed,
            rename_failures,
        } = scan::scan_media(media_root, progress)?;

        self.state.save(&self.catalog_file_name, &catalog)?;

        let summary = ScanSummary {
            folders: catalog.folders.len(),
            tracks: catalog.folders.iter().map(|f| f.tracks.len()).sum(),
            renamed,
            rename_failures,
        };
        self.catalog = catalog;
        Ok(summary)
    }

    /// Flip the deletion mark of a track (0-based index) and persist.
    /// Returns the new mark.
    pub fn toggle_delete_mark(&mut self, folder_name: &str, track_index: usize) -> Result<bool> {
        let marked = self.catalog.toggle_delete_mark(folder_name, track_index)?;
        if let Err(e) = self.persist() {
            // Keep memory in step with the file that failed to update.
            let _ = self.catalog.toggle_delete_mark(folder_name, track_index);
            return Err(e);
        }
        Ok(marked)
    }

    /// Find a track by 1-based on-screen number.
    pub fn find_by_ordinal(&self, folder_name: &str, ordinal: usize) -> Option<&TrackEntry> {
        self.catalog.find_by_ordinal(folder_name, ordinal)
    }

    /// Delete every marked file under `media_root` and drop the deleted
    /// entries from the catalog.
    ///
    /// A file that cannot be deleted keeps its entry, still marked, so it
    /// shows up again and can be retried. The catalog is persisted whether
    /// or not individual deletions failed.
    pub fn commit_deletions(&mut self, media_root: &Path) -> Result<CommitReport> {
        if !media_root.is_dir() {
            return Err(Error::MediaNotFound(media_root.to_path_buf()));
        }

        let mut report = CommitReport::default();
        let mut folders = Vec::with_capacity(self.catalog.folders.len());

        for folder in &self.catalog.folders {
            let folder_path = media_root.join(&folder.folder_name);
            let tracks = filter_tracks(&folder.tracks, |track| {
                if !track.marked_for_deletion {
                    return true;
                }
                let path = folder_path.join(&track.filename);
                match fs::remove_file(&path) {
                    Ok(()) => {
                        log::debug!("Deleted {}", path.display());
                        report.deleted += 1;
                        false
                    }
                    Err(e) => {
                        log::warn!("Failed to delete {}: {}", path.display(), e);
                        report.failures.push(FileFailure {
                            folder_name: folder.folder_name.clone(),
                            filename: track.filename.clone(),
                            error: e.to_string(),
                        });
                        true
                    }
                }
            });
            folders.push(FolderEntry {
                folder_name: folder.folder_name.clone(),
                tracks,
            });
        }
        report.failed = report.failures.len();

        log::info!(
            "Commit: {} deleted, {} failed",
            report.deleted,
            report.failed
        );

        self.catalog = Catalog::new(folders);
        self.persist()?;
        Ok(report)
    }

    fn persist(&self) -> Result<()> {
        self.state.save(&self.catalog_file_name, &self.catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::NoProgress;
    use tempfile::TempDir;

    const CATALOG: &str = ".Car.tdb";

    struct Fixture {
        _dir: TempDir,
        state: StateDir,
        media: std::path::PathBuf,
    }

    fn fixture(files: &[(&str, &str)]) -> Fixture {
        let dir = TempDir::new().unwrap();
        let media = dir.path().join("usb");
        fs::create_dir_all(&media).unwrap();
        for (folder, file) in files {
            fs::create_dir_all(media.join(folder)).unwrap();
            fs::write(media.join(folder).join(file), b"audio").unwrap();
        }
        let state = StateDir::new(dir.path().join(".profiles"));
        Fixture {
            _dir: dir,
            state,
            media,
        }
    }

    fn scanned(fx: &Fixture) -> CatalogEngine {
        let (engine, summary) =
            CatalogEngine::choose_or_scan(fx.state.clone(), CATALOG, &fx.media, &mut NoProgress).unwrap();
        assert!(summary.is_some());
        engine
    }

    fn index_of(engine: &CatalogEngine, folder: &str, filename: &str) -> usize {
        engine
            .catalog()
            .tracks_in(folder)
            .iter()
            .position(|t| t.filename == filename)
            .unwrap()
    }

    fn mark(engine: &mut CatalogEngine, folder: &str, filename: &str) {
        let idx = index_of(engine, folder, filename);
        assert!(engine.toggle_delete_mark(folder, idx).unwrap());
    }

    fn stored_bytes(fx: &Fixture) -> Vec<u8> {
        fs::read(fx.state.path_of(CATALOG)).unwrap()
    }

    #[test]
    fn test_load_without_file_is_empty() {
        let fx = fixture(&[]);
        let engine = CatalogEngine::load(fx.state.clone(), CATALOG).unwrap();
        assert!(engine.catalog().is_empty());
    }

    #[test]
    fn test_choose_or_scan_does_not_rescan() {
        let fx = fixture(&[("Road Trip", "a.mp3")]);
        let first = scanned(&fx);
        assert_eq!(first.catalog().tracks_in("Road Trip").len(), 1);

        fs::write(fx.media.join("Road Trip").join("b.mp3"), b"audio").unwrap();

        let (second, summary) =
            CatalogEngine::choose_or_scan(fx.state.clone(), CATALOG, &fx.media, &mut NoProgress).unwrap();
        assert!(summary.is_none());
        assert_eq!(second.catalog(), first.catalog());
    }

    #[test]
    fn test_choose_or_scan_rescans_corrupt_catalog() {
        let fx = fixture(&[("F", "a.mp3")]);
        fx.state.ensure().unwrap();
        fs::write(fx.state.path_of(CATALOG), "garbage").unwrap();

        let (engine, summary) =
            CatalogEngine::choose_or_scan(fx.state.clone(), CATALOG, &fx.media, &mut NoProgress).unwrap();
        assert!(summary.is_some());
        assert_eq!(engine.catalog().tracks_in("F").len(), 1);
    }

    #[test]
    fn test_toggle_round_trip_restores_file() {
        let fx = fixture(&[("F", "a.mp3"), ("F", "b.mp3")]);
        let mut engine = scanned(&fx);
        let before = stored_bytes(&fx);

        assert!(engine.toggle_delete_mark("F", 1).unwrap());
        assert_ne!(stored_bytes(&fx), before);
        let reloaded = CatalogEngine::load(fx.state.clone(), CATALOG).unwrap();
        assert!(reloaded.catalog().tracks_in("F")[1].marked_for_deletion);

        assert!(!engine.toggle_delete_mark("F", 1).unwrap());
        assert_eq!(stored_bytes(&fx), before);
    }

    #[test]
    fn test_toggle_not_found_leaves_file() {
        let fx = fixture(&[("F", "a.mp3")]);
        let mut engine = scanned(&fx);
        let before = stored_bytes(&fx);

        assert!(matches!(engine.toggle_delete_mark("F", 1), Err(Error::NotFound(_))));
        assert!(matches!(engine.toggle_delete_mark("G", 0), Err(Error::NotFound(_))));
        assert_eq!(stored_bytes(&fx), before);
    }

    #[test]
    fn test_commit_keeps_unmarked() {
        let fx = fixture(&[("F", "A.mp3"), ("F", "B.mp3"), ("F", "C.mp3")]);
        let mut engine = scanned(&fx);
        mark(&mut engine, "F", "A.mp3");
        mark(&mut engine, "F", "C.mp3");

        let report = engine.commit_deletions(&fx.media).unwrap();

        assert_eq!(report.deleted, 2);
        assert_eq!(report.failed, 0);
        let names: Vec<_> = engine.catalog().tracks_in("F").iter().map(|t| t.filename.as_str()).collect();
        assert_eq!(names, vec!["B.mp3"]);
        assert!(!fx.media.join("F").join("A.mp3").exists());
        assert!(fx.media.join("F").join("B.mp3").exists());
        assert!(!fx.media.join("F").join("C.mp3").exists());

        let reloaded = CatalogEngine::load(fx.state.clone(), CATALOG).unwrap();
        assert_eq!(reloaded.catalog(), engine.catalog());
    }

    #[test]
    fn test_commit_partial_failure_keeps_failed_entry() {
        let fx = fixture(&[("F", "A.mp3"), ("F", "B.mp3"), ("F", "C.mp3")]);
        let mut engine = scanned(&fx);
        let order: Vec<String> = engine.catalog().tracks_in("F").iter().map(|t| t.filename.clone()).collect();
        mark(&mut engine, "F", "A.mp3");
        mark(&mut engine, "F", "C.mp3");
        fs::remove_file(fx.media.join("F").join("C.mp3")).unwrap();

        let report = engine.commit_deletions(&fx.media).unwrap();

        assert_eq!(report.deleted, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures[0].filename, "C.mp3");

        let tracks = engine.catalog().tracks_in("F");
        let expected: Vec<&str> = order
            .iter()
            .map(String::as_str)
            .filter(|n| *n != "A.mp3")
            .collect();
        let names: Vec<&str> = tracks.iter().map(|t| t.filename.as_str()).collect();
        assert_eq!(names, expected);
        let c = tracks.iter().find(|t| t.filename == "C.mp3").unwrap();
        assert!(c.marked_for_deletion);

        let reloaded = CatalogEngine::load(fx.state.clone(), CATALOG).unwrap();
        assert_eq!(reloaded.catalog(), engine.catalog());
    }

    #[test]
    fn test_commit_missing_media() {
        let fx = fixture(&[("F", "A.mp3")]);
        let mut engine = scanned(&fx);
        mark(&mut engine, "F", "A.mp3");
        let before = stored_bytes(&fx);

        let err = engine.commit_deletions(&fx.media.join("gone")).unwrap_err();
        assert!(matches!(err, Error::MediaNotFound(_)));
        assert_eq!(stored_bytes(&fx), before);
        assert_eq!(engine.catalog().marked_count(), 1);
    }

    #[test]
    fn test_rescan_missing_media_leaves_catalog() {
        let fx = fixture(&[("F", "A.mp3")]);
        let mut engine = scanned(&fx);
        mark(&mut engine, "F", "A.mp3");
        let before = stored_bytes(&fx);

        let err = engine.rescan(&fx.media.join("gone"), &mut NoProgress).unwrap_err();
        assert!(matches!(err, Error::MediaNotFound(_)));
        assert_eq!(stored_bytes(&fx), before);
        assert_eq!(engine.catalog().marked_count(), 1);
    }

    #[test]
    fn test_cancelled_rescan_leaves_catalog() {
        let fx = fixture(&[("F", "A.mp3"), ("G", "B.mp3")]);
        let mut engine = scanned(&fx);
        mark(&mut engine, "F", "A.mp3");
        let before = stored_bytes(&fx);

        let flag = crate::scan::CancelFlag::new();
        flag.cancel();
        let err = engine.rescan(&fx.media, &mut flag.wrap(NoProgress)).unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(stored_bytes(&fx), before);
    }

    #[test]
    fn test_scan_of_missing_media_writes_nothing() {
        let fx = fixture(&[]);
        let result = CatalogEngine::choose_or_scan(
            fx.state.clone(),
            CATALOG,
            &fx.media.join("unplugged"),
            &mut NoProgress,
        );

        assert!(matches!(result, Err(Error::MediaNotFound(_))));
        assert!(!fx.state.exists(CATALOG));
    }
}
