use crate::catalog::FileFailure;
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Error types for categorizing per-file failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorType {
    Rename,
    Delete,
}

impl ErrorType {
    pub const ALL: [ErrorType; 2] = [ErrorType::Rename, ErrorType::Delete];

    pub fn filename(&self) -> &'static str {
        match self {
            ErrorType::Rename => "rename.json",
            ErrorType::Delete => "delete.json",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ErrorType::Rename => "Rename",
            ErrorType::Delete => "Delete",
        }
    }
}

/// A file the scan could not rename or the commit could not delete
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FailureEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: ErrorType,
    pub profile: String,
    pub folder_name: String,
    pub filename: String,
    pub error: String,
}

impl FailureEntry {
    pub fn new(kind: ErrorType, profile: &str, failure: &FileFailure) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            kind,
            profile: profile.to_string(),
            folder_name: failure.folder_name.clone(),
            filename: failure.filename.clone(),
            error: failure.error.clone(),
        }
    }
}

/// Journal of per-file failures, organized by date and error type.
///
/// Failures here never affect the catalog; writing the journal is best
/// effort and problems are only logged.
pub struct ErrorLogManager {
    base_path: PathBuf,
}

impl ErrorLogManager {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Get today's date as a string (YYYY-MM-DD)
    fn today_str() -> String {
        Local::now().format("%Y-%m-%d").to_string()
    }

    fn get_log_path(&self, date: &str, error_type: ErrorType) -> PathBuf {
        self.base_path.join(date).join(error_type.filename())
    }

    /// Append failures of one kind to today's journal.
    pub fn record(&self, kind: ErrorType, profile: &str, failures: &[FileFailure]) {
        if failures.is_empty() {
            return;
        }
        let date = Self::today_str();
        let path = self.get_log_path(&date, kind);

        let mut entries = load_entries(&path);
        entries.extend(failures.iter().map(|f| FailureEntry::new(kind, profile, f)));
        save_entries(&path, &entries);
    }

    /// All entries recorded on a date, both kinds, oldest first.
    pub fn entries_for_date(&self, date: &str) -> Vec<FailureEntry> {
        let mut entries: Vec<FailureEntry> = ErrorType::ALL
            .iter()
            .flat_map(|kind| load_entries(&self.get_log_path(date, *kind)))
            .collect();
        entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        entries
    }

    /// Every entry across all dates, newest first.
    pub fn all_entries(&self) -> Vec<(String, FailureEntry)> {
        let mut all = Vec::new();
        for date in self.list_dates() {
            for entry in self.entries_for_date(&date) {
                all.push((date.clone(), entry));
            }
        }
        all.sort_by(|a, b| b.1.timestamp.cmp(&a.1.timestamp));
        all
    }

    /// List all dates that have error logs (sorted newest first)
    pub fn list_dates(&self) -> Vec<String> {
        let mut dates = Vec::new();

        if let Ok(entries) = fs::read_dir(&self.base_path) {
            for entry in entries.flatten() {
                if entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
                    if let Some(name) = entry.file_name().to_str() {
                        if NaiveDate::parse_from_str(name, "%Y-%m-%d").is_ok() {
                            dates.push(name.to_string());
                        }
                    }
                }
            }
        }

        dates.sort_by(|a, b| b.cmp(a));
        dates
    }

    /// Remove an entry by ID and date
    pub fn remove(&self, date: &str, id: &str) -> bool {
        for kind in ErrorType::ALL {
            let path = self.get_log_path(date, kind);
            let mut entries = load_entries(&path);
            let original_len = entries.len();
            entries.retain(|e| e.id != id);

            if entries.len() != original_len {
                if entries.is_empty() {
                    let _ = fs::remove_file(&path);
                    self.cleanup_empty_date_dir(date);
                } else {
                    save_entries(&path, &entries);
                }
                return true;
            }
        }
        false
    }

    /// Clear all error logs
    pub fn clear_all(&self) {
        if self.base_path.exists() {
            if let Err(e) = fs::remove_dir_all(&self.base_path) {
                log::warn!("Failed to clear {}: {}", self.base_path.display(), e);
            }
        }
    }

    fn cleanup_empty_date_dir(&self, date: &str) {
        let date_dir = self.base_path.join(date);
        if let Ok(mut entries) = fs::read_dir(&date_dir) {
            if entries.next().is_none() {
                let _ = fs::remove_dir(&date_dir);
            }
        }
    }
}

fn load_entries(path: &Path) -> Vec<FailureEntry> {
    if !path.exists() {
        return Vec::new();
    }
    let data = fs::read_to_string(path).unwrap_or_default();
    serde_json::from_str(&data).unwrap_or_default()
}

fn save_entries(path: &Path, entries: &[FailureEntry]) {
    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            log::warn!("Cannot create {}: {}", parent.display(), e);
            return;
        }
    }
    match serde_json::to_string_pretty(entries) {
        Ok(data) => {
            if let Err(e) = fs::write(path, data) {
                log::warn!("Cannot write {}: {}", path.display(), e);
            }
        }
        Err(e) => log::warn!("Cannot serialize failure journal: {}", e),
    }
}
