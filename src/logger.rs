use crate::cli::{OutputConfig, OutputFormat};
use carstereo_enum::error_log::FailureEntry;
use carstereo_enum::scan::{FolderProgress, Rename, ScanPhase};
use carstereo_enum::{CommitReport, FileFailure, FolderEntry, Profile, ScanSummary, TrackEntry};
use serde::Serialize;

#[derive(Clone)]
pub struct Logger {
    config: OutputConfig,
}

#[derive(Serialize)]
struct JsonEvent {
    #[serde(rename = "type")]
    event_type: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

impl Logger {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn info(&self, message: &str) {
        if self.config.quiet {
            return;
        }
        self.output("info", message, None);
    }

    pub fn success(&self, message: &str) {
        if self.config.quiet {
            return;
        }
        self.output("success", message, None);
    }

    pub fn warn(&self, message: &str) {
        self.output("warn", message, None);
    }

    pub fn error(&self, message: &str) {
        self.output("error", message, None);
    }

    pub fn debug(&self, message: &str) {
        if !self.config.verbose {
            return;
        }
        self.output("debug", message, None);
    }

    pub fn scan_progress(&self, progress: &FolderProgress) {
        if self.config.quiet {
            return;
        }
        let phase = match progress.phase {
            ScanPhase::Sanitize => "sanitize",
            ScanPhase::Catalog => "catalog",
        };
        let data = serde_json::json!({
            "phase": phase,
            "index": progress.index + 1,
            "total": progress.total,
            "folder": progress.folder_name,
        });
        let message = format!(
            "{} folder {} of {}: {}",
            if progress.phase == ScanPhase::Sanitize { "Sanitizing" } else { "Reading" },
            progress.index + 1,
            progress.total,
            progress.folder_name
        );
        self.output("progress", &message, Some(data));
    }

    pub fn renamed(&self, rename: &Rename) {
        if self.config.quiet {
            return;
        }
        let data = serde_json::json!({
            "folder": rename.folder_name,
            "from": rename.from,
            "to": rename.to,
        });
        let message = format!("{}: {} -> {}", rename.folder_name, rename.from, rename.to);
        self.output("renamed", &message, Some(data));
    }

    pub fn file_failure(&self, action: &str, failure: &FileFailure) {
        let data = serde_json::json!({
            "action": action,
            "folder": failure.folder_name,
            "file": failure.filename,
            "error": failure.error,
        });
        let message = format!(
            "Could not {} {}/{}: {}",
            action, failure.folder_name, failure.filename, failure.error
        );
        self.output("file_failure", &message, Some(data));
    }

    pub fn scan_complete(&self, summary: &ScanSummary) {
        let data = serde_json::json!({
            "folders": summary.folders,
            "tracks": summary.tracks,
            "renamed": summary.renamed.len(),
            "rename_failures": summary.rename_failures.len(),
        });
        let message = format!(
            "Scan finished: {} folders, {} tracks, {} renamed, {} rename failures.",
            summary.folders,
            summary.tracks,
            summary.renamed.len(),
            summary.rename_failures.len()
        );
        self.output("scan_complete", &message, Some(data));
    }

    pub fn commit_complete(&self, report: &CommitReport) {
        let data = serde_json::json!({
            "deleted": report.deleted,
            "failed": report.failed,
        });
        let message = format!(
            "Commit finished: {} deleted, {} failed.",
            report.deleted, report.failed
        );
        self.output("commit_complete", &message, Some(data));
    }

    pub fn profile(&self, profile: &Profile) {
        let data = serde_json::json!({
            "name": profile.name,
            "path": profile.media_root_path.display().to_string(),
            "catalog": profile.catalog_file_name,
            "search_mode": profile.search_mode_enabled,
            "default": profile.is_default,
        });
        let message = format!(
            "{}{} -> {}",
            if profile.is_default { "* " } else { "  " },
            profile.name,
            profile.media_root_path.display()
        );
        self.output("profile", &message, Some(data));
    }

    pub fn folder(&self, folder: &FolderEntry) {
        let counts = folder.counts();
        let data = serde_json::json!({
            "folder": folder.folder_name,
            "tracks": counts.total,
            "marked": counts.marked,
        });
        let message = format!(
            "{} [{} tracks, {} marked]",
            folder.folder_name, counts.total, counts.marked
        );
        self.output("folder", &message, Some(data));
    }

    /// One numbered track line, `ordinal` as shown by the stereo.
    pub fn track(&self, ordinal: usize, track: &TrackEntry) {
        let data = serde_json::json!({
            "ordinal": ordinal,
            "file": track.filename,
            "marked": track.marked_for_deletion,
        });
        self.output("track", &track_line(ordinal, track), Some(data));
    }

    pub fn journal_entry(&self, date: &str, entry: &FailureEntry) {
        let data = serde_json::json!({
            "date": date,
            "id": entry.id,
            "kind": entry.kind.display_name(),
            "profile": entry.profile,
            "folder": entry.folder_name,
            "file": entry.filename,
            "error": entry.error,
        });
        let message = format!(
            "{} {} [{}] {}/{}: {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.kind.display_name(),
            entry.profile,
            entry.folder_name,
            entry.filename,
            entry.error
        );
        self.output("journal", &message, Some(data));
    }

    fn output(&self, event_type: &str, message: &str, data: Option<serde_json::Value>) {
        match self.config.format {
            OutputFormat::Json => {
                let event = JsonEvent {
                    event_type: event_type.to_string(),
                    message: message.to_string(),
                    data,
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    println!("{}", json);
                }
            }
            OutputFormat::Text => match prefix(event_type) {
                Some(prefix) => println!("{} {}", prefix, message),
                None => println!("{}", message),
            },
        }
    }
}

/// Text prefix for an event; listings print bare.
fn prefix(event_type: &str) -> Option<&'static str> {
    match event_type {
        "error" | "file_failure" => Some("[ERROR]"),
        "warn" => Some("[WARN]"),
        "debug" => Some("[DEBUG]"),
        "progress" => Some("[...]"),
        "renamed" => Some("[RENAME]"),
        "success" | "scan_complete" | "commit_complete" => Some("[OK]"),
        "profile" | "folder" | "track" | "journal" => None,
        _ => Some("[INFO]"),
    }
}

fn track_line(ordinal: usize, track: &TrackEntry) -> String {
    format!(
        "{:>3}. {} {}",
        ordinal,
        if track.marked_for_deletion { "[x]" } else { "[ ]" },
        track.filename
    )
}
