mod cli;
mod logger;

use crate::cli::{Cli, Commands, OutputConfig, ProfileAction};
use crate::logger::Logger;
use anyhow::{anyhow, bail, Context};
use carstereo_enum::config;
use carstereo_enum::error_log::{ErrorLogManager, ErrorType};
use carstereo_enum::profile::validate_new_profile;
use carstereo_enum::{CatalogEngine, FolderProgress, Profile, ProfileStore, ScanSummary, StateDir};
use clap::Parser;

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();

    let out = Logger::new(OutputConfig::from_cli(&cli));
    if let Err(e) = run(&cli, &out) {
        out.error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(cli: &Cli, out: &Logger) -> anyhow::Result<()> {
    let state = StateDir::new(config::resolve_state_dir(cli.state_dir.as_deref()));
    state.ensure().context("Cannot prepare the state directory")?;
    out.debug(&format!("State directory: {}", state.root().display()));

    let mut store = ProfileStore::load(state.clone())?;
    let journal = ErrorLogManager::new(config::error_log_dir(&state));

    match &cli.command {
        Commands::Profile { action } => match action {
            ProfileAction::List => {
                if store.profiles().is_empty() {
                    out.info("No profiles yet. Create one with `profile create <name> <path>`.");
                }
                for profile in store.profiles() {
                    out.profile(profile);
                }
            }
            ProfileAction::Create { name, path } => {
                let name = validate_new_profile(store.profiles(), name, path)?;
                let profile = store
                    .create(&name, path.clone())
                    .with_context(|| format!("Failed to save profile '{}'", name))?;
                if !profile.media_root_path.is_dir() {
                    out.warn(&format!(
                        "{} does not exist yet; insert the media before scanning.",
                        profile.media_root_path.display()
                    ));
                }
                out.success(&format!("Created profile '{}' (now default).", profile.name));
            }
            ProfileAction::Delete { name } => {
                let removed = store
                    .delete(name)?
                    .ok_or_else(|| anyhow!("Profile '{}' not found", name))?;
                if state.remove(&removed.catalog_file_name)? {
                    out.debug(&format!("Removed catalog {}", removed.catalog_file_name));
                }
                out.success(&format!("Deleted profile '{}'.", removed.name));
            }
            ProfileAction::Use { name } => {
                let profile = store.activate(name)?;
                let engine = open_catalog(&state, &profile, &journal, out)?;
                out.success(&format!(
                    "Using '{}': {} folders, {} marked.",
                    profile.name,
                    engine.catalog().folders.len(),
                    engine.catalog().marked_count()
                ));
            }
            ProfileAction::SearchMode { mode } => {
                let profile = selected_profile(cli, &store)?;
                store.set_search_mode(&profile.name, mode.enabled())?;
                out.success(&format!(
                    "Search mode {} for '{}'.",
                    if mode.enabled() { "on" } else { "off" },
                    profile.name
                ));
            }
        },
        Commands::Scan => {
            let profile = selected_profile(cli, &store)?;
            let mut engine = CatalogEngine::load(state.clone(), &profile.catalog_file_name)?;
            let summary = engine
                .rescan(&profile.media_root_path, &mut |p: &FolderProgress| out.scan_progress(p))
                .with_context(|| format!("Scan of '{}' failed", profile.name))?;
            report_scan(&summary, &profile, &journal, out);
        }
        Commands::Folders => {
            let profile = selected_profile(cli, &store)?;
            let engine = open_catalog(&state, &profile, &journal, out)?;
            if engine.catalog().is_empty() {
                out.info("No folders found on the media.");
            }
            for folder in &engine.catalog().folders {
                out.folder(folder);
            }
        }
        Commands::Tracks { folder } => {
            let profile = selected_profile(cli, &store)?;
            let engine = open_catalog(&state, &profile, &journal, out)?;
            let entry = engine
                .catalog()
                .folder(folder)
                .ok_or_else(|| anyhow!("Folder '{}' not found", folder))?;
            if profile.search_mode_enabled {
                out.info(&format!(
                    "{}: {} tracks. Search mode is on; look tracks up with `find`.",
                    entry.folder_name,
                    entry.tracks.len()
                ));
            } else {
                out.folder(entry);
                for (idx, track) in entry.tracks.iter().enumerate() {
                    out.track(idx + 1, track);
                }
            }
        }
        Commands::Find { folder, ordinal } => {
            let profile = selected_profile(cli, &store)?;
            let engine = open_catalog(&state, &profile, &journal, out)?;
            let track = engine
                .find_by_ordinal(folder, *ordinal)
                .ok_or_else(|| anyhow!("No track {} in folder '{}'", ordinal, folder))?;
            out.track(*ordinal, track);
        }
        Commands::Mark { folder, ordinal } => {
            let profile = selected_profile(cli, &store)?;
            let mut engine = open_catalog(&state, &profile, &journal, out)?;
            let index = ordinal
                .checked_sub(1)
                .ok_or_else(|| anyhow!("Track numbers start at 1"))?;
            engine.toggle_delete_mark(folder, index)?;
            if let Some(track) = engine.find_by_ordinal(folder, *ordinal) {
                out.track(*ordinal, track);
            }
        }
        Commands::Commit => {
            let profile = selected_profile(cli, &store)?;
            let mut engine = open_catalog(&state, &profile, &journal, out)?;
            if engine.catalog().marked_count() == 0 {
                out.info("Nothing is marked for deletion.");
                return Ok(());
            }
            let report = engine
                .commit_deletions(&profile.media_root_path)
                .with_context(|| format!("Commit for '{}' failed", profile.name))?;
            for failure in &report.failures {
                out.file_failure("delete", failure);
            }
            journal.record(ErrorType::Delete, &profile.name, &report.failures);
            out.commit_complete(&report);
        }
        Commands::Errors { clear } => {
            if *clear {
                journal.clear_all();
                out.success("Failure journal cleared.");
                return Ok(());
            }
            let entries = journal.all_entries();
            if entries.is_empty() {
                out.info("No failures recorded.");
            }
            for (date, entry) in &entries {
                out.journal_entry(date, entry);
            }
        }
    }

    Ok(())
}

/// The profile named by `--profile`, else the default one.
fn selected_profile(cli: &Cli, store: &ProfileStore) -> anyhow::Result<Profile> {
    match &cli.profile {
        Some(name) => store
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("Profile '{}' not found", name)),
        None => match store.get_default() {
            Some(profile) => Ok(profile.clone()),
            None => bail!("No default profile. Create one with `profile create <name> <path>`."),
        },
    }
}

/// Load the profile's catalog, scanning the media first if none is stored.
fn open_catalog(
    state: &StateDir,
    profile: &Profile,
    journal: &ErrorLogManager,
    out: &Logger,
) -> anyhow::Result<CatalogEngine> {
    let (engine, summary) = CatalogEngine::choose_or_scan(
        state.clone(),
        &profile.catalog_file_name,
        &profile.media_root_path,
        &mut |p: &FolderProgress| out.scan_progress(p),
    )
    .with_context(|| format!("Cannot open the catalog of '{}'", profile.name))?;

    if let Some(summary) = summary {
        report_scan(&summary, profile, journal, out);
    }
    Ok(engine)
}

fn report_scan(summary: &ScanSummary, profile: &Profile, journal: &ErrorLogManager, out: &Logger) {
    for rename in &summary.renamed {
        out.renamed(rename);
    }
    for failure in &summary.rename_failures {
        out.file_failure("rename", failure);
    }
    journal.record(ErrorType::Rename, &profile.name, &summary.rename_failures);
    out.scan_complete(summary);
}
