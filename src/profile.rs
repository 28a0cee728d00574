//! Named profiles binding a media root to its persisted catalog.

use crate::error::{Error, Result};
use crate::storage::StateDir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File holding the profile list inside the state directory.
pub const PROFILE_LIST_FILE: &str = ".profilelist.pfl";

/// Picker label reserved for "create a new profile".
pub const NEW_PROFILE_LABEL: &str = "New..";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub catalog_file_name: String,
    pub media_root_path: PathBuf,
    /// Show the search-by-number view instead of the full track list.
    pub search_mode_enabled: bool,
    pub is_default: bool,
}

impl Profile {
    pub fn new(name: &str, media_root_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            catalog_file_name: catalog_file_name_for(name),
            media_root_path: media_root_path.into(),
            search_mode_enabled: false,
            is_default: true,
        }
    }
}

/// Catalog file name derived from a profile name.
pub fn catalog_file_name_for(name: &str) -> String {
    format!(".{}.tdb", name)
}

/// Check a new profile's name and path against the existing list.
///
/// Returns the trimmed name to pass to [`ProfileStore::create`].
pub fn validate_new_profile(profiles: &[Profile], name: &str, media_root_path: &Path) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidProfile("profile name is empty".to_string()));
    }
    if media_root_path.as_os_str().is_empty() {
        return Err(Error::InvalidProfile("path to removable media is empty".to_string()));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(Error::InvalidProfile(format!(
            "profile name '{}' contains a path separator or NUL",
            name.escape_default()
        )));
    }
    if name == NEW_PROFILE_LABEL {
        return Err(Error::InvalidProfile(format!("'{}' is a reserved name", NEW_PROFILE_LABEL)));
    }
    if profiles.iter().any(|p| p.name == name) {
        return Err(Error::InvalidProfile(format!("profile '{}' already exists", name)));
    }
    Ok(name.to_string())
}

/// In-memory profile list, rewritten to the state directory after every
/// mutation.
pub struct ProfileStore {
    profiles: Vec<Profile>,
    state: StateDir,
}

impl ProfileStore {
    /// Load the profile list. A missing or unreadable list starts empty.
    pub fn load(state: StateDir) -> Result<Self> {
        let profiles: Vec<Profile> = state.load(PROFILE_LIST_FILE)?.unwrap_or_default();
        log::debug!("Loaded {} profiles from {}", profiles.len(), state.root().display());
        Ok(Self { profiles, state })
    }

    pub fn save(&self) -> Result<()> {
        self.state.save(PROFILE_LIST_FILE, &self.profiles)
    }

    /// Persist `profiles` and adopt it only once the write succeeded.
    fn replace(&mut self, profiles: Vec<Profile>) -> Result<()> {
        self.state.save(PROFILE_LIST_FILE, &profiles)?;
        self.profiles = profiles;
        Ok(())
    }

    pub fn state(&self) -> &StateDir {
        &self.state
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn names(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.name.as_str()).collect()
    }

    /// Append a new profile and make it the default.
    ///
    /// No validation happens here: empty, duplicate or reserved names are
    /// accepted as given. Callers run [`validate_new_profile`] first.
    pub fn create(&mut self, name: &str, media_root_path: impl Into<PathBuf>) -> Result<Profile> {
        let mut profiles = self.profiles.clone();
        clear_default(&mut profiles);
        let profile = Profile::new(name, media_root_path);
        profiles.push(profile.clone());
        self.replace(profiles)?;
        log::info!("Created profile '{}'", name);
        Ok(profile)
    }

    /// Remove every profile named `name` and persist. Returns the removed
    /// profile, if any, so the caller can drop its catalog too.
    pub fn delete(&mut self, name: &str) -> Result<Option<Profile>> {
        let (removed, kept): (Vec<Profile>, Vec<Profile>) =
            self.profiles.iter().cloned().partition(|p| p.name == name);
        self.replace(kept)?;
        Ok(removed.into_iter().next())
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    pub fn get_default(&self) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.is_default)
    }

    /// Re-select an existing profile as the default.
    pub fn activate(&mut self, name: &str) -> Result<Profile> {
        let idx = self.position(name)?;
        let mut profiles = self.profiles.clone();
        clear_default(&mut profiles);
        profiles[idx].is_default = true;
        self.replace(profiles)?;
        Ok(self.profiles[idx].clone())
    }

    pub fn set_search_mode(&mut self, name: &str, enabled: bool) -> Result<()> {
        let idx = self.position(name)?;
        let mut profiles = self.profiles.clone();
        profiles[idx].search_mode_enabled = enabled;
        self.replace(profiles)
    }

    fn position(&self, name: &str) -> Result<usize> {
        self.profiles
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| Error::NotFound(format!("profile '{}'", name)))
    }
}

fn clear_default(profiles: &mut [Profile]) {
    for profile in profiles.iter_mut() {
        profile.is_default = false;
    }
}
