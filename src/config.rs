//! Where profiles, catalogs and the failure journal are kept.

use crate::storage::StateDir;
use std::path::{Path, PathBuf};

pub const APP_DIR: &str = "carstereo-enum";

/// Environment variable overriding the state directory.
pub const STATE_DIR_ENV: &str = "CARSTEREO_STATE_DIR";

/// Used when the platform reports no data directory.
pub const FALLBACK_STATE_DIR: &str = ".profiles";

const ERRORS_DIR: &str = "errors";

pub fn default_state_dir() -> PathBuf {
    match dirs::data_local_dir() {
        Some(base) => base.join(APP_DIR).join("profiles"),
        None => PathBuf::from(FALLBACK_STATE_DIR),
    }
}

/// Pick the state directory: the `--state-dir` value (which clap fills from
/// [`STATE_DIR_ENV`] when the flag is absent), else the platform default.
/// An empty value counts as unset.
pub fn resolve_state_dir(configured: Option<&Path>) -> PathBuf {
    match configured.filter(|p| !p.as_os_str().is_empty()) {
        Some(path) => path.to_path_buf(),
        None => default_state_dir(),
    }
}

/// Directory of the dated failure journal inside a state directory.
pub fn error_log_dir(state: &StateDir) -> PathBuf {
    state.root().join(ERRORS_DIR)
}
