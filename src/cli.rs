use carstereo_enum::config::STATE_DIR_ENV;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "carstereo-enum")]
#[command(version)]
#[command(about = "Number, sanitize and prune music folders on car stereo media")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding the profile list, catalogs and failure journal
    #[arg(long = "state-dir", env = STATE_DIR_ENV, global = true)]
    pub state_dir: Option<PathBuf>,

    /// Profile to act on (defaults to the default profile)
    #[arg(long, short = 'p', global = true)]
    pub profile: Option<String>,

    /// Emit one JSON object per line instead of text
    #[arg(long, default_value_t = false, global = true)]
    pub json: bool,

    /// Only print warnings, errors and requested listings
    #[arg(long, short = 'q', default_value_t = false, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Show debug output and library logs
    #[arg(long, short = 'v', default_value_t = false, global = true)]
    pub verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Output settings derived from CLI flags
#[derive(Clone, Debug)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub quiet: bool,
    pub verbose: bool,
}

impl OutputConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            format: if cli.json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            },
            quiet: cli.quiet,
            verbose: cli.verbose,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Rescan the media root, replacing the catalog and all marks
    Scan,
    /// List folders with track and mark counts
    Folders,
    /// List the numbered tracks of a folder
    Tracks { folder: String },
    /// Look up a track by its number
    Find { folder: String, ordinal: usize },
    /// Toggle the deletion mark of a track by its number
    Mark { folder: String, ordinal: usize },
    /// Delete every marked file
    Commit,
    /// Show the failure journal
    Errors {
        /// Delete the whole journal
        #[arg(long, default_value_t = false)]
        clear: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProfileAction {
    /// List profiles
    List,
    /// Create a profile and make it the default
    Create { name: String, path: PathBuf },
    /// Delete a profile and its catalog
    Delete { name: String },
    /// Make a profile the default and load or build its catalog
    Use { name: String },
    /// Switch the search-by-number view on or off
    SearchMode { mode: Toggle },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn enabled(self) -> bool {
        self == Toggle::On
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mark() {
        let cli = Cli::try_parse_from(["carstereo-enum", "mark", "Road Trip", "2"]).unwrap();
        match cli.command {
            Commands::Mark { folder, ordinal } => {
                assert_eq!(folder, "Road Trip");
                assert_eq!(ordinal, 2);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "carstereo-enum",
            "folders",
            "--json",
            "--profile",
            "Car",
            "--state-dir",
            "/tmp/state",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.profile.as_deref(), Some("Car"));
        assert_eq!(cli.state_dir, Some(PathBuf::from("/tmp/state")));
        assert_eq!(OutputConfig::from_cli(&cli).format, OutputFormat::Json);
    }

    #[test]
    fn test_search_mode_values() {
        let cli = Cli::try_parse_from(["carstereo-enum", "profile", "search-mode", "on"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Profile {
                action: ProfileAction::SearchMode { mode: Toggle::On }
            }
        ));
        assert!(Cli::try_parse_from(["carstereo-enum", "profile", "search-mode", "maybe"]).is_err());
    }

    #[test]
    fn test_state_dir_flag_parsed_once() {
        let cli = Cli::try_parse_from(["carstereo-enum", "scan", "--state-dir", "/tmp/a"]).unwrap();
        assert_eq!(
            carstereo_enum::config::resolve_state_dir(cli.state_dir.as_deref()),
            PathBuf::from("/tmp/a")
        );
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["carstereo-enum", "commit", "-q", "-v"]).is_err());
    }

    #[test]
    fn test_ordinal_must_be_number() {
        assert!(Cli::try_parse_from(["carstereo-enum", "find", "Road Trip", "two"]).is_err());
    }
}
