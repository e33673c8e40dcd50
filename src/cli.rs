//! Command-line interface definitions.

use clap::Parser;
use std::path::PathBuf;

use crate::config::Overrides;

/// Posts a Slack alert with commit context when a CI job fails.
///
/// Configuration comes from the environment; no arguments are required.
#[derive(Parser, Debug)]
#[command(name = "notify-on-failure", version, about, long_about = None)]
pub struct Cli {
    /// Repository checkout to read commit metadata from (default: $CI_PROJECT_DIR or ".").
    #[arg(long)]
    pub repo_dir: Option<PathBuf>,

    /// Print the Slack message as JSON instead of sending it.
    #[arg(long, default_value = "false")]
    pub dry_run: bool,

    /// Increase logging verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Returns the log level based on verbosity flags.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Settings that take precedence over the environment.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            repo_dir: self.repo_dir.clone(),
            dry_run: self.dry_run,
        }
    }
}
