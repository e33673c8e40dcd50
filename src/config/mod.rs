//! Configuration resolved from the CI environment.

pub mod loader;
pub mod model;

use std::path::PathBuf;

pub use loader::EnvSource;
pub use model::NotifierConfig;

/// Settings given on the command line, which win over the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Checkout to read commit metadata from.
    pub repo_dir: Option<PathBuf>,
    /// Force dry-run mode.
    pub dry_run: bool,
}

impl Overrides {
    /// Applies the overrides to a loaded configuration.
    pub fn apply(&self, config: &mut NotifierConfig) {
        if let Some(dir) = &self.repo_dir {
            config.repo_dir = dir.clone();
        }
        if self.dry_run {
            config.dry_run = true;
        }
    }
}
