//! Read-only wrapper around the `git` CLI.

pub mod commit;

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

pub use commit::CommitMetadata;
use crate::error::MetadataError;

/// Something that can describe a commit.
#[cfg_attr(test, mockall::automock)]
pub trait CommitSource {
    /// Reads metadata for `rev` (a hash, ref name, or `HEAD`).
    fn read_commit(&self, rev: &str) -> Result<CommitMetadata, MetadataError>;
}

/// Reads commit metadata by running `git show` in a checkout.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_dir: PathBuf,
}

impl GitCli {
    /// Creates a reader for the checkout at `repo_dir`.
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    /// Returns the checkout directory.
    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    /// Marks the checkout as safe for this invocation only.
    ///
    /// CI containers often run as a different uid than the checkout owner,
    /// which makes git refuse to read the repository.
    fn safe_directory_arg(&self) -> String {
        let dir = std::fs::canonicalize(&self.repo_dir).unwrap_or_else(|_| self.repo_dir.clone());
        format!("safe.directory={}", dir.display())
    }
}

impl CommitSource for GitCli {
    fn read_commit(&self, rev: &str) -> Result<CommitMetadata, MetadataError> {
        if rev.is_empty() || rev.starts_with('-') {
            return Err(MetadataError::Malformed(format!(
                "refusing to pass '{}' to git as a revision",
                rev
            )));
        }

        let output = Command::new("git")
            .arg("-c")
            .arg(self.safe_directory_arg())
            .args(["show", "-s", "--no-color", commit::SHOW_FORMAT, rev])
            .current_dir(&self.repo_dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GIT_PAGER", "cat")
            .output()
            .map_err(|e| MetadataError::SpawnFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(MetadataError::GitFailed {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        commit::parse_show_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Reads commit metadata, logging and swallowing failures.
///
/// An unreadable repository never blocks the notification; the payload
/// falls back to CI variables and placeholders instead.
pub fn collect_commit(source: &dyn CommitSource, rev: &str) -> Option<CommitMetadata> {
    match source.read_commit(rev) {
        Ok(commit) => {
            debug!(hash = %commit.hash, "Read commit metadata");
            Some(commit)
        }
        Err(e) => {
            warn!(rev, error = %e, "Could not read commit metadata; using CI variables");
            None
        }
    }
}
