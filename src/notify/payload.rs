//! The flat failure notification built once per invocation.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use super::author;
use crate::config::model::NotifierConfig;
use crate::git::CommitMetadata;

/// Substituted for any value that could not be determined.
pub const PLACEHOLDER: &str = "unknown";

/// Substituted for a missing commit subject.
pub const NO_TITLE: &str = "(no title)";

/// Everything the alert says about the failed job.
///
/// Every field is non-empty once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationPayload {
    pub repository: String,
    pub branch: String,
    pub commit_hash: String,
    pub commit_author: String,
    pub commit_subject: String,
    pub job_name: String,
    pub run_url: String,
    pub failed_at: String,
}

impl NotificationPayload {
    /// Combines configuration, git metadata (if readable), and the failure time.
    ///
    /// Git output wins over CI variables; either wins over the placeholder.
    pub fn assemble(
        config: &NotifierConfig,
        commit: Option<&CommitMetadata>,
        failed_at: DateTime<Utc>,
    ) -> Self {
        let commit_hash = commit
            .map(|c| c.hash.clone())
            .or_else(|| config.commit_sha.clone());

        let commit_author = commit
            .and_then(CommitMetadata::author)
            .or_else(|| config.ci_commit.author.clone())
            .or_else(|| author::resolve_email(commit, &config.ci_commit));

        let commit_subject = commit
            .and_then(|c| c.subject.clone())
            .or_else(|| config.ci_commit.title.clone());

        Self {
            repository: or_placeholder(config.repository.clone(), PLACEHOLDER),
            branch: or_placeholder(config.branch.clone(), PLACEHOLDER),
            commit_hash: or_placeholder(commit_hash, PLACEHOLDER),
            commit_author: or_placeholder(commit_author, PLACEHOLDER),
            commit_subject: or_placeholder(commit_subject, NO_TITLE),
            job_name: or_placeholder(config.job_name.clone(), PLACEHOLDER),
            run_url: or_placeholder(config.run_url.clone(), PLACEHOLDER),
            failed_at: failed_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    /// Returns the run URL unless it is the placeholder.
    pub fn known_run_url(&self) -> Option<&str> {
        Some(self.run_url.as_str()).filter(|url| *url != PLACEHOLDER)
    }
}

fn or_placeholder(value: Option<String>, placeholder: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => placeholder.to_string(),
    }
}
