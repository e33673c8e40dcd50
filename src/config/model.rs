//! Configuration data structures.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

/// Default branch filter, matching every branch.
pub const DEFAULT_BRANCH_FILTER: &str = ".*";

/// Default timeout for the webhook request, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Fully resolved notifier settings for one invocation.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Slack incoming webhook to post to.
    pub webhook_url: WebhookUrl,

    /// Repository identifier, e.g. "group/project".
    pub repository: Option<String>,

    /// Branch the failed job ran on.
    pub branch: Option<String>,

    /// Commit to describe. `HEAD` is used when unset.
    pub commit_sha: Option<String>,

    /// Name of the failed job or workflow.
    pub job_name: Option<String>,

    /// Link to the failed run.
    pub run_url: Option<String>,

    /// Checkout to read commit metadata from.
    pub repo_dir: PathBuf,

    /// Regex searched against the branch name; no match means no notification.
    pub branch_filter: String,

    /// Timeout for the webhook request.
    pub timeout_secs: u64,

    /// Optional email to Slack user id mapping used for mentions.
    pub mappings: SlackMappings,

    /// Commit details the CI system exposes, used when git is unreadable.
    pub ci_commit: CiCommitContext,

    /// Print the message instead of sending it.
    pub dry_run: bool,
}

impl NotifierConfig {
    /// Returns the revision to inspect with git.
    pub fn revision(&self) -> &str {
        self.commit_sha.as_deref().unwrap_or("HEAD")
    }
}

/// Webhook URL wrapper that keeps the secret out of debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct WebhookUrl(String);

impl WebhookUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// Returns the full URL, secret path included.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for WebhookUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WebhookUrl(<redacted>)")
    }
}

/// Commit context provided by CI variables rather than git.
#[derive(Debug, Clone, Default)]
pub struct CiCommitContext {
    /// Author as "Name <email>" (`CI_COMMIT_AUTHOR`).
    pub author: Option<String>,
    /// Commit subject line (`CI_COMMIT_TITLE`).
    pub title: Option<String>,
    /// Email of the user who started the pipeline (`GITLAB_USER_EMAIL`).
    pub user_email: Option<String>,
}

/// Parsed `SLACK_MAPPINGS_JSON`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackMappings {
    /// Commit author email to Slack member id.
    #[serde(default)]
    pub email_to_user_id: HashMap<String, String>,
}

impl SlackMappings {
    /// Looks up the Slack member id for an email, ignoring case.
    pub fn user_id_for(&self, email: &str) -> Option<&str> {
        self.email_to_user_id
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(email))
            .map(|(_, id)| id.trim())
            .filter(|id| !id.is_empty())
    }
}
