//! Sanity checks on a loaded configuration.
//!
//! Errors stop the run before anything is sent. Warnings are logged and the
//! alert still goes out.

use std::path::Path;

use regex::Regex;
use reqwest::Url;

use crate::config::model::NotifierConfig;

/// Longest timeout that still makes sense for a CI step.
const MAX_REASONABLE_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// One problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub severity: Severity,
    /// Environment variable the problem comes from.
    pub var: &'static str,
    pub detail: String,
}

impl Issue {
    fn error(var: &'static str, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            var,
            detail: detail.into(),
        }
    }

    fn warning(var: &'static str, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            var,
            detail: detail.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Returns every problem found, errors and warnings mixed in check order.
pub fn validate_config(config: &NotifierConfig) -> Vec<Issue> {
    let mut issues = Vec::new();
    check_webhook(config.webhook_url.expose(), &mut issues);
    check_settings(config, &mut issues);
    check_repo_dir(&config.repo_dir, &mut issues);
    issues
}

/// The URL path is the secret, so details never include the URL.
fn check_webhook(raw: &str, issues: &mut Vec<Issue>) {
    const VAR: &str = "NOTIFY_WEBHOOK_URL";

    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(e) => {
            issues.push(Issue::error(VAR, format!("Webhook URL is not a valid URL: {}", e)));
            return;
        }
    };

    match url.scheme() {
        "https" => {}
        "http" => issues.push(Issue::warning(VAR, "Webhook URL uses plain http")),
        other => issues.push(Issue::error(
            VAR,
            format!("Unsupported webhook URL scheme '{}'", other),
        )),
    }

    if url.host_str().map_or(true, str::is_empty) {
        issues.push(Issue::error(VAR, "Webhook URL has no host"));
    }
}

fn check_settings(config: &NotifierConfig, issues: &mut Vec<Issue>) {
    if let Err(e) = Regex::new(&config.branch_filter) {
        issues.push(Issue::error(
            "NOTIFY_BRANCH_REGEX",
            format!("Branch filter is not a valid regex: {}", e),
        ));
    }

    if config.timeout_secs == 0 {
        issues.push(Issue::error(
            "NOTIFY_TIMEOUT_SECS",
            "Timeout must be at least 1 second",
        ));
    } else if config.timeout_secs > MAX_REASONABLE_TIMEOUT_SECS {
        issues.push(Issue::warning(
            "NOTIFY_TIMEOUT_SECS",
            format!(
                "Timeout of {}s may hold the CI job open long after the failure",
                config.timeout_secs
            ),
        ));
    }

    for (email, id) in &config.mappings.email_to_user_id {
        if !email.contains('@') {
            issues.push(Issue::warning(
                "SLACK_MAPPINGS_JSON",
                format!("Mapping key '{}' does not look like an email", email),
            ));
        }
        if id.trim().is_empty() {
            issues.push(Issue::warning(
                "SLACK_MAPPINGS_JSON",
                format!("Mapping for '{}' has an empty user id", email),
            ));
        }
    }
}

/// Only warns: commit metadata falls back to CI variables.
fn check_repo_dir(repo_dir: &Path, issues: &mut Vec<Issue>) {
    if !repo_dir.exists() {
        issues.push(Issue::warning(
            "CI_PROJECT_DIR",
            format!("Repository directory does not exist: '{}'", repo_dir.display()),
        ));
    } else if !repo_dir.is_dir() {
        issues.push(Issue::warning(
            "CI_PROJECT_DIR",
            format!("Repository path is not a directory: '{}'", repo_dir.display()),
        ));
    }
}
