//! Configuration loading from the CI environment.

use std::collections::HashMap;
use std::path::PathBuf;

use super::model::{
    CiCommitContext, NotifierConfig, SlackMappings, WebhookUrl, DEFAULT_BRANCH_FILTER,
    DEFAULT_TIMEOUT_SECS,
};
use super::Overrides;
use crate::error::ConfigError;
use crate::validation::{validate_config, Severity};

/// Variables that may hold the webhook URL, in priority order.
pub const WEBHOOK_VARS: &[&str] = &["NOTIFY_WEBHOOK_URL", "SLACK_WEBHOOK_URL"];

const REPOSITORY_VARS: &[&str] = &["CI_PROJECT_PATH"];
const BRANCH_VARS: &[&str] = &["CI_COMMIT_REF_NAME", "GITHUB_HEAD_REF", "GITHUB_REF_NAME"];
const COMMIT_VARS: &[&str] = &["CI_COMMIT_SHA", "GITHUB_SHA"];
const JOB_VARS: &[&str] = &["CI_JOB_NAME", "GITHUB_JOB", "GITHUB_WORKFLOW"];
const RUN_URL_VARS: &[&str] = &["CI_JOB_URL", "CI_PIPELINE_URL"];
const REPO_DIR_VARS: &[&str] = &["CI_PROJECT_DIR", "GITHUB_WORKSPACE"];

/// Maximum edit distance for a "did you mean" suggestion.
const SUGGESTION_DISTANCE: usize = 3;

/// Snapshot of environment variables.
///
/// Blank values are treated as unset everywhere.
#[derive(Debug, Clone, Default)]
pub struct EnvSource {
    vars: HashMap<String, String>,
}

impl EnvSource {
    /// Captures the current process environment. Non-UTF-8 entries are skipped.
    pub fn from_process() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self { vars }
    }

    /// Builds a snapshot from explicit pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns the value of a variable as set, or `None` if unset or blank.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Returns the first set variable among `names`.
    pub fn first(&self, names: &[&str]) -> Option<String> {
        names.iter().find_map(|n| self.get(n)).map(str::to_string)
    }

    /// Returns true if the variable exists, even with a blank value.
    fn is_present(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }
}

/// Resolves the notifier configuration from the environment.
pub fn load_from_env(env: &EnvSource) -> Result<NotifierConfig, ConfigError> {
    let webhook_url = env
        .first(WEBHOOK_VARS)
        .map(|url| WebhookUrl::new(url.trim()))
        .ok_or_else(|| ConfigError::MissingWebhookUrl {
            hint: webhook_hint(env),
        })?;

    let timeout_secs = match env.get("NOTIFY_TIMEOUT_SECS") {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            var: "NOTIFY_TIMEOUT_SECS".to_string(),
            message: format!("'{}' is not a whole number of seconds", raw),
        })?,
        None => DEFAULT_TIMEOUT_SECS,
    };

    let mappings = match env.get("SLACK_MAPPINGS_JSON") {
        Some(raw) => serde_json::from_str::<SlackMappings>(raw).unwrap_or_else(|e| {
            tracing::warn!(
                var = "SLACK_MAPPINGS_JSON",
                error = %e,
                "Ignoring unparseable Slack mapping; the alert will carry no mention"
            );
            SlackMappings::default()
        }),
        None => SlackMappings::default(),
    };

    let dry_run = match env.get("NOTIFY_DRY_RUN") {
        Some(raw) => parse_flag(raw.trim()).ok_or_else(|| ConfigError::InvalidValue {
            var: "NOTIFY_DRY_RUN".to_string(),
            message: format!("'{}' is not a boolean", raw),
        })?,
        None => false,
    };

    Ok(NotifierConfig {
        webhook_url,
        repository: resolve_repository(env),
        branch: env.first(BRANCH_VARS),
        commit_sha: env.first(COMMIT_VARS),
        job_name: env.first(JOB_VARS),
        run_url: resolve_run_url(env),
        repo_dir: env
            .first(REPO_DIR_VARS)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
        branch_filter: env
            .get("NOTIFY_BRANCH_REGEX")
            .unwrap_or(DEFAULT_BRANCH_FILTER)
            .to_string(),
        timeout_secs,
        mappings,
        ci_commit: CiCommitContext {
            author: env.get("CI_COMMIT_AUTHOR").map(str::to_string),
            title: env.get("CI_COMMIT_TITLE").map(str::to_string),
            user_email: env.get("GITLAB_USER_EMAIL").map(str::to_string),
        },
        dry_run,
    })
}

/// Loads the configuration, applies command-line overrides, and validates it.
pub fn load_and_validate(
    env: &EnvSource,
    overrides: &Overrides,
) -> Result<NotifierConfig, ConfigError> {
    let mut config = load_from_env(env)?;
    overrides.apply(&mut config);

    let issues = validate_config(&config);
    for issue in &issues {
        match issue.severity {
            Severity::Error => {
                tracing::error!(var = issue.var, detail = %issue.detail, "Invalid configuration")
            }
            Severity::Warning => {
                tracing::warn!(var = issue.var, detail = %issue.detail, "Configuration warning")
            }
        }
    }

    let error_count = issues.iter().filter(|i| i.is_error()).count();
    if error_count > 0 {
        return Err(ConfigError::ValidationFailed { error_count });
    }

    Ok(config)
}

/// GitLab exposes the full path; older setups only have namespace and name.
fn resolve_repository(env: &EnvSource) -> Option<String> {
    env.first(REPOSITORY_VARS)
        .or_else(|| {
            match (env.get("CI_PROJECT_NAMESPACE"), env.get("CI_PROJECT_NAME")) {
                (Some(ns), Some(name)) => Some(format!("{}/{}", ns, name)),
                (None, Some(name)) => Some(name.to_string()),
                _ => None,
            }
        })
        .or_else(|| env.first(&["GITHUB_REPOSITORY"]))
}

/// GitHub Actions has no run URL variable, so it is assembled from its parts.
fn resolve_run_url(env: &EnvSource) -> Option<String> {
    env.first(RUN_URL_VARS).or_else(|| {
        let server = env.get("GITHUB_SERVER_URL")?;
        let repo = env.get("GITHUB_REPOSITORY")?;
        let run_id = env.get("GITHUB_RUN_ID")?;
        Some(format!(
            "{}/{}/actions/runs/{}",
            server.trim_end_matches('/'),
            repo,
            run_id
        ))
    })
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Explains a missing webhook URL: a blank known variable, or a likely typo.
fn webhook_hint(env: &EnvSource) -> String {
    if let Some(blank) = WEBHOOK_VARS.iter().find(|v| env.is_present(v)) {
        return format!("; {} is set but empty", blank);
    }

    env.names()
        .filter_map(|name| {
            WEBHOOK_VARS
                .iter()
                .map(|known| strsim::levenshtein(name, known))
                .min()
                .filter(|d| *d <= SUGGESTION_DISTANCE)
                .map(|d| (d, name))
        })
        .min()
        .map(|(_, name)| format!("; did you mean {}?", name))
        .unwrap_or_default()
}
