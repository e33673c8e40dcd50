//! CI Failure Notifier - posts a Slack alert when a CI job fails.
//!
//! The notifier reads the failed job's context from CI environment
//! variables, describes the commit with `git show`, and posts one Block Kit
//! message to a Slack incoming webhook.

pub mod cli;
pub mod config;
pub mod error;
pub mod git;
pub mod notify;
pub mod validation;

use std::time::Duration;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::{debug, info};

use crate::cli::Cli;
use crate::config::{EnvSource, NotifierConfig};
use crate::error::{AppError, ConfigError};
use crate::git::{CommitSource, GitCli};
use crate::notify::{author, slack, NotificationPayload, SlackNotifier};

/// What a run ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The webhook accepted the message.
    Delivered { status: u16 },
    /// The branch did not match the filter; nothing was sent.
    Skipped { branch: String },
    /// Dry-run mode; holds the JSON that would have been sent.
    DryRun { body: String },
}

/// Runs the notifier with the provided CLI arguments.
pub async fn run(cli: Cli) -> Result<(), AppError> {
    setup_logging(cli.log_level());

    let env = EnvSource::from_process();
    let config = config::loader::load_and_validate(&env, &cli.overrides())?;
    let git = GitCli::new(&config.repo_dir);
    debug!(repo_dir = %git.repo_dir().display(), "Reading commit metadata");

    match notify_failure(&config, &git, Utc::now()).await? {
        Outcome::DryRun { body } => println!("{}", body),
        Outcome::Skipped { branch } => {
            println!("Branch '{}' does not match NOTIFY_BRANCH_REGEX; skipping.", branch)
        }
        Outcome::Delivered { .. } => {}
    }

    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// Logs go to stderr so dry-run output on stdout stays machine-readable.
fn setup_logging(level: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Ignore the error from a subscriber that is already installed.
    let _ = fmt()
        .with_env_filter(filter)
        .json()
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Builds and delivers the failure notification for one job.
///
/// Makes at most one HTTP request. Unreadable git metadata is not an error.
pub async fn notify_failure(
    config: &NotifierConfig,
    commits: &dyn CommitSource,
    failed_at: DateTime<Utc>,
) -> Result<Outcome, AppError> {
    let branch = config.branch.as_deref().unwrap_or(notify::payload::PLACEHOLDER);
    if !branch_matches(&config.branch_filter, branch)? {
        info!(branch, filter = %config.branch_filter, "Branch filtered out; not notifying");
        return Ok(Outcome::Skipped {
            branch: branch.to_string(),
        });
    }

    let commit = git::collect_commit(commits, config.revision());
    let payload = NotificationPayload::assemble(config, commit.as_ref(), failed_at);

    let email = author::resolve_email(commit.as_ref(), &config.ci_commit);
    let mention = author::mention(&config.mappings, email.as_deref());
    match &email {
        Some(email) => info!(%email, mentioned = mention.is_some(), "Resolved commit author"),
        None => info!("Could not determine author email"),
    }

    let message = slack::render(&payload, mention.as_deref());

    if config.dry_run {
        let body = serde_json::to_string_pretty(&message).map_err(error::DeliveryError::from)?;
        info!("Dry run; not sending");
        return Ok(Outcome::DryRun { body });
    }

    let notifier = SlackNotifier::new(
        config.webhook_url.clone(),
        Duration::from_secs(config.timeout_secs),
    )?;

    info!(
        repository = %payload.repository,
        branch = %payload.branch,
        commit = %payload.commit_hash,
        job = %payload.job_name,
        "Sending failure notification"
    );
    let status = notifier.send(&message).await?;

    Ok(Outcome::Delivered { status })
}

/// Unanchored search, so "main" also matches "main-hotfix".
fn branch_matches(filter: &str, branch: &str) -> Result<bool, ConfigError> {
    let re = Regex::new(filter).map_err(|e| ConfigError::InvalidValue {
        var: "NOTIFY_BRANCH_REGEX".to_string(),
        message: e.to_string(),
    })?;
    Ok(re.is_match(branch))
}
