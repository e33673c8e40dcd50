//! End-to-end delivery tests against a local webhook and real git checkouts.

mod common;

use std::path::Path;

use chrono::Utc;
use serde_json::Value;
use tempfile::TempDir;

use ci_failure_notifier::config::loader::load_and_validate;
use ci_failure_notifier::config::{EnvSource, NotifierConfig, Overrides};
use ci_failure_notifier::error::{AppError, DeliveryError};
use ci_failure_notifier::git::GitCli;
use ci_failure_notifier::{notify_failure, Outcome};

use common::{commit_file, init_git_repo, MockWebhook, SECRET_PATH};

fn config_for(webhook: &str, repo_dir: &Path, extra: &[(&str, &str)]) -> NotifierConfig {
    let mut pairs = vec![
        ("NOTIFY_WEBHOOK_URL".to_string(), webhook.to_string()),
        ("CI_PROJECT_PATH".to_string(), "platform/billing".to_string()),
        ("CI_COMMIT_REF_NAME".to_string(), "feature/JIRA-42_alerts".to_string()),
        ("CI_JOB_NAME".to_string(), "test:unit".to_string()),
        (
            "CI_JOB_URL".to_string(),
            "https://gitlab.example.com/platform/billing/-/jobs/77".to_string(),
        ),
        ("CI_PROJECT_DIR".to_string(), repo_dir.display().to_string()),
    ];
    pairs.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));

    load_and_validate(&EnvSource::from_pairs(pairs), &Overrides::default()).unwrap()
}

async fn send(config: &NotifierConfig) -> Result<Outcome, AppError> {
    notify_failure(config, &GitCli::new(&config.repo_dir), Utc::now()).await
}

#[tokio::test]
async fn test_delivers_one_post_with_commit_metadata() {
    let server = MockWebhook::start(200).await;
    let repo = TempDir::new().unwrap();
    init_git_repo(repo.path());
    commit_file(repo.path(), "README.md", "Initial commit");
    let hash = commit_file(repo.path(), "invoice.rs", "Fix rounding in invoice totals");

    let config = config_for(&server.url, repo.path(), &[]);
    let outcome = send(&config).await.unwrap();

    assert_eq!(outcome, Outcome::Delivered { status: 200 });

    let requests = server.requests();
    assert_eq!(requests.len(), 1);

    let body: Value = serde_json::from_str(&requests[0]).unwrap();
    let fields = &body["blocks"][1]["fields"];
    assert_eq!(fields[1]["text"], "Branch:\nfeature/JIRA-42_alerts");
    assert_eq!(fields[2]["text"], format!("Commit:\n{}", hash).as_str());
    assert_eq!(fields[3]["text"], "*Author:*\nTest User &lt;test@example.com&gt;");
    assert_eq!(
        body["blocks"][2]["text"]["text"],
        "*Commit title:* Fix rounding in invoice totals"
    );
    assert!(requests[0].contains(&hash));
    assert!(requests[0].contains("feature/JIRA-42_alerts"));
}

#[tokio::test]
async fn test_configured_commit_sha_is_described() {
    let server = MockWebhook::start(200).await;
    let repo = TempDir::new().unwrap();
    init_git_repo(repo.path());
    let first = commit_file(repo.path(), "a.txt", "First change");
    commit_file(repo.path(), "b.txt", "Second change");

    let config = config_for(&server.url, repo.path(), &[("CI_COMMIT_SHA", first.as_str())]);
    send(&config).await.unwrap();

    let body: Value = serde_json::from_str(&server.requests()[0]).unwrap();
    assert_eq!(body["blocks"][2]["text"]["text"], "*Commit title:* First change");
    assert!(server.requests()[0].contains(&first));
}

#[tokio::test]
async fn test_non_2xx_response_is_a_delivery_error() {
    let server = MockWebhook::start(500).await;
    let repo = TempDir::new().unwrap();
    init_git_repo(repo.path());
    commit_file(repo.path(), "README.md", "Initial commit");

    let config = config_for(&server.url, repo.path(), &[]);
    let err = send(&config).await.unwrap_err();

    assert_eq!(err.exit_code(), 4);
    assert!(matches!(
        err,
        AppError::Delivery(DeliveryError::Status { status: 500, ref body }) if body == "invalid_payload"
    ));
    // A single attempt, no retries.
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn test_repository_without_commits_sends_placeholders() {
    let server = MockWebhook::start(200).await;
    let repo = TempDir::new().unwrap();
    init_git_repo(repo.path());

    let config = config_for(&server.url, repo.path(), &[]);
    let outcome = send(&config).await.unwrap();
    assert_eq!(outcome, Outcome::Delivered { status: 200 });

    let body: Value = serde_json::from_str(&server.requests()[0]).unwrap();
    let fields = &body["blocks"][1]["fields"];
    assert_eq!(fields[2]["text"], "Commit:\nunknown");
    assert_eq!(fields[3]["text"], "*Author:*\nunknown");
    assert_eq!(body["blocks"][2]["text"]["text"], "*Commit title:* (no title)");
}

#[tokio::test]
async fn test_non_repository_falls_back_to_ci_variables() {
    let server = MockWebhook::start(200).await;
    let dir = TempDir::new().unwrap();
    let sha = "0123abcd0123abcd0123abcd0123abcd0123abcd";

    let config = config_for(
        &server.url,
        dir.path(),
        &[
            ("CI_COMMIT_SHA", sha),
            ("CI_COMMIT_AUTHOR", "Bob Builder <bob@example.com>"),
            ("CI_COMMIT_TITLE", "Bump dependencies"),
        ],
    );
    send(&config).await.unwrap();

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let body: Value = serde_json::from_str(&requests[0]).unwrap();
    let fields = &body["blocks"][1]["fields"];
    assert_eq!(fields[2]["text"], format!("Commit:\n{}", sha).as_str());
    assert_eq!(fields[3]["text"], "*Author:*\nBob Builder &lt;bob@example.com&gt;");
    assert_eq!(body["blocks"][2]["text"]["text"], "*Commit title:* Bump dependencies");
}

#[tokio::test]
async fn test_branch_with_markup_characters_arrives_verbatim() {
    let server = MockWebhook::start(200).await;
    let dir = TempDir::new().unwrap();

    let config = config_for(&server.url, dir.path(), &[("CI_COMMIT_REF_NAME", "fix/a&b<c>")]);
    send(&config).await.unwrap();

    let body: Value = serde_json::from_str(&server.requests()[0]).unwrap();
    assert_eq!(body["blocks"][1]["fields"][1]["type"], "plain_text");
    assert_eq!(body["blocks"][1]["fields"][1]["text"], "Branch:\nfix/a&b<c>");
}

#[tokio::test]
async fn test_refused_connection_does_not_leak_webhook_secret() {
    let url = common::refused_endpoint().await;
    let dir = TempDir::new().unwrap();

    let config = config_for(&url, dir.path(), &[]);
    let err = send(&config).await.unwrap_err();

    assert!(matches!(err, AppError::Delivery(DeliveryError::Http(_))));
    assert!(!err.to_string().contains(SECRET_PATH));
}

#[tokio::test]
async fn test_hanging_endpoint_times_out() {
    let url = common::hanging_endpoint().await;
    let dir = TempDir::new().unwrap();

    let config = config_for(&url, dir.path(), &[("NOTIFY_TIMEOUT_SECS", "1")]);
    let started = std::time::Instant::now();
    let err = send(&config).await.unwrap_err();

    assert!(matches!(err, AppError::Delivery(DeliveryError::Http(ref e)) if e.is_timeout()));
    assert!(started.elapsed() < std::time::Duration::from_secs(10));
}

#[tokio::test]
async fn test_filtered_branch_sends_nothing() {
    let server = MockWebhook::start(200).await;
    let dir = TempDir::new().unwrap();

    let config = config_for(&server.url, dir.path(), &[("NOTIFY_BRANCH_REGEX", "^main$")]);
    let outcome = send(&config).await.unwrap();

    assert_eq!(
        outcome,
        Outcome::Skipped {
            branch: "feature/JIRA-42_alerts".to_string()
        }
    );
    assert!(server.requests().is_empty());
}
