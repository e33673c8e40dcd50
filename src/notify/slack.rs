//! Slack incoming webhook notifications.

use std::time::Duration;

use serde::Serialize;
use tracing::{error, info};

use super::payload::NotificationPayload;
use crate::config::model::WebhookUrl;
use crate::error::DeliveryError;

/// Slack rejects section text longer than this.
const SECTION_TEXT_LIMIT: usize = 3000;

/// Longest response body kept in an error message.
const ERROR_BODY_LIMIT: usize = 512;

/// Sends failure alerts to a Slack incoming webhook.
pub struct SlackNotifier {
    /// Webhook URL.
    webhook_url: WebhookUrl,
    /// HTTP client with the request timeout applied.
    client: reqwest::Client,
}

impl SlackNotifier {
    /// Creates a notifier whose single request gives up after `timeout`.
    pub fn new(webhook_url: WebhookUrl, timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("ci-failure-notifier/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            webhook_url,
            client,
        })
    }

    /// Posts the message once and returns the HTTP status on success.
    pub async fn send(&self, message: &SlackMessage) -> Result<u16, DeliveryError> {
        let response = self
            .client
            .post(self.webhook_url.expose())
            .json(message)
            .send()
            .await
            .map_err(|e| DeliveryError::Http(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(status = %status, body = %text, "Slack webhook failed");
            return Err(DeliveryError::Status {
                status: status.as_u16(),
                body: truncate(text.trim(), ERROR_BODY_LIMIT),
            });
        }

        info!(status = %status, "Slack notification sent");
        Ok(status.as_u16())
    }
}

/// Slack webhook message body.
#[derive(Debug, Serialize)]
pub struct SlackMessage {
    /// Plain fallback shown in notifications and by clients without blocks.
    pub text: String,
    pub blocks: Vec<Block>,
}

/// Block Kit layout block.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header {
        text: TextObject,
    },
    Section {
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<TextObject>,
        #[serde(skip_serializing_if = "Option::is_none")]
        fields: Option<Vec<TextObject>>,
    },
}

/// Block Kit text object.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    PlainText { text: String, emoji: bool },
    Mrkdwn { text: String },
}

impl TextObject {
    fn mrkdwn(text: impl Into<String>) -> Self {
        TextObject::Mrkdwn { text: text.into() }
    }

    /// Text Slack shows as-is, without markup or link parsing.
    fn plain(text: impl Into<String>) -> Self {
        TextObject::PlainText {
            text: text.into(),
            emoji: false,
        }
    }
}

/// Renders the payload as a Slack message.
///
/// `mention` is a preformatted `<@U123>` tag placed ahead of the summary.
/// Branch and commit hash go into plain_text fields so they arrive unescaped.
pub fn render(payload: &NotificationPayload, mention: Option<&str>) -> SlackMessage {
    let link = payload.known_run_url().map(link_target);

    let mut text = format!("A job failed in {}", escape(&payload.repository));
    if let Some(url) = &link {
        text.push_str(&format!(" → <{}>", url));
    }
    if let Some(tag) = mention {
        text = format!("{} {}", tag, text);
    }

    let author = match mention {
        Some(tag) => format!("{} ({})", escape(&payload.commit_author), tag),
        None => escape(&payload.commit_author),
    };

    let mut blocks = vec![
        Block::Header {
            text: TextObject::PlainText {
                text: "Pipeline failed".to_string(),
                emoji: true,
            },
        },
        Block::Section {
            text: None,
            fields: Some(vec![
                TextObject::mrkdwn(format!("*Project:*\n{}", escape(&payload.repository))),
                TextObject::plain(format!("Branch:\n{}", payload.branch)),
                TextObject::plain(format!("Commit:\n{}", payload.commit_hash)),
                TextObject::mrkdwn(format!("*Author:*\n{}", author)),
                TextObject::mrkdwn(format!("*Job:*\n{}", escape(&payload.job_name))),
                TextObject::mrkdwn(format!("*Failed at:*\n{}", payload.failed_at)),
            ]),
        },
        Block::Section {
            text: Some(TextObject::mrkdwn(truncate(
                &format!("*Commit title:* {}", escape(&payload.commit_subject)),
                SECTION_TEXT_LIMIT,
            ))),
            fields: None,
        },
    ];

    if let Some(url) = link {
        blocks.push(Block::Section {
            text: Some(TextObject::mrkdwn(format!("<{}|Open the failed job>", url))),
            fields: None,
        });
    }

    SlackMessage { text, blocks }
}

/// Escapes the three characters Slack treats as control sequences.
fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Percent-encodes the characters that would end a `<url|label>` link early.
fn link_target(url: &str) -> String {
    url.replace('|', "%7C")
        .replace('<', "%3C")
        .replace('>', "%3E")
}

/// Truncates a string to at most `max_chars` characters.
fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
