//! Error types for the failure notifier.

use thiserror::Error;

/// Top-level application errors.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),
}

impl AppError {
    /// Process exit code reported to the invoking CI system.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_) => 2,
            AppError::Metadata(_) => 3,
            AppError::Delivery(_) => 4,
        }
    }
}

/// Missing or invalid environment configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// `hint` is empty or starts with "; ".
    #[error("Webhook URL is not set (export NOTIFY_WEBHOOK_URL or SLACK_WEBHOOK_URL){hint}")]
    MissingWebhookUrl { hint: String },

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("Config validation failed with {error_count} error(s)")]
    ValidationFailed { error_count: usize },
}

/// Repository inspection errors.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Failed to run git: {0}")]
    SpawnFailed(String),

    #[error("git failed with exit code {code}: {stderr}")]
    GitFailed { code: i32, stderr: String },

    #[error("Unexpected git output: {0}")]
    Malformed(String),
}

/// Webhook delivery errors.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Webhook returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),
}
