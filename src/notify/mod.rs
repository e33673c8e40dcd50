//! Failure notification payload and Slack webhook delivery.

pub mod author;
pub mod payload;
pub mod slack;

pub use payload::NotificationPayload;
pub use slack::SlackNotifier;
