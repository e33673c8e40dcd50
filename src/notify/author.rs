//! Commit author email resolution and Slack mentions.

use std::sync::OnceLock;

use regex::Regex;

use crate::config::model::{CiCommitContext, SlackMappings};
use crate::git::CommitMetadata;

fn angle_email() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<([^>]+)>").expect("static regex is valid"))
}

/// Extracts the email from a "Name <email>" string.
pub fn parse_email(author: &str) -> Option<String> {
    angle_email()
        .captures(author)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|email| !email.is_empty())
}

/// Determines the author email: git first, then `CI_COMMIT_AUTHOR`, then the
/// user who started the pipeline.
pub fn resolve_email(commit: Option<&CommitMetadata>, ci: &CiCommitContext) -> Option<String> {
    commit
        .and_then(|c| c.author_email.clone())
        .or_else(|| ci.author.as_deref().and_then(parse_email))
        .or_else(|| ci.user_email.clone())
}

/// Returns a Slack mention for the author, if the email is mapped.
pub fn mention(mappings: &SlackMappings, email: Option<&str>) -> Option<String> {
    let id = mappings.user_id_for(email?)?;
    Some(format!("<@{}>", id))
}
