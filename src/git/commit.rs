//! Commit metadata read from `git show`.

use crate::error::MetadataError;

/// Pretty format asking git for hash, author name, author email and subject.
///
/// Fields are separated by the ASCII unit separator so subjects may contain
/// any printable character.
pub const SHOW_FORMAT: &str = "--format=%H%x1f%an%x1f%ae%x1f%s";

const FIELD_SEPARATOR: char = '\u{1f}';

/// Hash, author and subject of a single commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMetadata {
    /// Full commit hash.
    pub hash: String,
    /// Author name, if recorded.
    pub author_name: Option<String>,
    /// Author email, if recorded.
    pub author_email: Option<String>,
    /// First line of the commit message, if any.
    pub subject: Option<String>,
}

impl CommitMetadata {
    /// Returns the author as "Name <email>", or whichever part is known.
    pub fn author(&self) -> Option<String> {
        match (&self.author_name, &self.author_email) {
            (Some(name), Some(email)) => Some(format!("{} <{}>", name, email)),
            (Some(name), None) => Some(name.clone()),
            (None, Some(email)) => Some(email.clone()),
            (None, None) => None,
        }
    }
}

/// Parses the output of `git show -s` with [`SHOW_FORMAT`].
pub fn parse_show_output(output: &str) -> Result<CommitMetadata, MetadataError> {
    let line = output.trim_end_matches(&['\n', '\r'][..]);
    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();

    if fields.len() != 4 {
        return Err(MetadataError::Malformed(format!(
            "expected 4 fields, got {}",
            fields.len()
        )));
    }

    let hash = fields[0].trim();
    if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(MetadataError::Malformed(format!(
            "'{}' is not a commit hash",
            hash
        )));
    }

    Ok(CommitMetadata {
        hash: hash.to_string(),
        author_name: non_empty(fields[1]),
        author_email: non_empty(fields[2]),
        subject: non_empty(fields[3]),
    })
}

fn non_empty(field: &str) -> Option<String> {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
