//! User-supplied title and description for a video.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Punctuation accepted in titles and descriptions besides letters, digits and blanks.
pub const ALLOWED_PUNCTUATION: [char; 10] = ['-', '_', '\'', ',', '.', '!', '&', '(', ')', ':'];

/// A metadata field failed the allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} is invalid: {reason}")]
pub struct InvalidField {
    pub field: &'static str,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
}

impl VideoMetadata {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }

    /// Validate the title, then the description. The first failing field is reported.
    pub fn validate(&self) -> Result<(), InvalidField> {
        ensure_field_safe("title", &self.title)?;
        ensure_field_safe("description", &self.description)
    }
}

/// Check one field against the allow-list.
///
/// Accepts ASCII letters and digits, space, tab and [`ALLOWED_PUNCTUATION`].
/// The value must not be empty. Line breaks are rejected because every value
/// is sent as an HTTP header.
pub fn ensure_field_safe(field: &'static str, value: &str) -> Result<(), InvalidField> {
    if value.is_empty() {
        return Err(InvalidField {
            field,
            reason: "must not be empty".into(),
        });
    }

    if let Some(bad) = value.chars().find(|c| !is_allowed_char(*c)) {
        return Err(InvalidField {
            field,
            reason: format!(
                "character {bad:?} is not allowed; use letters, digits, spaces and - _ ' , . ! & ( ) :"
            ),
        });
    }

    Ok(())
}

fn is_allowed_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, ' ' | '\t') || ALLOWED_PUNCTUATION.contains(&c)
}
