//! # Validation Errors
//!
//! Structured validation errors shared across the workspace. The API layer
//! maps these onto HTTP error responses.

use thiserror::Error;

/// A domain validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field was missing or blank.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A field exceeded its maximum stored length.
    #[error("field {field} exceeds maximum length of {max}")]
    FieldTooLong {
        /// Name of the offending field.
        field: String,
        /// Maximum permitted length in characters.
        max: usize,
    },

    /// An email address failed format validation.
    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    /// An unknown role name was supplied.
    #[error("invalid role: {0}")]
    InvalidRole(String),

    /// An unknown status string was read (typically from the database).
    #[error("unknown status value: {0}")]
    UnknownStatus(String),

    /// An unknown credential output format was requested.
    #[error("unknown credential format: {0}")]
    UnknownCredentialFormat(String),
}

/// Validate that a string field is present and non-blank after trimming.
pub fn require_field<'a>(value: &'a str, field: &str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(field.to_string()));
    }
    Ok(trimmed)
}

/// Validate that a field fits within its column width.
pub fn check_length(value: &str, field: &str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::FieldTooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Lightweight email shape check: one `@`, non-empty local part, and a
/// domain containing a dot. Full RFC 5322 validation is the directory
/// service's job; this only catches obvious typos before the network call.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();
    if local.is_empty()
        || domain.is_empty()
        || domain.starts_with('.')
        || domain.ends_with('.')
        || !domain.contains('.')
        || email.contains(char::is_whitespace)
    {
        return Err(ValidationError::InvalidEmail(email.to_string()));
    }
    Ok(())
}
