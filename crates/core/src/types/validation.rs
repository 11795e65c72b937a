//! Input validation errors for locally authored entities.

use thiserror::Error;

use super::email::EmailError;

/// A draft was rejected before it reached any slice state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required text field was empty after trimming.
    #[error("{field} is required")]
    Required {
        /// Field name as shown to the user.
        field: &'static str,
    },

    /// A text field is shorter than its minimum length (in characters).
    #[error("{field} should have at least {min} characters")]
    TooShort {
        /// Field name as shown to the user.
        field: &'static str,
        /// Minimum number of characters.
        min: usize,
    },

    /// Price is zero or negative.
    #[error("price must be greater than zero")]
    NonPositivePrice,

    /// A URL field did not parse as an absolute URL with a host.
    #[error("{field} is not a valid URL: {reason}")]
    InvalidUrl {
        /// Field name as shown to the user.
        field: &'static str,
        /// Parser message.
        reason: String,
    },

    /// The email address is malformed.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),
}

/// Trim `value` in place and require at least `min` characters.
pub(crate) fn require_min_chars(
    value: &mut String,
    field: &'static str,
    min: usize,
) -> Result<(), ValidationError> {
    trim_in_place(value);
    if value.is_empty() {
        return Err(ValidationError::Required { field });
    }
    if value.chars().count() < min {
        return Err(ValidationError::TooShort { field, min });
    }
    Ok(())
}

/// Trim `value` in place and require it to be non-empty.
pub(crate) fn require_present(value: &mut String, field: &'static str) -> Result<(), ValidationError> {
    require_min_chars(value, field, 1)
}

/// Trim `value` in place and require an absolute URL with a host.
pub(crate) fn require_url(value: &mut String, field: &'static str) -> Result<(), ValidationError> {
    require_present(value, field)?;
    let parsed = url::Url::parse(value).map_err(|e| ValidationError::InvalidUrl {
        field,
        reason: e.to_string(),
    })?;
    if !parsed.has_host() {
        return Err(ValidationError::InvalidUrl {
            field,
            reason: "missing host".to_string(),
        });
    }
    Ok(())
}

fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_owned();
    }
}
