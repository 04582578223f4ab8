//! Input validation for create requests.
//!
//! # Invariants
//! - Validation never mutates input; stored values are exactly what callers
//!   passed (no trimming, no case folding).
//! - Length limits are counted in Unicode scalar values.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

pub const USERNAME_MAX_CHARS: usize = 50;
pub const EMAIL_MAX_CHARS: usize = 100;

// Dotted domain required, as `user@localhost` is rejected by most
// address validators too.
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63}$",
    )
    .expect("valid email regex")
});

/// Malformed create-request input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("username cannot be empty")]
    EmptyUsername,
    #[error("username is {actual} characters long; max is {max}")]
    UsernameTooLong { max: usize, actual: usize },
    #[error("email cannot be empty")]
    EmptyEmail,
    #[error("email is {actual} characters long; max is {max}")]
    EmailTooLong { max: usize, actual: usize },
    #[error("invalid email address: `{0}`")]
    InvalidEmail(String),
    #[error("message text cannot be empty")]
    EmptyMessageText,
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.trim().is_empty() {
        return Err(ValidationError::EmptyUsername);
    }
    let actual = username.chars().count();
    if actual > USERNAME_MAX_CHARS {
        return Err(ValidationError::UsernameTooLong {
            max: USERNAME_MAX_CHARS,
            actual,
        });
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.trim().is_empty() {
        return Err(ValidationError::EmptyEmail);
    }
    let actual = email.chars().count();
    if actual > EMAIL_MAX_CHARS {
        return Err(ValidationError::EmailTooLong {
            max: EMAIL_MAX_CHARS,
            actual,
        });
    }
    if !EMAIL_RE.is_match(email) {
        return Err(ValidationError::InvalidEmail(email.to_string()));
    }
    Ok(())
}

/// Only the empty string is rejected; whitespace is valid message content.
pub fn validate_message_text(text: &str) -> Result<(), ValidationError> {
    if text.is_empty() {
        return Err(ValidationError::EmptyMessageText);
    }
    Ok(())
}
