/// Input validators
///
/// Email addresses are checked before they are used as an outbound
/// recipient or as a verification-code key.

use regex::Regex;
use lazy_static::lazy_static;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;   // Minimum valid email length
const MAX_PURPOSE_LENGTH: usize = 32;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();

    static ref PURPOSE_REGEX: Regex = Regex::new(r"^[a-z][a-z_-]*$").unwrap();
}

/// Validates an email address and returns it trimmed
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }

    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email".to_string(), MIN_EMAIL_LENGTH));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Verification purposes become part of a store key, so only short
/// lowercase words are accepted (`signup`, `password-reset`, ...)
pub fn is_valid_purpose(purpose: &str) -> Result<String, ValidationError> {
    let trimmed = purpose.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("purpose".to_string()));
    }

    if trimmed.len() > MAX_PURPOSE_LENGTH {
        return Err(ValidationError::TooLong("purpose".to_string(), MAX_PURPOSE_LENGTH));
    }

    if !PURPOSE_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("purpose".to_string()));
    }

    Ok(trimmed.to_string())
}
