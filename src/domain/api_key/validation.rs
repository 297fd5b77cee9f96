//! API key and scope validation utilities

use thiserror::Error;

/// Errors that can occur during API key ID validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApiKeyValidationError {
    #[error("API key ID cannot be empty")]
    EmptyId,

    #[error("API key ID exceeds maximum length of {0} characters")]
    TooLong(usize),

    #[error("API key ID must start with a letter or number")]
    InvalidStart,

    #[error("API key ID must end with a letter or number")]
    InvalidEnd,

    #[error("API key ID contains invalid character: '{0}'. Only alphanumeric characters and hyphens are allowed")]
    InvalidCharacter(char),

    #[error("API key ID cannot contain consecutive hyphens")]
    ConsecutiveHyphens,
}

/// Errors that can occur while parsing a scope string
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScopeParseError {
    #[error("Scope cannot be empty")]
    Empty,

    #[error("Scope exceeds maximum length of {0} characters")]
    TooLong(usize),

    #[error("Scope contains invalid character: '{0}'. Only lowercase alphanumerics, '_', '-', '.' and a trailing wildcard segment are allowed")]
    InvalidCharacter(char),

    #[error("Scope contains an empty segment")]
    EmptySegment,

    #[error("Wildcard '*' is only valid as the entire scope or as the final segment")]
    MisplacedWildcard,
}

const MAX_API_KEY_ID_LENGTH: usize = 50;
const MAX_SCOPE_LENGTH: usize = 128;

/// Validate an API key ID
///
/// Rules:
/// - Cannot be empty
/// - Maximum 50 characters
/// - Only alphanumeric characters and hyphens
/// - Must start and end with alphanumeric
/// - No consecutive hyphens
pub fn validate_api_key_id(id: &str) -> Result<(), ApiKeyValidationError> {
    if id.is_empty() {
        return Err(ApiKeyValidationError::EmptyId);
    }

    if id.len() > MAX_API_KEY_ID_LENGTH {
        return Err(ApiKeyValidationError::TooLong(MAX_API_KEY_ID_LENGTH));
    }

    let chars: Vec<char> = id.chars().collect();

    if !chars[0].is_ascii_alphanumeric() {
        return Err(ApiKeyValidationError::InvalidStart);
    }

    if !chars[chars.len() - 1].is_ascii_alphanumeric() {
        return Err(ApiKeyValidationError::InvalidEnd);
    }

    let mut prev_hyphen = false;

    for c in &chars {
        if *c == '-' {
            if prev_hyphen {
                return Err(ApiKeyValidationError::ConsecutiveHyphens);
            }
            prev_hyphen = true;
        } else if c.is_ascii_alphanumeric() {
            prev_hyphen = false;
        } else {
            return Err(ApiKeyValidationError::InvalidCharacter(*c));
        }
    }

    Ok(())
}

/// Validate a scope string
///
/// A scope is either the bare wildcard `*`, or a dot-separated path of
/// non-empty segments (`admin.keys.read`). Segments use lowercase ASCII
/// alphanumerics, `_` and `-`. The final segment may be `*` to cover the
/// whole namespace below the prefix (`admin.*`); a wildcard anywhere else
/// is rejected.
pub fn validate_scope(scope: &str) -> Result<(), ScopeParseError> {
    if scope.is_empty() {
        return Err(ScopeParseError::Empty);
    }

    if scope.len() > MAX_SCOPE_LENGTH {
        return Err(ScopeParseError::TooLong(MAX_SCOPE_LENGTH));
    }

    if scope == "*" {
        return Ok(());
    }

    let segments: Vec<&str> = scope.split('.').collect();
    let last = segments.len() - 1;

    for (i, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            return Err(ScopeParseError::EmptySegment);
        }

        if *segment == "*" {
            if i == last {
                continue;
            }
            return Err(ScopeParseError::MisplacedWildcard);
        }

        for c in segment.chars() {
            if c == '*' {
                return Err(ScopeParseError::MisplacedWildcard);
            }
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '_' && c != '-' {
                return Err(ScopeParseError::InvalidCharacter(c));
            }
        }
    }

    Ok(())
}
