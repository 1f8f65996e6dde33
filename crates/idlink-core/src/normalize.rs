//! Boundary normalization for identify requests.
//!
//! The reconciler treats email and phone as opaque matching keys; coercion
//! of numeric phone input and syntactic email validation happen here, before
//! the reconciler is invoked.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

/// Errors produced while normalizing request fields.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("email is not syntactically valid")]
    InvalidEmail,
    #[error("phoneNumber must be a string or an integer")]
    InvalidPhone,
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Syntactic check only: local part, '@', domain with at least one dot.
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap())
}

/// Validates email syntax. The address is otherwise used verbatim as an
/// exact matching key.
pub fn validate_email(email: &str) -> Result<(), NormalizeError> {
    if email_regex().is_match(email) {
        Ok(())
    } else {
        Err(NormalizeError::InvalidEmail)
    }
}

/// Coerces a JSON phone value to its canonical string form.
///
/// Strings pass through untouched; integers format in decimal. `null` maps
/// to `None`. Fractional numbers and other JSON types have no canonical
/// phone form and are rejected.
pub fn coerce_phone(value: &Value) -> Result<Option<String>, NormalizeError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => n
            .as_i64()
            .map(|n| Some(n.to_string()))
            .ok_or(NormalizeError::InvalidPhone),
        _ => Err(NormalizeError::InvalidPhone),
    }
}
