//! Field-level input validation shared by the form, auth, and messaging
//! endpoints.
//!
//! Every check for a request runs before any error is returned, so a client
//! receives all field messages at once as `{ "errors": { field: message } }`.
//! Only the first message per field is kept.

use std::collections::BTreeMap;

use serde::Serialize;

pub const EMAIL_MAX_CHARS: usize = 255;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("validation failed for {} field(s)", .errors.len())]
pub struct FieldErrors {
    errors: BTreeMap<String, String>,
}

impl crate::frame::ErrorCode for FieldErrors {
    fn error_code(&self) -> &'static str {
        "E_VALIDATION"
    }
}

/// Message for an over-long string.
#[must_use]
pub fn max_len_message(max: usize) -> String {
    format!("String must contain at most {max} character(s)")
}

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` for `field` unless the field already failed.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.entry(field.to_string()).or_insert_with(|| message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// # Errors
    ///
    /// Returns `self` when any field failed.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    /// Character-count bounds. Below `min` reports `min_message`; above `max`
    /// reports the standard over-length message.
    pub fn check_length(&mut self, field: &str, value: &str, min: usize, max: usize, min_message: &str) {
        let n = value.chars().count();
        if n < min {
            self.add(field, min_message);
        } else if n > max {
            self.add(field, max_len_message(max));
        }
    }

    pub fn check_required(&mut self, field: &str, value: &str, message: &str) {
        if value.is_empty() {
            self.add(field, message);
        }
    }

    /// Address shape first, then the length cap.
    pub fn check_email(&mut self, field: &str, value: &str, message: &str) {
        if !is_valid_email(value) {
            self.add(field, message);
        } else if value.chars().count() > EMAIL_MAX_CHARS {
            self.add(field, max_len_message(EMAIL_MAX_CHARS));
        }
    }

    pub fn check_one_of(&mut self, field: &str, value: &str, allowed: &[&str], message: &str) {
        if !allowed.contains(&value) {
            self.add(field, message);
        }
    }
}

/// `local@domain.tld` with no whitespace, a single `@`, and a dotted domain
/// whose labels are non-empty.
#[must_use]
pub fn is_valid_email(raw: &str) -> bool {
    if raw.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = raw.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || local.starts_with('.') || local.ends_with('.') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|l| !l.is_empty() && !l.starts_with('-') && !l.ends_with('-'))
        && labels.last().is_some_and(|tld| tld.len() >= 2 && tld.chars().all(char::is_alphabetic))
}

/// Trimmed, lower-cased address, or `None` when it is not a valid email.
#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    if !is_valid_email(&normalized) {
        return None;
    }
    Some(normalized)
}
