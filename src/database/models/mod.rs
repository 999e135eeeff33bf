use std::collections::HashMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

pub mod bootcamp;
pub mod course;
pub mod review;
pub mod user;

pub use bootcamp::BootcampInput;
pub use course::CourseInput;
pub use review::ReviewInput;
pub use user::{RegisterInput, UserInput};

/// Input rejected by a model's rules. `message` joins every failure in field order.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    pub field_errors: HashMap<String, String>,
}

/// Collects field failures and turns them into one `ValidationError`.
#[derive(Debug, Default)]
pub(crate) struct Validator {
    failures: Vec<(String, String)>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.failures.push((field.to_string(), message.into()));
    }

    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.fail(field, message);
        }
    }

    /// Blank strings count as missing.
    pub fn required<T: Presence>(&mut self, value: &Option<T>, field: &str, message: &str) {
        let present = value.as_ref().map(Presence::is_present).unwrap_or(false);
        self.check(present, field, message);
    }

    pub fn max_len(&mut self, value: &Option<String>, max: usize, field: &str, message: &str) {
        if let Some(v) = value {
            self.check(v.chars().count() <= max, field, message);
        }
    }

    pub fn finish(self) -> Result<(), ValidationError> {
        if self.failures.is_empty() {
            return Ok(());
        }
        let message = self
            .failures
            .iter()
            .map(|(_, m)| m.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Err(ValidationError {
            message,
            field_errors: self.failures.into_iter().collect(),
        })
    }
}

pub(crate) trait Presence {
    fn is_present(&self) -> bool;
}

impl Presence for String {
    fn is_present(&self) -> bool {
        !self.trim().is_empty()
    }
}

impl Presence for f64 {
    fn is_present(&self) -> bool {
        self.is_finite()
    }
}

impl<T> Presence for Vec<T> {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !email.chars().any(char::is_whitespace)
        && domain.split('.').count() >= 2
        && domain.split('.').all(|part| !part.is_empty())
}

pub(crate) fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

/// Accepts `"8"` or `8` and keeps the value as a string.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Null) | None => None,
        Some(other) => {
            return Err(serde::de::Error::custom(format!("expected string or number, got {}", other)));
        }
    })
}
