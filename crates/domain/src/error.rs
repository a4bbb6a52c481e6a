//! Domain error types.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Errors raised by the de-registration workflow.
///
/// The HTTP layer translates each variant into one response shape; nothing in
/// here knows about status codes.
#[derive(Debug, Error)]
pub enum DeRegError {
    #[error("De-Registration request not found")]
    NotFound,

    #[error("Permission denied for this request")]
    PermissionDenied,

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("{} identifier(s) not registered", .0.len())]
    NotRegistered(Vec<String>),

    #[error("Persistence failure: {0}")]
    Persistence(String),
}

impl From<sqlx::Error> for DeRegError {
    fn from(err: sqlx::Error) -> Self {
        DeRegError::Persistence(err.to_string())
    }
}

impl From<FieldErrors> for DeRegError {
    fn from(errors: FieldErrors) -> Self {
        DeRegError::Validation(errors)
    }
}

/// Field-level validation errors, keyed by field path (e.g. `devices[0].tac`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Merge errors produced by `validator`, prefixing every field name.
    pub fn extend_validator(&mut self, prefix: &str, errors: &validator::ValidationErrors) {
        for (field, errors) in errors.field_errors() {
            let path = if prefix.is_empty() {
                field.to_string()
            } else {
                format!("{}.{}", prefix, field)
            };
            for e in errors.iter() {
                let message = e
                    .message
                    .clone()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                self.add(path.clone(), message);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .flat_map(|(field, messages)| messages.iter().map(move |m| (field.as_str(), m.as_str())))
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), DeRegError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DeRegError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}
