//! Normalized result of an admin action.
//!
//! Every create/update/delete returns an [`ActionResult`]: either `ok`, or an
//! error carrying an [`ActionErrorKind`] and a human-readable message that the
//! UI can show as-is.

use crate::forms::FieldError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message for a student create against a full class.
pub const CLASS_FULL_MESSAGE: &str = "Class is already full";

/// Fallback when a failure carries no message of its own.
pub const UNEXPECTED_ERROR_MESSAGE: &str = "Unexpected error occurred";

/// Message for failures that are deliberately not translated (deletes).
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong!";

/// Failure taxonomy surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionErrorKind {
    /// The submitted form failed schema validation.
    ValidationFailure,
    /// The target class has no free seat.
    CapacityExceeded,
    /// An update was submitted without the record id.
    MissingIdentifier,
    /// The local store rejected a duplicate value.
    DuplicateField,
    /// The identity provider rejected the account payload.
    ExternalProviderRejected,
    /// The scope policy denied the action.
    NotPermitted,
    /// Anything else.
    Unknown,
}

impl fmt::Display for ActionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionErrorKind::ValidationFailure => "validation_failure",
            ActionErrorKind::CapacityExceeded => "capacity_exceeded",
            ActionErrorKind::MissingIdentifier => "missing_identifier",
            ActionErrorKind::DuplicateField => "duplicate_field",
            ActionErrorKind::ExternalProviderRejected => "external_provider_rejected",
            ActionErrorKind::NotPermitted => "not_permitted",
            ActionErrorKind::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// A translated failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ActionError {
    pub kind: ActionErrorKind,
    pub message: String,
}

impl ActionError {
    pub fn new(kind: ActionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn capacity_exceeded() -> Self {
        Self::new(ActionErrorKind::CapacityExceeded, CLASS_FULL_MESSAGE)
    }

    /// `entity` is the lowercase entity name, e.g. "teacher".
    pub fn missing_identifier(entity: &str) -> Self {
        Self::new(
            ActionErrorKind::MissingIdentifier,
            format!("Missing {} ID", entity),
        )
    }

    pub fn duplicate_field<S: AsRef<str>>(fields: &[S]) -> Self {
        let fields: Vec<&str> = fields.iter().map(|f| f.as_ref()).collect();
        Self::new(
            ActionErrorKind::DuplicateField,
            format!("Duplicate value for field: {}", fields.join(", ")),
        )
    }

    pub fn provider_rejected<S: AsRef<str>>(messages: &[S]) -> Self {
        let joined = messages
            .iter()
            .map(|m| m.as_ref())
            .collect::<Vec<_>>()
            .join(", ");
        if joined.is_empty() {
            return Self::new(
                ActionErrorKind::ExternalProviderRejected,
                UNEXPECTED_ERROR_MESSAGE,
            );
        }
        Self::new(ActionErrorKind::ExternalProviderRejected, joined)
    }

    pub fn not_permitted(reason: impl Into<String>) -> Self {
        Self::new(ActionErrorKind::NotPermitted, reason)
    }

    pub fn validation(errors: &[FieldError]) -> Self {
        let message = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Self::new(ActionErrorKind::ValidationFailure, message)
    }

    /// Unknown failure with its own message, or the fallback when empty.
    pub fn unknown(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            return Self::new(ActionErrorKind::Unknown, UNEXPECTED_ERROR_MESSAGE);
        }
        Self::new(ActionErrorKind::Unknown, message)
    }

    /// Untranslated failure.
    pub fn generic() -> Self {
        Self::new(ActionErrorKind::Unknown, GENERIC_FAILURE_MESSAGE)
    }
}

/// Result of one admin action.
///
/// Serialized as `{"status":"ok"}` or
/// `{"status":"error","kind":"duplicate_field","message":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionResult {
    Ok,
    Error(ActionError),
}

impl ActionResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, ActionResult::Ok)
    }

    pub fn error(&self) -> Option<&ActionError> {
        match self {
            ActionResult::Ok => None,
            ActionResult::Error(e) => Some(e),
        }
    }

    /// Message of the error, if any.
    pub fn message(&self) -> Option<&str> {
        self.error().map(|e| e.message.as_str())
    }
}

impl From<Result<(), ActionError>> for ActionResult {
    fn from(result: Result<(), ActionError>) -> Self {
        match result {
            Ok(()) => ActionResult::Ok,
            Err(e) => ActionResult::Error(e),
        }
    }
}

impl From<ActionError> for ActionResult {
    fn from(error: ActionError) -> Self {
        ActionResult::Error(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_serializes_with_status_tag() {
        let json = serde_json::to_value(ActionResult::Ok).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "ok" }));
    }

    #[test]
    fn test_error_serializes_kind_and_message() {
        let result = ActionResult::from(ActionError::capacity_exceeded());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "status": "error",
                "kind": "capacity_exceeded",
                "message": "Class is already full"
            })
        );
        let back: ActionResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_duplicate_field_joins_targets() {
        let e = ActionError::duplicate_field(&["username", "email"]);
        assert_eq!(e.message, "Duplicate value for field: username, email");
        assert_eq!(e.kind, ActionErrorKind::DuplicateField);
    }

    #[test]
    fn test_provider_rejected_joins_messages() {
        let e = ActionError::provider_rejected(&[
            "That username is taken.",
            "Password has been found in an online data breach.",
        ]);
        assert_eq!(
            e.message,
            "That username is taken., Password has been found in an online data breach."
        );
    }

    #[test]
    fn test_unknown_falls_back_on_empty_message() {
        assert_eq!(ActionError::unknown("").message, UNEXPECTED_ERROR_MESSAGE);
        assert_eq!(ActionError::unknown("boom").message, "boom");
    }

    #[test]
    fn test_missing_identifier_names_entity() {
        assert_eq!(
            ActionError::missing_identifier("student").message,
            "Missing student ID"
        );
    }
}
