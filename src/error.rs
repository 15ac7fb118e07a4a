//! Error taxonomy for the party flow.
//!
//! Errors are classified by where they resolve:
//! - Validation: local, field-scoped, blocks submit
//! - Duplicate: remote-confirmed, blocks submit, offers "edit existing"
//! - Lookup: transient, degrades through the fallback cascade first
//! - Submission: server-rejected payload, classified by message content
//!
//! No failure here is fatal to the host: every variant maps to a visible,
//! recoverable form state.

use serde::Serialize;
use thiserror::Error;

use crate::directory::DirectoryError;

/// Severity attached to host-facing error events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// The draft field an error is scoped to, for field-level rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DraftField {
    DisplayName,
    Phone,
    Email,
    TaxId,
    OpeningBalance,
    CreditLimit,
}

impl DraftField {
    pub fn as_str(&self) -> &'static str {
        match self {
            DraftField::DisplayName => "displayName",
            DraftField::Phone => "phone",
            DraftField::Email => "email",
            DraftField::TaxId => "taxId",
            DraftField::OpeningBalance => "openingBalance",
            DraftField::CreditLimit => "creditLimit",
        }
    }
}

impl std::fmt::Display for DraftField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a server-side submission rejection was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionKind {
    DuplicatePhone,
    DuplicateEmail,
    Generic,
}

impl SubmissionKind {
    /// The field a rejection should be rendered against, if any.
    pub fn field(&self) -> Option<DraftField> {
        match self {
            SubmissionKind::DuplicatePhone => Some(DraftField::Phone),
            SubmissionKind::DuplicateEmail => Some(DraftField::Email),
            SubmissionKind::Generic => None,
        }
    }
}

/// Classify a server rejection message by content.
///
/// The directory does not return structured error codes, so the original
/// message text is sniffed for the two rejections the form renders
/// field-scoped. Everything else is generic.
pub fn classify_submission_message(message: &str) -> SubmissionKind {
    let lowered = message.to_lowercase();
    let duplicate = lowered.contains("duplicate")
        || lowered.contains("already exists")
        || lowered.contains("already registered")
        || lowered.contains("already in use");
    if duplicate && (lowered.contains("phone") || lowered.contains("mobile")) {
        SubmissionKind::DuplicatePhone
    } else if duplicate && lowered.contains("email") {
        SubmissionKind::DuplicateEmail
    } else {
        SubmissionKind::Generic
    }
}

/// Errors surfaced by the party flow.
#[derive(Debug, Error)]
pub enum PartyFlowError {
    /// A local pattern check failed. Blocks submit before any network call.
    #[error("{field}: {message}")]
    Validation { field: DraftField, message: String },

    /// The directory confirmed another party already holds this value.
    #[error("{field} already belongs to {existing_party_name}")]
    Duplicate {
        field: DraftField,
        existing_party_id: String,
        existing_party_name: String,
    },

    /// All lookup strategies were exhausted without a result.
    #[error("Directory lookup failed: {0}")]
    Lookup(#[source] DirectoryError),

    /// The server rejected the create/update payload.
    #[error("Submission rejected ({kind:?}): {message}")]
    Submission {
        kind: SubmissionKind,
        message: String,
    },
}

impl PartyFlowError {
    /// Build a submission error from a rejection message, classifying it.
    pub fn submission(message: impl Into<String>) -> Self {
        let message = message.into();
        PartyFlowError::Submission {
            kind: classify_submission_message(&message),
            message,
        }
    }

    /// True when the error must stop a create/update from going out.
    pub fn blocks_submit(&self) -> bool {
        matches!(
            self,
            PartyFlowError::Validation { .. } | PartyFlowError::Duplicate { .. }
        )
    }

    /// The field the error should be rendered against, if any.
    pub fn field(&self) -> Option<DraftField> {
        match self {
            PartyFlowError::Validation { field, .. } => Some(*field),
            PartyFlowError::Duplicate { field, .. } => Some(*field),
            PartyFlowError::Submission { kind, .. } => kind.field(),
            PartyFlowError::Lookup(_) => None,
        }
    }

    /// Severity for the host-facing error event.
    pub fn severity(&self) -> Severity {
        match self {
            // Lookup failures already degraded through every fallback;
            // the user can keep typing, so they rate a warning.
            PartyFlowError::Lookup(_) => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_duplicate_phone() {
        assert_eq!(
            classify_submission_message("Duplicate phone number for party"),
            SubmissionKind::DuplicatePhone
        );
        assert_eq!(
            classify_submission_message("A party with this mobile already exists"),
            SubmissionKind::DuplicatePhone
        );
    }

    #[test]
    fn test_classify_duplicate_email() {
        assert_eq!(
            classify_submission_message("email address already registered"),
            SubmissionKind::DuplicateEmail
        );
    }

    #[test]
    fn test_classify_generic() {
        assert_eq!(
            classify_submission_message("internal server error"),
            SubmissionKind::Generic
        );
        // "phone" without a duplicate marker is not a duplicate rejection
        assert_eq!(
            classify_submission_message("phone field malformed"),
            SubmissionKind::Generic
        );
    }

    #[test]
    fn test_validation_blocks_submit_and_scopes_field() {
        let err = PartyFlowError::Validation {
            field: DraftField::Phone,
            message: "must be 10 digits starting 6-9".to_string(),
        };
        assert!(err.blocks_submit());
        assert_eq!(err.field(), Some(DraftField::Phone));
        assert_eq!(err.severity(), Severity::Error);
    }

    #[test]
    fn test_submission_constructor_classifies() {
        let err = PartyFlowError::submission("duplicate email on record");
        match err {
            PartyFlowError::Submission { kind, .. } => {
                assert_eq!(kind, SubmissionKind::DuplicateEmail)
            }
            other => panic!("expected Submission, got {other:?}"),
        }
        assert!(!PartyFlowError::submission("boom").blocks_submit());
    }

    #[test]
    fn test_duplicate_error_references_holder() {
        let err = PartyFlowError::Duplicate {
            field: DraftField::Phone,
            existing_party_id: "p-1".to_string(),
            existing_party_name: "Gupta Stores".to_string(),
        };
        assert!(err.to_string().contains("Gupta Stores"));
    }
}
