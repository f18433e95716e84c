//! Common error types for the Firewood Bank core.

use thiserror::Error;

use crate::types::EntityKind;

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Stale or malformed envelope (non-monotonic version, missing identifier).
    ///
    /// Never retried; surfaced as a data-integrity error.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Illegal status edge or missing companion field.
    #[error("Invalid {entity_kind} transition {from} -> {to}: {reason}")]
    InvalidTransition {
        /// Workflow entity the transition was attempted on.
        entity_kind: EntityKind,
        /// Status the entity was in.
        from: String,
        /// Requested target status.
        to: String,
        /// Why the edge was rejected.
        reason: String,
    },

    /// The merge resolver could not order two envelopes.
    #[error("Merge ambiguous: {0}")]
    MergeAmbiguous(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Persistence layer failure, already translated by the store.
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build an [`Error::InvalidTransition`].
    pub fn invalid_transition(
        entity_kind: EntityKind,
        from: impl ToString,
        to: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidTransition {
            entity_kind,
            from: from.to_string(),
            to: to.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the caller can correct its input and retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::InvalidTransition { .. } | Error::InvalidInput(_) | Error::NotFound(_)
        )
    }

    /// Short message suitable for showing to an operator.
    ///
    /// This is the boundary adapter for UI code; it never inspects raw
    /// storage error text.
    pub fn user_message(&self) -> String {
        match self {
            Error::InvariantViolation(_) => {
                "This record changed somewhere else. Reload it and try again.".to_string()
            }
            Error::InvalidTransition { to, reason, .. } => {
                format!("Cannot move to '{}': {}", to, reason)
            }
            Error::MergeAmbiguous(_) => {
                "Sync could not decide between two copies of a record.".to_string()
            }
            Error::InvalidInput(msg) => msg.clone(),
            Error::NotFound(what) => format!("{} was not found.", what),
            Error::Serialization(_) | Error::Storage(_) | Error::Io(_) => {
                "The local database could not be read or written.".to_string()
            }
        }
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_display() {
        let err = Error::invalid_transition(
            EntityKind::WorkOrder,
            "completed",
            "scheduled",
            "completed is terminal",
        );
        assert_eq!(
            err.to_string(),
            "Invalid work_order transition completed -> scheduled: completed is terminal"
        );
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_integrity_errors_are_not_recoverable() {
        assert!(!Error::InvariantViolation("stale".into()).is_recoverable());
        assert!(!Error::MergeAmbiguous("tie".into()).is_recoverable());
        assert!(!Error::Storage("disk".into()).is_recoverable());
    }

    #[test]
    fn test_user_message_hides_storage_detail() {
        let err = Error::Storage("database disk image is malformed".into());
        assert!(!err.user_message().contains("malformed"));
    }
}
