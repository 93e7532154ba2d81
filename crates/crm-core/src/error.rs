//! Error types for bulk record operations.

use crate::operation::Operation;

/// Errors raised while preparing or sending a batch.
///
/// Per-record rejections reported by the remote store are not errors; they
/// are collected as failures by the reconciler.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BulkError {
    /// Argument rejected before any network activity
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A record lacks the identifier field its operation requires
    #[error("Record at position {position} is missing the '{field}' field required for {operation}")]
    MissingIdentifier {
        operation: Operation,
        field: String,
        position: usize,
    },

    /// A per-run precondition is not satisfied
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network or API-level failure while dispatching
    #[error("Transport error: {0}")]
    Transport(String),
}

impl BulkError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn transport(message: impl std::fmt::Display) -> Self {
        Self::Transport(message.to_string())
    }

    /// True for errors raised by the transport layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
