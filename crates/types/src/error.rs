//! Error types for the request model.

use thiserror::Error;

/// Errors raised by the request model and the protocol engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// Identifier text or bytes could not be parsed.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A request with this id is already in the request set.
    #[error("Duplicate request: {0}")]
    DuplicateRequest(String),

    /// The request id is not owned by this requester.
    #[error("Unknown request: {0}")]
    UnknownRequest(String),

    /// Feedback referenced a request this requester never created.
    #[error("Feedback for unknown request: {0}")]
    UnknownFeedbackTarget(String),

    /// A request must hold at least one resource.
    #[error("Request has no resources")]
    EmptyResources,

    /// Status value outside the protocol range.
    #[error("Invalid status value: {0}")]
    InvalidStatus(u8),

    /// Reason value outside the protocol range.
    #[error("Invalid reason value: {0}")]
    InvalidReason(u8),
}
