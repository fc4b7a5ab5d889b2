//! Errors surfaced to requester clients.

use rocon_types::RequestError;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by [`RequesterClient`](crate::RequesterClient) operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The protocol engine rejected the operation.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// No outcome arrived within the allowed time.
    #[error("No outcome within {0:?}")]
    Timeout(Duration),

    /// The runner task has stopped.
    #[error("Requester has shut down")]
    Shutdown,
}
