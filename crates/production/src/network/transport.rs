//! Pub/sub transport collaborator.
//!
//! The requester does not implement a transport. Deployments plug in a
//! rosbridge client or similar; tests use an in-memory bus.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Callback invoked once per inbound message with the decoded payload.
///
/// Handlers must not block: the requester's handler only enqueues an event.
pub type MessageHandler = Box<dyn Fn(Value) + Send + Sync>;

/// Errors reported by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Publish to {channel} failed: {reason}")]
    Publish { channel: String, reason: String },

    #[error("Subscribe to {channel} failed: {reason}")]
    Subscribe { channel: String, reason: String },

    #[error("Transport closed")]
    Closed,
}

/// A reliable, per-channel ordered publish/subscribe medium.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Publish `payload` of type `message_type` on `channel`.
    async fn publish(
        &self,
        channel: &str,
        message_type: &str,
        payload: Value,
    ) -> Result<(), TransportError>;

    /// Deliver every future message on `channel` to `handler`.
    async fn subscribe(
        &self,
        channel: &str,
        message_type: &str,
        handler: MessageHandler,
    ) -> Result<(), TransportError>;
}
