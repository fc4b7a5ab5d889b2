//! Async runtime for the resource requester.
//!
//! [`RequesterClient::spawn`] starts a tokio task that owns a
//! [`RequesterState`](rocon_requester::RequesterState) and drives it with
//! messages from a [`Transport`], timers and caller commands. Callers
//! submit requests and wait for outcomes through the client handle.
//!
//! ```ignore
//! let client = RequesterClient::spawn(transport, RequesterConfig::default());
//! let id = client.request_allocation(resource).await?;
//! match client.await_allocation_outcome(id).await? {
//!     AllocationOutcome::Granted { .. } => { /* use the resource */ }
//!     AllocationOutcome::Closed { reason, .. } => { /* handle refusal */ }
//! }
//! client.release_allocation(id).await?;
//! ```

mod client;
pub mod config;
mod error;
pub mod network;
mod runner;
pub mod telemetry;

pub use client::{RequesterClient, RequesterSnapshot};
pub use config::{load_config, parse_config, ConfigError};
pub use error::ClientError;
pub use network::{CodecError, MessageHandler, Transport, TransportError};
pub use rocon_requester::RequesterConfig;
