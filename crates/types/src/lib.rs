//! Core types for scheduler resource requests.
//!
//! A requester asks a remote scheduler for capabilities ([`Resource`]s),
//! grouped into [`Request`]s that live in the requester's [`RequestSet`].
//! Every request carries a [`Status`] that the scheduler drives forward and
//! the requester can only override by canceling.

mod error;
mod identifier;
mod outcome;
mod request;
mod request_set;
mod resource;
mod status;

pub use error::RequestError;
pub use identifier::Identifier;
pub use outcome::{AllocationOutcome, ReleaseOutcome};
pub use request::{Feedback, Request, RequestFeedback};
pub use request_set::RequestSet;
pub use resource::{Parameter, Remapping, Resource};
pub use status::{Priority, Reason, Status};
