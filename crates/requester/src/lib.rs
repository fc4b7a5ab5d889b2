//! Requester protocol state machine.
//!
//! This crate provides a synchronous implementation of the requester side of
//! the scheduler protocol that can be driven by any runner.
//!
//! # Architecture
//!
//! The state machine processes events synchronously:
//!
//! - `Event::AllocationRequested` → Create a NEW request, mark it pending, publish the set
//! - `Event::FeedbackReceived` → Merge, diff, reconcile, answer settled callers, republish
//! - `Event::ReleaseRequested` → Cancel, republish, wait for CLOSED
//! - `Event::HeartbeatTimer` → Republish the set so the scheduler sees we are alive
//! - `Event::StatusCheckTimer` → Fallback re-check of waiting callers
//!
//! All I/O is performed by the runner via returned `Action`s.

mod config;
mod state;

pub use config::{RequesterConfig, DEFAULT_SCHEDULER_TOPIC};
pub use state::RequesterState;
