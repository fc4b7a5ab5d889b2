//! Inputs to the requester state machine.

use crate::Ticket;
use rocon_types::{Feedback, Identifier, Priority, Resource};
use std::time::Duration;

/// Events processed by the state machine.
///
/// Caller-originated events carry a [`Ticket`] so that the matching
/// `Emit*` action can be routed back to the waiting caller.
#[derive(Debug, Clone)]
pub enum Event {
    /// The runner is up; subscribe and arm timers.
    Started,

    /// A caller wants a new allocation for these resources.
    AllocationRequested {
        ticket: Ticket,
        resources: Vec<Resource>,
        priority: Priority,
        hold_time: Duration,
    },

    /// A caller waits until the request is granted or closed.
    AllocationOutcomeAwaited {
        ticket: Ticket,
        request_id: Identifier,
    },

    /// A caller releases a request and waits for the scheduler to close it.
    ReleaseRequested {
        ticket: Ticket,
        request_id: Identifier,
    },

    /// Cancel every request without waiting.
    CancelAllRequested,

    /// A caller gave up waiting; forget its ticket.
    WaitAbandoned { ticket: Ticket },

    /// Feedback arrived on the requester's feedback channel.
    FeedbackReceived { feedback: Feedback },

    /// Heartbeat timer fired.
    HeartbeatTimer,

    /// Status check timer fired.
    StatusCheckTimer,
}

impl Event {
    /// Get a human-readable name for this event type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::Started => "Started",
            Event::AllocationRequested { .. } => "AllocationRequested",
            Event::AllocationOutcomeAwaited { .. } => "AllocationOutcomeAwaited",
            Event::ReleaseRequested { .. } => "ReleaseRequested",
            Event::CancelAllRequested => "CancelAllRequested",
            Event::WaitAbandoned { .. } => "WaitAbandoned",
            Event::FeedbackReceived { .. } => "FeedbackReceived",
            Event::HeartbeatTimer => "HeartbeatTimer",
            Event::StatusCheckTimer => "StatusCheckTimer",
        }
    }
}
