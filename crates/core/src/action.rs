//! Outputs of the requester state machine.

use crate::{OutboundMessage, Ticket, TimerId};
use rocon_types::{AllocationOutcome, Identifier, ReleaseOutcome, RequestError};
use std::time::Duration;

/// Actions for the runner to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Register a handler for inbound messages on a channel.
    Subscribe {
        channel: String,
        message_type: &'static str,
    },

    /// Publish a message. Fire-and-forget: the runner logs failures.
    Publish {
        channel: String,
        message: OutboundMessage,
    },

    /// Schedule a timer event after `duration`.
    SetTimer { id: TimerId, duration: Duration },

    /// Answer an [`Event::AllocationRequested`](crate::Event::AllocationRequested).
    EmitAllocationSubmitted {
        ticket: Ticket,
        result: Result<Identifier, RequestError>,
    },

    /// Answer an [`Event::AllocationOutcomeAwaited`](crate::Event::AllocationOutcomeAwaited).
    EmitAllocationOutcome {
        ticket: Ticket,
        result: Result<AllocationOutcome, RequestError>,
    },

    /// Answer an [`Event::ReleaseRequested`](crate::Event::ReleaseRequested).
    EmitReleaseOutcome {
        ticket: Ticket,
        result: Result<ReleaseOutcome, RequestError>,
    },
}

impl Action {
    /// Check if this action publishes a message.
    pub fn is_publish(&self) -> bool {
        matches!(self, Action::Publish { .. })
    }
}
