//! What the requester sends.

use rocon_messages::{NetworkMessage, SchedulerRequests};

/// A message the state machine wants published. The runner encodes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// Full request set, sent on submit, cancel, feedback ack and heartbeat.
    SchedulerRequests(SchedulerRequests),
}

impl OutboundMessage {
    /// Short name for logs.
    pub fn type_name(&self) -> &'static str {
        match self {
            OutboundMessage::SchedulerRequests(_) => "SchedulerRequests",
        }
    }

    /// Type tag handed to the transport alongside the payload.
    pub fn message_type_id(&self) -> &'static str {
        match self {
            OutboundMessage::SchedulerRequests(_) => SchedulerRequests::message_type_id(),
        }
    }
}
