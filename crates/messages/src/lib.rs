//! Wire messages for the scheduler request protocol.
//!
//! Messages mirror `scheduler_msgs/SchedulerRequests` as carried over a
//! rosbridge-style JSON transport. Conversions to and from the request model
//! live next to the message definitions.

mod duration;
mod scheduler_requests;
mod unique_id;

pub use duration::DurationMsg;
pub use scheduler_requests::{KeyValueMsg, RemapMsg, RequestMsg, ResourceMsg, SchedulerRequests};
pub use unique_id::UniqueIdMsg;

/// A message that travels over the pub/sub transport.
pub trait NetworkMessage {
    /// Type tag the transport uses to route and decode the message.
    fn message_type_id() -> &'static str;
}
