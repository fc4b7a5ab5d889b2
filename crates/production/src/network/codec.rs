//! Message encoding and decoding for the pub/sub transport.
//!
//! # Wire Format
//!
//! Messages travel as JSON values in the rosbridge layout:
//!
//! ```text
//! {"requester": {"uuid": "<base64>"}, "requests": [ ... ]}
//! ```
//!
//! # Topic-Based Type Dispatch
//!
//! The message type is the type tag the transport was given on publish or
//! subscribe, not a field in the payload.

use rocon_core::OutboundMessage;
use rocon_messages::SchedulerRequests;
use rocon_types::{Feedback, RequestError};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur during message encoding/decoding.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("JSON encode error: {0}")]
    Encode(String),

    #[error("JSON decode error: {0}")]
    Decode(String),

    #[error("Invalid message content: {0}")]
    Invalid(#[from] RequestError),
}

/// Encode an outbound message to its JSON payload.
pub fn encode_message(message: &OutboundMessage) -> Result<Value, CodecError> {
    match message {
        OutboundMessage::SchedulerRequests(msg) => {
            serde_json::to_value(msg).map_err(|e| CodecError::Encode(e.to_string()))
        }
    }
}

/// Decode a `SchedulerRequests` payload.
pub fn decode_scheduler_requests(payload: &Value) -> Result<SchedulerRequests, CodecError> {
    SchedulerRequests::deserialize(payload).map_err(|e| CodecError::Decode(e.to_string()))
}

/// Decode scheduler feedback into the request model.
///
/// Out-of-range status or reason values reject the whole message.
pub fn decode_feedback(payload: &Value) -> Result<Feedback, CodecError> {
    let msg = decode_scheduler_requests(payload)?;
    Ok(Feedback::try_from(&msg)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocon_test_helpers::{test_request, test_request_set};
    use rocon_types::{Identifier, RequestSet, Status};
    use serde_json::json;

    #[test]
    fn test_encode_then_decode_request_set() {
        let mut set = test_request_set();
        set.add(test_request("concert_common_rapps/waiter")).unwrap();
        let message = OutboundMessage::SchedulerRequests(SchedulerRequests::from(&set));

        let payload = encode_message(&message).unwrap();
        let decoded = decode_scheduler_requests(&payload).unwrap();

        assert_eq!(RequestSet::try_from(&decoded).unwrap(), set);
    }

    #[test]
    fn test_decode_feedback() {
        let id = Identifier::new();
        let payload = json!({"requests": [{"id": {"uuid": id.to_base64()}, "status": 3}]});

        let feedback = decode_feedback(&payload).unwrap();

        assert_eq!(feedback.requests.len(), 1);
        assert_eq!(feedback.requests[0].id, id);
        assert_eq!(feedback.requests[0].status, Status::Granted);
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            decode_feedback(&json!({"requests": "nope"})),
            Err(CodecError::Decode(_))
        ));

        let bad_reason = json!({
            "requests": [{"id": {"uuid": Identifier::new().to_base64()}, "status": 6, "reason": 42}]
        });
        assert!(matches!(
            decode_feedback(&bad_reason),
            Err(CodecError::Invalid(RequestError::InvalidReason(42)))
        ));

        let no_status = json!({"requests": [{"id": {"uuid": Identifier::new().to_base64()}}]});
        assert!(matches!(
            decode_feedback(&no_status),
            Err(CodecError::Decode(_))
        ));
    }
}
