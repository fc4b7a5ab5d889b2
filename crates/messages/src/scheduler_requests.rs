//! `scheduler_msgs/SchedulerRequests` and its nested messages.

use crate::{DurationMsg, NetworkMessage, UniqueIdMsg};
use rocon_types::{
    Feedback, Identifier, Priority, Reason, Request, RequestError, RequestFeedback, RequestSet,
    Resource, Status,
};
use serde::{Deserialize, Serialize};

/// One topic remapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemapMsg {
    pub remap_from: String,
    pub remap_to: String,
}

/// One capability parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValueMsg {
    pub key: String,
    pub value: String,
}

/// Wire form of a [`Resource`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMsg {
    pub id: UniqueIdMsg,
    /// Older schedulers call this field `rapp`.
    #[serde(default, alias = "rapp")]
    pub capability_name: String,
    /// Empty when no target endpoint was given.
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub remappings: Vec<RemapMsg>,
    #[serde(default)]
    pub parameters: Vec<KeyValueMsg>,
}

/// Wire form of a [`Request`].
///
/// Scheduler feedback may omit every field except `id` and `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMsg {
    pub id: UniqueIdMsg,
    pub status: u8,
    #[serde(default)]
    pub reason: u8,
    #[serde(default)]
    pub problem: String,
    #[serde(default)]
    pub availability: DurationMsg,
    #[serde(default)]
    pub hold_time: DurationMsg,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub resources: Vec<ResourceMsg>,
}

/// A requester's complete request set, or a scheduler's partial feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerRequests {
    /// Always present on requester publishes; feedback may omit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester: Option<UniqueIdMsg>,
    #[serde(default)]
    pub requests: Vec<RequestMsg>,
}

impl NetworkMessage for SchedulerRequests {
    fn message_type_id() -> &'static str {
        "scheduler_msgs/SchedulerRequests"
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Model -> wire
// ═══════════════════════════════════════════════════════════════════════════

impl From<&Resource> for ResourceMsg {
    fn from(resource: &Resource) -> Self {
        Self {
            id: resource.id().into(),
            capability_name: resource.capability_name().to_string(),
            uri: resource.uri().unwrap_or_default().to_string(),
            remappings: resource
                .remappings()
                .iter()
                .map(|r| RemapMsg {
                    remap_from: r.from.clone(),
                    remap_to: r.to.clone(),
                })
                .collect(),
            parameters: resource
                .parameters()
                .iter()
                .map(|p| KeyValueMsg {
                    key: p.key.clone(),
                    value: p.value.clone(),
                })
                .collect(),
        }
    }
}

impl From<&Request> for RequestMsg {
    fn from(request: &Request) -> Self {
        Self {
            id: request.id().into(),
            status: request.status().as_u8(),
            reason: request.reason().as_u8(),
            problem: request.problem().to_string(),
            availability: request.availability().into(),
            hold_time: request.hold_time().into(),
            priority: request.priority().get(),
            resources: request.resources().iter().map(ResourceMsg::from).collect(),
        }
    }
}

impl From<&RequestSet> for SchedulerRequests {
    fn from(set: &RequestSet) -> Self {
        Self {
            requester: Some(set.requester_id().into()),
            requests: set.iter().map(RequestMsg::from).collect(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Wire -> model
// ═══════════════════════════════════════════════════════════════════════════

impl From<&ResourceMsg> for Resource {
    fn from(msg: &ResourceMsg) -> Self {
        let mut resource = Resource::with_id(msg.id.into(), msg.capability_name.clone());
        if !msg.uri.is_empty() {
            resource = resource.with_uri(msg.uri.clone());
        }
        for remap in &msg.remappings {
            resource.add_remapping(remap.remap_from.clone(), remap.remap_to.clone());
        }
        for param in &msg.parameters {
            resource.add_parameter(param.key.clone(), param.value.clone());
        }
        resource
    }
}

impl TryFrom<&RequestMsg> for RequestFeedback {
    type Error = RequestError;

    fn try_from(msg: &RequestMsg) -> Result<Self, Self::Error> {
        Ok(RequestFeedback::new(msg.id.into(), Status::try_from(msg.status)?)
            .with_reason(Reason::try_from(msg.reason)?)
            .with_problem(msg.problem.clone())
            .with_availability(msg.availability.into()))
    }
}

impl TryFrom<&RequestMsg> for Request {
    type Error = RequestError;

    fn try_from(msg: &RequestMsg) -> Result<Self, Self::Error> {
        let feedback = RequestFeedback::try_from(msg)?;
        let resources = msg.resources.iter().map(Resource::from).collect();
        let mut request = Request::with_id(msg.id.into(), resources)?
            .with_priority(Priority(msg.priority))
            .with_hold_time(msg.hold_time.into());
        request.apply_feedback(&feedback);
        Ok(request)
    }
}

impl TryFrom<&SchedulerRequests> for RequestSet {
    type Error = RequestError;

    fn try_from(msg: &SchedulerRequests) -> Result<Self, Self::Error> {
        let requester = msg
            .requester
            .ok_or_else(|| RequestError::InvalidIdentifier("missing requester".to_string()))?;
        let mut set = RequestSet::new(Identifier::from(requester));
        for request in &msg.requests {
            set.add(Request::try_from(request)?)?;
        }
        Ok(set)
    }
}

impl TryFrom<&SchedulerRequests> for Feedback {
    type Error = RequestError;

    fn try_from(msg: &SchedulerRequests) -> Result<Self, Self::Error> {
        Ok(Feedback {
            requester: msg.requester.map(Identifier::from),
            requests: msg
                .requests
                .iter()
                .map(RequestFeedback::try_from)
                .collect::<Result<_, _>>()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocon_test_helpers::{test_request, test_request_set};
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_request_set_wire_roundtrip() {
        let mut set = test_request_set();
        let request = test_request("concert_common_rapps/waiter")
            .with_priority(Priority::HIGH)
            .with_hold_time(Duration::from_secs(60));
        let request_id = request.id();
        let resource_id = request.resources()[0].id();
        set.add(request).unwrap();

        let wire = SchedulerRequests::from(&set);
        let text = serde_json::to_string(&wire).unwrap();
        let decoded: SchedulerRequests = serde_json::from_str(&text).unwrap();
        let restored = RequestSet::try_from(&decoded).unwrap();

        assert_eq!(decoded, wire);
        assert_eq!(restored, set);
        let restored_request = restored.get(&request_id).unwrap();
        assert_eq!(
            restored_request.resources()[0].id().as_bytes(),
            resource_id.as_bytes()
        );
        assert_eq!(
            restored.requester_id().as_bytes(),
            set.requester_id().as_bytes()
        );
    }

    #[test]
    fn test_wire_layout() {
        let mut set = test_request_set();
        let request = test_request("concert_common_rapps/waiter");
        set.add(request.clone()).unwrap();

        let value = serde_json::to_value(SchedulerRequests::from(&set)).unwrap();
        let req = &value["requests"][0];

        assert_eq!(
            value["requester"]["uuid"],
            json!(set.requester_id().to_base64())
        );
        assert_eq!(req["id"]["uuid"], json!(request.id().to_base64()));
        assert_eq!(req["status"], json!(0));
        assert_eq!(req["hold_time"], json!({"secs": 0, "nsecs": 0}));
        assert_eq!(
            req["resources"][0]["capability_name"],
            json!("concert_common_rapps/waiter")
        );
        assert_eq!(req["resources"][0]["uri"], json!("rocon:/pc"));
        assert_eq!(
            req["resources"][0]["remappings"][0],
            json!({"remap_from": "/send_order", "remap_to": "/orders"})
        );
    }

    #[test]
    fn test_decodes_rosbridge_feedback() {
        // Captured from a concert scheduler
        let text = r#"{"requests":[
            {"status":2,"availability":{"secs":0,"nsecs":0},"priority":0,"reason":0,"problem":"",
             "hold_time":{"secs":0,"nsecs":0},"id":{"uuid":"rK2tRopaQ+asCKBzn8FaEg=="},
             "resources":[{"remappings":[{"remap_to":"/ssseeennnddd","remap_from":"/send_order"}],
                           "rapp":"concert_common_rapps/waiter","id":{"uuid":"rjUQrEzfRoCoPIGj3l6ziA=="},
                           "parameters":[],"uri":"rocon:/pc"}]}],
            "requester":{"uuid":"4Yf/op4cSMW0qWjt7dhK2A=="}}"#;

        let msg: SchedulerRequests = serde_json::from_str(text).unwrap();
        let feedback = Feedback::try_from(&msg).unwrap();

        assert_eq!(
            msg.requests[0].resources[0].capability_name,
            "concert_common_rapps/waiter"
        );
        assert_eq!(
            feedback.requests[0].id,
            Identifier::parse("acadad468a5a43e6ac08a0739fc15a12").unwrap()
        );
        assert_eq!(feedback.requests[0].status, Status::Waiting);
        assert!(feedback.requester.is_some());
    }

    #[test]
    fn test_decodes_partial_feedback() {
        let id = Identifier::new();
        let value = json!({
            "requests": [{
                "id": {"uuid": id.as_bytes().to_vec()},
                "status": 6,
                "reason": 3,
                "problem": "no matching resource"
            }]
        });

        let msg: SchedulerRequests = serde_json::from_value(value).unwrap();
        let feedback = Feedback::try_from(&msg).unwrap();

        assert_eq!(feedback.requester, None);
        assert_eq!(
            feedback.requests,
            vec![RequestFeedback::new(id, Status::Closed)
                .with_reason(Reason::Unavailable)
                .with_problem("no matching resource")]
        );
    }

    #[test]
    fn test_rejects_out_of_range_status() {
        let value = json!({
            "requests": [{"id": {"uuid": Identifier::new().to_base64()}, "status": 9}]
        });
        let msg: SchedulerRequests = serde_json::from_value(value).unwrap();

        assert_eq!(
            Feedback::try_from(&msg),
            Err(RequestError::InvalidStatus(9))
        );
    }

    #[test]
    fn test_requires_status() {
        let value = json!({
            "requests": [{
                "id": {"uuid": Identifier::new().to_base64()},
                "reason": 3,
                "problem": "no matching resource"
            }]
        });
        let err = serde_json::from_value::<SchedulerRequests>(value).unwrap_err();
        assert!(err.to_string().contains("status"));
    }

    #[test]
    fn test_rejects_short_uuid() {
        let value = json!({"requests": [{"id": {"uuid": "AQID"}, "status": 2}]});
        assert!(serde_json::from_value::<SchedulerRequests>(value).is_err());
    }

    #[test]
    fn test_message_type_id() {
        assert_eq!(
            SchedulerRequests::message_type_id(),
            "scheduler_msgs/SchedulerRequests"
        );
    }
}
