//! Shared fixtures for requester tests.

use rocon_types::{
    Feedback, Identifier, Reason, Request, RequestFeedback, RequestSet, Resource, Status,
};

/// A resource with a uri and one remapping.
pub fn test_resource(capability_name: &str) -> Resource {
    let mut resource = Resource::new(capability_name).with_uri("rocon:/pc");
    resource.add_remapping("/send_order", "/orders");
    resource
}

/// A NEW request holding a single [`test_resource`].
pub fn test_request(capability_name: &str) -> Request {
    Request::new(vec![test_resource(capability_name)])
        .expect("a request with one resource is valid")
}

/// An empty request set for a fresh requester.
pub fn test_request_set() -> RequestSet {
    RequestSet::new(Identifier::new())
}

/// Feedback entry granting `id`.
pub fn granted(id: Identifier) -> RequestFeedback {
    RequestFeedback::new(id, Status::Granted)
}

/// Feedback entry closing `id`.
pub fn closed(id: Identifier, reason: Reason, problem: &str) -> RequestFeedback {
    RequestFeedback::new(id, Status::Closed)
        .with_reason(reason)
        .with_problem(problem)
}

/// Bare feedback message without a requester id.
pub fn feedback(entries: Vec<RequestFeedback>) -> Feedback {
    Feedback::new(entries)
}
