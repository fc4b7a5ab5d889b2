//! A single allocation request.

use crate::{Identifier, Priority, Reason, RequestError, Resource, Status};
use std::time::Duration;

/// Scheduler-reported protocol state for one request.
///
/// This is the part of a request that feedback is allowed to overwrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFeedback {
    pub id: Identifier,
    pub status: Status,
    pub reason: Reason,
    pub problem: String,
    pub availability: Duration,
}

impl RequestFeedback {
    /// Feedback moving `id` to `status` with no reason.
    pub fn new(id: Identifier, status: Status) -> Self {
        Self {
            id,
            status,
            reason: Reason::None,
            problem: String::new(),
            availability: Duration::ZERO,
        }
    }

    /// Attach a reason code.
    pub fn with_reason(mut self, reason: Reason) -> Self {
        self.reason = reason;
        self
    }

    /// Attach a diagnostic string.
    pub fn with_problem(mut self, problem: impl Into<String>) -> Self {
        self.problem = problem.into();
        self
    }

    /// Attach the scheduler-assigned availability.
    pub fn with_availability(mut self, availability: Duration) -> Self {
        self.availability = availability;
        self
    }
}

/// A feedback message from the scheduler.
///
/// `requester` is absent when the scheduler sends a bare partial update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feedback {
    pub requester: Option<Identifier>,
    pub requests: Vec<RequestFeedback>,
}

impl Feedback {
    /// Feedback for a set of requests, without a requester id.
    pub fn new(requests: Vec<RequestFeedback>) -> Self {
        Self {
            requester: None,
            requests,
        }
    }
}

/// One allocation unit: a set of resources plus protocol state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    id: Identifier,
    resources: Vec<Resource>,
    status: Status,
    reason: Reason,
    problem: String,
    availability: Duration,
    hold_time: Duration,
    priority: Priority,
}

impl Request {
    /// Create a NEW request with a fresh identifier.
    pub fn new(resources: Vec<Resource>) -> Result<Self, RequestError> {
        Self::with_id(Identifier::new(), resources)
    }

    /// Create a NEW request with a known identifier.
    pub fn with_id(id: Identifier, resources: Vec<Resource>) -> Result<Self, RequestError> {
        if resources.is_empty() {
            return Err(RequestError::EmptyResources);
        }
        Ok(Self {
            id,
            resources,
            status: Status::New,
            reason: Reason::None,
            problem: String::new(),
            availability: Duration::ZERO,
            hold_time: Duration::ZERO,
            priority: Priority::DEFAULT,
        })
    }

    /// Set the requester-declared priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the requester-declared hold time.
    pub fn with_hold_time(mut self, hold_time: Duration) -> Self {
        self.hold_time = hold_time;
        self
    }

    pub fn id(&self) -> Identifier {
        self.id
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn reason(&self) -> Reason {
        self.reason
    }

    pub fn problem(&self) -> &str {
        &self.problem
    }

    pub fn availability(&self) -> Duration {
        self.availability
    }

    pub fn hold_time(&self) -> Duration {
        self.hold_time
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Locally cancel this request.
    ///
    /// Moves any non-closed request to CANCELING. Returns whether the status
    /// changed.
    pub fn cancel(&mut self) -> bool {
        if self.status.is_terminal() || self.status == Status::Canceling {
            return false;
        }
        self.status = Status::Canceling;
        true
    }

    /// Overwrite the scheduler-owned fields.
    ///
    /// No transition check is made here; [`RequestSet::merge`](crate::RequestSet::merge)
    /// decides which feedback is applied.
    pub fn apply_feedback(&mut self, feedback: &RequestFeedback) {
        self.status = feedback.status;
        self.reason = feedback.reason;
        self.problem.clone_from(&feedback.problem);
        self.availability = feedback.availability;
    }

    /// The scheduler-owned fields as feedback.
    pub fn protocol_state(&self) -> RequestFeedback {
        RequestFeedback {
            id: self.id,
            status: self.status,
            reason: self.reason,
            problem: self.problem.clone(),
            availability: self.availability,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> Request {
        Request::new(vec![Resource::new("concert_common_rapps/waiter")]).unwrap()
    }

    #[test]
    fn test_fresh_request_defaults() {
        let req = request();
        assert_eq!(req.status(), Status::New);
        assert_eq!(req.reason(), Reason::None);
        assert_eq!(req.priority(), Priority(0));
        assert_eq!(req.problem(), "");
        assert_eq!(req.availability(), Duration::ZERO);
        assert_eq!(req.hold_time(), Duration::ZERO);
    }

    #[test]
    fn test_empty_resources_rejected() {
        assert_eq!(Request::new(vec![]), Err(RequestError::EmptyResources));
    }

    #[test]
    fn test_cancel_from_every_open_state() {
        for status in &Status::ALL[..6] {
            let mut req = request();
            req.apply_feedback(&RequestFeedback::new(req.id(), *status));
            req.cancel();
            assert_eq!(req.status(), Status::Canceling, "from {status}");
        }
    }

    #[test]
    fn test_cancel_leaves_closed_request_unchanged() {
        let mut req = request();
        req.apply_feedback(
            &RequestFeedback::new(req.id(), Status::Closed).with_reason(Reason::Busy),
        );
        let before = req.clone();

        assert!(!req.cancel());
        assert_eq!(req, before);
    }

    #[test]
    fn test_apply_feedback_overwrites_protocol_fields_only() {
        let mut req = request()
            .with_priority(Priority::HIGH)
            .with_hold_time(Duration::from_secs(30));
        let feedback = RequestFeedback::new(req.id(), Status::Closed)
            .with_reason(Reason::Invalid)
            .with_problem("unknown rapp")
            .with_availability(Duration::from_secs(5));

        req.apply_feedback(&feedback);

        assert_eq!(req.protocol_state(), feedback);
        assert_eq!(req.priority(), Priority::HIGH);
        assert_eq!(req.hold_time(), Duration::from_secs(30));
        assert_eq!(req.resources().len(), 1);
    }
}
