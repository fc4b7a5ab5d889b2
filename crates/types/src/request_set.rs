//! The full collection of requests owned by one requester.

use crate::{Identifier, Request, RequestError, RequestFeedback};
use indexmap::IndexMap;
use tracing::{debug, warn};

/// All requests of one requester, keyed by the rendered request id.
///
/// Insertion order is preserved so that successive publishes list requests
/// in a stable order. Requests are never removed, even once closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSet {
    requester_id: Identifier,
    requests: IndexMap<String, Request>,
}

impl RequestSet {
    /// Create an empty set for the given requester.
    pub fn new(requester_id: Identifier) -> Self {
        Self {
            requester_id,
            requests: IndexMap::new(),
        }
    }

    pub fn requester_id(&self) -> Identifier {
        self.requester_id
    }

    /// Add a request under its rendered id.
    pub fn add(&mut self, request: Request) -> Result<(), RequestError> {
        let key = request.id().render();
        if self.requests.contains_key(&key) {
            return Err(RequestError::DuplicateRequest(key));
        }
        self.requests.insert(key, request);
        Ok(())
    }

    /// Look up a request by id.
    pub fn get(&self, id: &Identifier) -> Option<&Request> {
        self.requests.get(&id.render())
    }

    /// Look up a request by id for mutation.
    pub fn get_mut(&mut self, id: &Identifier) -> Option<&mut Request> {
        self.requests.get_mut(&id.render())
    }

    /// Check if a request is in the set.
    pub fn contains(&self, id: &Identifier) -> bool {
        self.requests.contains_key(&id.render())
    }

    /// Iterate requests in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Request> {
        self.requests.values()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Structural deep copy.
    pub fn snapshot(&self) -> RequestSet {
        self.clone()
    }

    /// Apply scheduler feedback, producing a new set.
    ///
    /// For every known id the scheduler-owned fields are overwritten. Ids this
    /// requester never created are logged and skipped, as are entries that
    /// would move a status backwards (stale echoes of an earlier state).
    /// Merging the same feedback twice yields the same set as merging it once.
    pub fn merge(&self, feedback: &[RequestFeedback]) -> RequestSet {
        let mut merged = self.snapshot();

        for entry in feedback {
            let Some(request) = merged.get_mut(&entry.id) else {
                let err = RequestError::UnknownFeedbackTarget(entry.id.render());
                warn!(requester = %self.requester_id, error = %err, "Ignoring feedback");
                continue;
            };

            if !request.status().can_advance_to(entry.status) {
                debug!(
                    request = %entry.id,
                    current = %request.status(),
                    reported = %entry.status,
                    "Ignoring feedback that would move status backwards"
                );
                continue;
            }

            request.apply_feedback(entry);
        }

        merged
    }

    /// Ids whose scheduler-owned fields differ from `earlier`.
    ///
    /// Requests absent from `earlier` count as changed.
    pub fn changed_since(&self, earlier: &RequestSet) -> Vec<Identifier> {
        self.requests
            .iter()
            .filter(|(key, request)| match earlier.requests.get(*key) {
                Some(before) => before.protocol_state() != request.protocol_state(),
                None => true,
            })
            .map(|(_, request)| request.id())
            .collect()
    }

    /// Cancel every request. Returns the ids whose status changed.
    pub fn cancel_all(&mut self) -> Vec<Identifier> {
        self.requests
            .values_mut()
            .filter_map(|request| request.cancel().then(|| request.id()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Reason, Resource, Status};
    use tracing_test::traced_test;

    fn set_with(n: usize) -> (RequestSet, Vec<Identifier>) {
        let mut set = RequestSet::new(Identifier::new());
        let mut ids = Vec::new();
        for i in 0..n {
            let req = Request::new(vec![Resource::new(format!("rapp/{i}"))]).unwrap();
            ids.push(req.id());
            set.add(req).unwrap();
        }
        (set, ids)
    }

    #[test]
    fn test_add_rejects_duplicates() {
        let (mut set, ids) = set_with(1);
        let dup = Request::with_id(ids[0], vec![Resource::new("other")]).unwrap();

        assert_eq!(
            set.add(dup),
            Err(RequestError::DuplicateRequest(ids[0].render()))
        );
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_keys_match_request_ids() {
        let (set, ids) = set_with(3);
        for (key, request) in &set.requests {
            assert_eq!(key, &request.id().render());
        }
        let order: Vec<Identifier> = set.iter().map(Request::id).collect();
        assert_eq!(order, ids);
    }

    #[test]
    fn test_merge_does_not_mutate_original() {
        let (set, ids) = set_with(2);
        let merged = set.merge(&[RequestFeedback::new(ids[0], Status::Granted)]);

        assert_eq!(set.get(&ids[0]).unwrap().status(), Status::New);
        assert_eq!(merged.get(&ids[0]).unwrap().status(), Status::Granted);
        assert_eq!(merged.get(&ids[1]).unwrap().status(), Status::New);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let (set, ids) = set_with(2);
        let feedback = vec![
            RequestFeedback::new(ids[0], Status::Waiting),
            RequestFeedback::new(ids[1], Status::Closed)
                .with_reason(Reason::Unavailable)
                .with_problem("no matching resource"),
        ];

        let once = set.merge(&feedback);
        let twice = once.merge(&feedback);
        assert_eq!(once, twice);
    }

    #[traced_test]
    #[test]
    fn test_merge_ignores_unknown_ids() {
        let (set, _) = set_with(1);
        let stranger = Identifier::new();

        let merged = set.merge(&[RequestFeedback::new(stranger, Status::Granted)]);

        assert_eq!(merged, set);
        assert!(!merged.contains(&stranger));
        assert!(logs_contain("Feedback for unknown request"));
    }

    #[test]
    fn test_merge_skips_backward_transitions() {
        let (mut set, ids) = set_with(1);
        set.get_mut(&ids[0]).unwrap().cancel();

        let merged = set.merge(&[RequestFeedback::new(ids[0], Status::Granted)]);
        assert_eq!(merged.get(&ids[0]).unwrap().status(), Status::Canceling);

        let merged = merged.merge(&[RequestFeedback::new(ids[0], Status::Closed)]);
        assert_eq!(merged.get(&ids[0]).unwrap().status(), Status::Closed);
    }

    #[test]
    fn test_changed_since_reports_only_changed_ids() {
        let (set, ids) = set_with(3);
        let before = set.snapshot();
        let after = set.merge(&[RequestFeedback::new(ids[1], Status::Granted)]);

        assert_eq!(after.changed_since(&before), vec![ids[1]]);
        assert!(after.changed_since(&after.snapshot()).is_empty());
    }

    #[test]
    fn test_cancel_all_skips_closed_requests() {
        let (set, ids) = set_with(3);
        let mut set = set.merge(&[RequestFeedback::new(ids[2], Status::Closed)]);

        let canceled = set.cancel_all();

        assert_eq!(canceled, vec![ids[0], ids[1]]);
        assert_eq!(set.get(&ids[0]).unwrap().status(), Status::Canceling);
        assert_eq!(set.get(&ids[2]).unwrap().status(), Status::Closed);
        assert_eq!(set.len(), 3);
    }
}
