//! Requester state machine.

use crate::RequesterConfig;
use rocon_core::{Action, Event, OutboundMessage, StateMachine, Ticket, TimerId};
use rocon_messages::{NetworkMessage, SchedulerRequests};
use rocon_types::{
    AllocationOutcome, Feedback, Identifier, Priority, ReleaseOutcome, Request, RequestError,
    RequestSet, Resource, Status,
};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Requester side of the scheduler protocol.
///
/// Owns the request set and two index sets over it:
///
/// - `pending`: submitted, outcome not yet known
/// - `allocated`: granted and claimed by a caller, not yet closed
///
/// Callers waiting on an outcome are recorded by [`Ticket`] and answered with
/// `Emit*` actions as soon as reconciliation settles their request.
pub struct RequesterState {
    config: RequesterConfig,

    /// Every request this requester ever created.
    requests: RequestSet,

    /// Requests awaiting a granted/closed outcome.
    pending: BTreeSet<Identifier>,

    /// Requests granted and not yet closed.
    allocated: BTreeSet<Identifier>,

    /// Callers waiting for an allocation outcome.
    allocation_waiters: BTreeMap<Ticket, Identifier>,

    /// Callers waiting for a release to be confirmed.
    release_waiters: BTreeMap<Ticket, Identifier>,

    now: Duration,
}

impl RequesterState {
    /// Create a requester with a fresh identity.
    pub fn new(config: RequesterConfig) -> Self {
        Self::with_id(Identifier::new(), config)
    }

    /// Create a requester with a known identity.
    pub fn with_id(requester_id: Identifier, config: RequesterConfig) -> Self {
        Self {
            config,
            requests: RequestSet::new(requester_id),
            pending: BTreeSet::new(),
            allocated: BTreeSet::new(),
            allocation_waiters: BTreeMap::new(),
            release_waiters: BTreeMap::new(),
            now: Duration::ZERO,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn requester_id(&self) -> Identifier {
        self.requests.requester_id()
    }

    pub fn config(&self) -> &RequesterConfig {
        &self.config
    }

    /// Channel the scheduler sends this requester's feedback on.
    pub fn feedback_topic(&self) -> String {
        self.config.feedback_topic(self.requester_id())
    }

    pub fn requests(&self) -> &RequestSet {
        &self.requests
    }

    pub fn pending(&self) -> &BTreeSet<Identifier> {
        &self.pending
    }

    pub fn allocated(&self) -> &BTreeSet<Identifier> {
        &self.allocated
    }

    /// Number of callers still waiting on an outcome or release.
    pub fn waiter_count(&self) -> usize {
        self.allocation_waiters.len() + self.release_waiters.len()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Operations
    // ═══════════════════════════════════════════════════════════════════════════

    /// Subscribe to feedback and arm the periodic timers.
    pub fn on_started(&mut self) -> Vec<Action> {
        info!(
            requester = %self.requester_id(),
            feedback_topic = %self.feedback_topic(),
            "Requester started"
        );

        let mut actions = vec![Action::Subscribe {
            channel: self.feedback_topic(),
            message_type: SchedulerRequests::message_type_id(),
        }];
        if let Some(interval) = self.config.heartbeat_interval() {
            actions.push(Action::SetTimer {
                id: TimerId::Heartbeat,
                duration: interval,
            });
        }
        actions.push(Action::SetTimer {
            id: TimerId::StatusCheck,
            duration: self.config.status_check_interval,
        });
        actions
    }

    /// Add a NEW request, mark it pending and publish the request set.
    pub fn submit_request(&mut self, request: Request) -> Result<Vec<Action>, RequestError> {
        let request_id = request.id();
        self.requests.add(request)?;
        self.pending.insert(request_id);

        debug!(
            request = %request_id,
            total = self.requests.len(),
            pending = self.pending.len(),
            "Submitted allocation request"
        );

        Ok(vec![self.publish_requests()])
    }

    /// Build a request for `resources` and submit it on behalf of `ticket`.
    pub fn on_allocation_requested(
        &mut self,
        ticket: Ticket,
        resources: Vec<Resource>,
        priority: Priority,
        hold_time: Duration,
    ) -> Vec<Action> {
        let submitted = Request::new(resources).and_then(|request| {
            let request_id = request.id();
            let request = request.with_priority(priority).with_hold_time(hold_time);
            self.submit_request(request).map(|actions| (request_id, actions))
        });

        match submitted {
            Ok((request_id, mut actions)) => {
                actions.push(Action::EmitAllocationSubmitted {
                    ticket,
                    result: Ok(request_id),
                });
                actions
            }
            Err(err) => {
                warn!(%ticket, error = %err, "Allocation request rejected");
                vec![Action::EmitAllocationSubmitted {
                    ticket,
                    result: Err(err),
                }]
            }
        }
    }

    /// Wait for `request_id` to leave `pending`.
    ///
    /// Resolves immediately when the outcome is already known.
    pub fn on_allocation_outcome_awaited(
        &mut self,
        ticket: Ticket,
        request_id: Identifier,
    ) -> Vec<Action> {
        if !self.requests.contains(&request_id) {
            return vec![Action::EmitAllocationOutcome {
                ticket,
                result: Err(RequestError::UnknownRequest(request_id.render())),
            }];
        }

        self.allocation_waiters.insert(ticket, request_id);
        self.resolve_waiters()
    }

    /// Cancel `request_id`, republish, and wait for the scheduler to close it.
    pub fn on_release_requested(&mut self, ticket: Ticket, request_id: Identifier) -> Vec<Action> {
        let Some(request) = self.requests.get_mut(&request_id) else {
            return vec![Action::EmitReleaseOutcome {
                ticket,
                result: Err(RequestError::UnknownRequest(request_id.render())),
            }];
        };

        let mut actions = Vec::new();
        if request.cancel() {
            debug!(request = %request_id, "Releasing request");
            actions.push(self.publish_requests());
        }

        self.release_waiters.insert(ticket, request_id);
        actions.extend(self.resolve_waiters());
        actions
    }

    /// Cancel every request and republish. Does not wait.
    pub fn on_cancel_all_requested(&mut self) -> Vec<Action> {
        let canceled = self.requests.cancel_all();
        info!(canceled = canceled.len(), "Canceling all requests");
        vec![self.publish_requests()]
    }

    /// Forget a caller that stopped waiting.
    pub fn on_wait_abandoned(&mut self, ticket: Ticket) -> Vec<Action> {
        let removed = self.allocation_waiters.remove(&ticket).is_some()
            | self.release_waiters.remove(&ticket).is_some();
        if removed {
            debug!(%ticket, "Caller stopped waiting");
        }
        vec![]
    }

    /// Merge scheduler feedback.
    ///
    /// When the merge changes any request, the index sets are reconciled,
    /// settled callers are answered, and the request set is republished to
    /// acknowledge the new state.
    pub fn on_feedback(&mut self, feedback: Feedback) -> Vec<Action> {
        if let Some(sender) = feedback.requester {
            if sender != self.requester_id() {
                warn!(
                    requester = %self.requester_id(),
                    addressed_to = %sender,
                    "Ignoring feedback addressed to another requester"
                );
                return vec![];
            }
        }

        let before = self.requests.snapshot();
        let merged = before.merge(&feedback.requests);
        let changed = merged.changed_since(&before);
        if changed.is_empty() {
            debug!(
                entries = feedback.requests.len(),
                "Feedback changed nothing"
            );
            return vec![];
        }

        for id in &changed {
            if let Some(request) = merged.get(id) {
                debug!(
                    request = %id,
                    status = %request.status(),
                    reason = %request.reason(),
                    "Request updated by scheduler"
                );
            }
        }

        self.requests = merged;
        self.reconcile();

        let mut actions = vec![self.publish_requests()];
        actions.extend(self.resolve_waiters());
        actions
    }

    /// Republish as a liveness signal and re-arm.
    pub fn on_heartbeat_timer(&mut self) -> Vec<Action> {
        let mut actions = vec![self.publish_requests()];
        if let Some(interval) = self.config.heartbeat_interval() {
            actions.push(Action::SetTimer {
                id: TimerId::Heartbeat,
                duration: interval,
            });
        }
        actions
    }

    /// Re-check waiting callers and re-arm.
    pub fn on_status_check_timer(&mut self) -> Vec<Action> {
        self.reconcile();
        let mut actions = self.resolve_waiters();
        actions.push(Action::SetTimer {
            id: TimerId::StatusCheck,
            duration: self.config.status_check_interval,
        });
        actions
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Internals
    // ═══════════════════════════════════════════════════════════════════════════

    fn publish_requests(&self) -> Action {
        Action::Publish {
            channel: self.config.scheduler_topic.clone(),
            message: OutboundMessage::SchedulerRequests(SchedulerRequests::from(&self.requests)),
        }
    }

    /// Drop settled requests from the index sets.
    ///
    /// GRANTED leaves `pending`; CLOSED leaves both `pending` and `allocated`.
    fn reconcile(&mut self) {
        for request in self.requests.iter() {
            let id = request.id();
            match request.status() {
                Status::Granted => {
                    if self.pending.remove(&id) {
                        info!(request = %id, "Request granted");
                    }
                }
                Status::Closed => {
                    let was_pending = self.pending.remove(&id);
                    let was_allocated = self.allocated.remove(&id);
                    if was_pending || was_allocated {
                        info!(
                            request = %id,
                            reason = %request.reason(),
                            problem = request.problem(),
                            "Request closed"
                        );
                    }
                }
                _ => {}
            }
        }
    }

    /// Answer every caller whose condition now holds.
    fn resolve_waiters(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();

        let waiting: Vec<(Ticket, Identifier)> = self
            .allocation_waiters
            .iter()
            .map(|(t, id)| (*t, *id))
            .collect();
        for (ticket, request_id) in waiting {
            if let Some(outcome) = self.allocation_outcome(request_id) {
                self.allocation_waiters.remove(&ticket);
                actions.push(Action::EmitAllocationOutcome {
                    ticket,
                    result: Ok(outcome),
                });
            }
        }

        let waiting: Vec<(Ticket, Identifier)> = self
            .release_waiters
            .iter()
            .map(|(t, id)| (*t, *id))
            .collect();
        for (ticket, request_id) in waiting {
            if let Some(outcome) = self.release_outcome(request_id) {
                self.release_waiters.remove(&ticket);
                actions.push(Action::EmitReleaseOutcome {
                    ticket,
                    result: Ok(outcome),
                });
            }
        }

        actions
    }

    /// Outcome for a request that has left `pending`.
    ///
    /// A granted request is claimed into `allocated` here. Requests that left
    /// `pending` but are neither GRANTED nor CLOSED (granted, then preempted
    /// or canceled before anyone asked) stay unresolved until they close.
    fn allocation_outcome(&mut self, request_id: Identifier) -> Option<AllocationOutcome> {
        if self.pending.contains(&request_id) {
            return None;
        }
        let request = self.requests.get(&request_id)?;
        match request.status() {
            Status::Granted => {
                self.allocated.insert(request_id);
                Some(AllocationOutcome::Granted { request_id })
            }
            Status::Closed => Some(AllocationOutcome::Closed {
                request_id,
                reason: request.reason(),
                problem: request.problem().to_string(),
            }),
            _ => None,
        }
    }

    /// Outcome for a released request once the scheduler closed it.
    fn release_outcome(&self, request_id: Identifier) -> Option<ReleaseOutcome> {
        let request = self.requests.get(&request_id)?;
        if request.status() == Status::Closed && !self.allocated.contains(&request_id) {
            Some(ReleaseOutcome {
                request_id,
                reason: request.reason(),
            })
        } else {
            None
        }
    }
}

impl StateMachine for RequesterState {
    fn handle(&mut self, event: Event) -> Vec<Action> {
        match event {
            Event::Started => self.on_started(),
            Event::AllocationRequested {
                ticket,
                resources,
                priority,
                hold_time,
            } => self.on_allocation_requested(ticket, resources, priority, hold_time),
            Event::AllocationOutcomeAwaited { ticket, request_id } => {
                self.on_allocation_outcome_awaited(ticket, request_id)
            }
            Event::ReleaseRequested { ticket, request_id } => {
                self.on_release_requested(ticket, request_id)
            }
            Event::CancelAllRequested => self.on_cancel_all_requested(),
            Event::WaitAbandoned { ticket } => self.on_wait_abandoned(ticket),
            Event::FeedbackReceived { feedback } => self.on_feedback(feedback),
            Event::HeartbeatTimer => self.on_heartbeat_timer(),
            Event::StatusCheckTimer => self.on_status_check_timer(),
        }
    }

    fn set_time(&mut self, now: Duration) {
        self.now = now;
    }

    fn now(&self) -> Duration {
        self.now
    }
}
