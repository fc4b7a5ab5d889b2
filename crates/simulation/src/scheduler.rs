//! A small scheduler that speaks the requester protocol.
//!
//! Each capability has a fixed number of slots. Requests naming an unknown
//! capability are closed as UNAVAILABLE, the rest queue as WAITING and are
//! granted in priority order (arrival order within a priority) once every
//! capability they need has a free slot. A requester that stops publishing
//! for longer than the requester timeout has all its requests closed with
//! TIMEOUT.

use crate::InMemoryBus;
use indexmap::IndexMap;
use parking_lot::Mutex;
use rocon_messages::SchedulerRequests;
use rocon_requester::DEFAULT_SCHEDULER_TOPIC;
use rocon_types::{Identifier, Priority, Reason, RequestFeedback, RequestSet, Status};
use serde::Deserialize;
use serde_json::Value;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Configuration for the simulated scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Shared channel requesters publish on.
    pub scheduler_topic: String,

    /// Slots per capability name.
    pub inventory: HashMap<String, usize>,

    /// Silence after which a requester is considered dead.
    pub requester_timeout: Duration,

    /// How often dead requesters are looked for.
    pub expiry_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            scheduler_topic: DEFAULT_SCHEDULER_TOPIC.to_string(),
            inventory: HashMap::new(),
            requester_timeout: Duration::from_secs(10),
            expiry_interval: Duration::from_secs(1),
        }
    }
}

impl SchedulerConfig {
    /// Add `slots` of `capability_name` to the inventory.
    pub fn with_capability(mut self, capability_name: impl Into<String>, slots: usize) -> Self {
        self.inventory.insert(capability_name.into(), slots);
        self
    }

    /// Set the requester timeout.
    pub fn with_requester_timeout(mut self, timeout: Duration) -> Self {
        self.requester_timeout = timeout;
        self
    }

    /// Set the expiry check interval.
    pub fn with_expiry_interval(mut self, interval: Duration) -> Self {
        self.expiry_interval = interval;
        self
    }
}

/// Per-requester view held by the scheduler.
struct RequesterRecord {
    requests: RequestSet,
    arrival: HashMap<Identifier, u64>,
    last_seen: Instant,
    dirty: bool,
}

impl RequesterRecord {
    fn new(requester_id: Identifier, now: Instant) -> Self {
        Self {
            requests: RequestSet::new(requester_id),
            arrival: HashMap::new(),
            last_seen: now,
            dirty: false,
        }
    }

    fn set_state(&mut self, id: Identifier, feedback: RequestFeedback) {
        if let Some(request) = self.requests.get_mut(&id) {
            request.apply_feedback(&feedback);
            self.dirty = true;
        }
    }
}

/// Counters describing what the scheduler has done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub granted: u64,
    pub released: u64,
    pub rejected: u64,
    pub timed_out: u64,
}

struct SchedulerState {
    config: SchedulerConfig,
    requesters: IndexMap<Identifier, RequesterRecord>,
    in_use: HashMap<String, usize>,
    next_arrival: u64,
    stats: SchedulerStats,
}

impl SchedulerState {
    fn on_requests(&mut self, incoming: RequestSet, now: Instant) {
        let requester_id = incoming.requester_id();
        let next_arrival = &mut self.next_arrival;
        let in_use = &mut self.in_use;
        let stats = &mut self.stats;
        let inventory = &self.config.inventory;

        let record = self
            .requesters
            .entry(requester_id)
            .or_insert_with(|| {
                info!(requester = %requester_id, "New requester");
                RequesterRecord::new(requester_id, now)
            });
        record.last_seen = now;

        for request in incoming.iter() {
            let id = request.id();
            let known = record.requests.get(&id).map(|r| r.status());

            match known {
                None if request.status() == Status::Closed => {}
                None => {
                    let mut tracked = request.clone();
                    let missing = tracked
                        .resources()
                        .iter()
                        .map(|r| r.capability_name())
                        .find(|name| !inventory.contains_key(*name))
                        .map(str::to_string);

                    let state = match (missing, request.status()) {
                        (_, Status::Canceling) => RequestFeedback::new(id, Status::Closed),
                        (Some(name), _) => {
                            stats.rejected += 1;
                            debug!(request = %id, capability = %name, "Rejecting request");
                            RequestFeedback::new(id, Status::Closed)
                                .with_reason(Reason::Unavailable)
                                .with_problem(format!("no capability named {name}"))
                        }
                        (None, _) => {
                            record.arrival.insert(id, *next_arrival);
                            *next_arrival += 1;
                            RequestFeedback::new(id, Status::Waiting)
                        }
                    };
                    tracked.apply_feedback(&state);
                    if record.requests.add(tracked).is_ok() {
                        record.dirty = true;
                    }
                }
                Some(Status::Closed) => {}
                Some(status) if request.status() == Status::Canceling => {
                    if status == Status::Granted {
                        release_slots(in_use, record, &id);
                        stats.released += 1;
                    }
                    record.arrival.remove(&id);
                    debug!(request = %id, "Request released");
                    record.set_state(id, RequestFeedback::new(id, Status::Closed));
                }
                Some(_) => {}
            }
        }

        // Requests the requester no longer lists are treated as released.
        let dropped: Vec<(Identifier, Status)> = record
            .requests
            .iter()
            .filter(|r| !r.status().is_terminal() && !incoming.contains(&r.id()))
            .map(|r| (r.id(), r.status()))
            .collect();
        for (id, status) in dropped {
            if status == Status::Granted {
                release_slots(in_use, record, &id);
                stats.released += 1;
            }
            record.arrival.remove(&id);
            if let Some(request) = record.requests.get_mut(&id) {
                request.apply_feedback(&RequestFeedback::new(id, Status::Closed));
            }
        }

        self.allocate();
    }

    /// Grant waiting requests whose capabilities all have a free slot.
    fn allocate(&mut self) {
        let mut waiting: Vec<(Reverse<Priority>, u64, Identifier, Identifier)> = self
            .requesters
            .iter()
            .flat_map(|(requester_id, record)| {
                record
                    .requests
                    .iter()
                    .filter(|r| r.status() == Status::Waiting)
                    .filter_map(move |r| {
                        let arrival = *record.arrival.get(&r.id())?;
                        Some((Reverse(r.priority()), arrival, *requester_id, r.id()))
                    })
            })
            .collect();
        waiting.sort();

        for (_, _, requester_id, request_id) in waiting {
            let Some(record) = self.requesters.get_mut(&requester_id) else {
                continue;
            };
            let Some(request) = record.requests.get(&request_id) else {
                continue;
            };

            let mut needed: HashMap<&str, usize> = HashMap::new();
            for resource in request.resources() {
                *needed.entry(resource.capability_name()).or_default() += 1;
            }
            let fits = needed.iter().all(|(name, count)| {
                let slots = self.config.inventory.get(*name).copied().unwrap_or(0);
                let used = self.in_use.get(*name).copied().unwrap_or(0);
                used + count <= slots
            });
            if !fits {
                continue;
            }

            for (name, count) in needed {
                *self.in_use.entry(name.to_string()).or_default() += count;
            }
            self.stats.granted += 1;
            info!(requester = %requester_id, request = %request_id, "Granting request");
            record.set_state(
                request_id,
                RequestFeedback::new(request_id, Status::Granted),
            );
        }
    }

    /// Close every request of requesters silent for longer than the timeout.
    fn expire(&mut self, now: Instant) -> Vec<Identifier> {
        let timeout = self.config.requester_timeout;
        let dead: Vec<Identifier> = self
            .requesters
            .iter()
            .filter(|(_, record)| now.saturating_duration_since(record.last_seen) > timeout)
            .map(|(id, _)| *id)
            .collect();

        for requester_id in &dead {
            let Some(record) = self.requesters.get_mut(requester_id) else {
                continue;
            };
            let open: Vec<(Identifier, Status)> = record
                .requests
                .iter()
                .filter(|r| !r.status().is_terminal())
                .map(|r| (r.id(), r.status()))
                .collect();
            if open.is_empty() {
                continue;
            }

            warn!(requester = %requester_id, requests = open.len(), "Requester timed out");
            for (id, status) in open {
                if status == Status::Granted {
                    release_slots(&mut self.in_use, record, &id);
                }
                record.arrival.remove(&id);
                self.stats.timed_out += 1;
                record.set_state(
                    id,
                    RequestFeedback::new(id, Status::Closed)
                        .with_reason(Reason::Timeout)
                        .with_problem("requester stopped publishing"),
                );
            }
        }

        self.allocate();
        dead
    }

    /// Feedback for every requester whose view changed, as (channel, payload).
    fn take_feedback(&mut self) -> Vec<(String, SchedulerRequests)> {
        let topic = &self.config.scheduler_topic;
        self.requesters
            .iter_mut()
            .filter(|(_, record)| record.dirty)
            .map(|(requester_id, record)| {
                record.dirty = false;
                (
                    format!("{topic}_{}", requester_id.render()),
                    SchedulerRequests::from(&record.requests),
                )
            })
            .collect()
    }
}

fn release_slots(in_use: &mut HashMap<String, usize>, record: &RequesterRecord, id: &Identifier) {
    let Some(request) = record.requests.get(id) else {
        return;
    };
    for resource in request.resources() {
        if let Some(used) = in_use.get_mut(resource.capability_name()) {
            *used = used.saturating_sub(1);
        }
    }
}

/// Scheduler attached to an [`InMemoryBus`].
pub struct SimulatedScheduler {
    bus: Arc<InMemoryBus>,
    state: Mutex<SchedulerState>,
    expiry: Mutex<Option<JoinHandle<()>>>,
}

impl SimulatedScheduler {
    /// Subscribe to the scheduler topic and start expiring dead requesters.
    ///
    /// Must be called inside a tokio runtime.
    pub fn spawn(bus: Arc<InMemoryBus>, config: SchedulerConfig) -> Arc<Self> {
        let topic = config.scheduler_topic.clone();
        let expiry_interval = config.expiry_interval;
        let scheduler = Arc::new(Self {
            bus: bus.clone(),
            state: Mutex::new(SchedulerState {
                config,
                requesters: IndexMap::new(),
                in_use: HashMap::new(),
                next_arrival: 0,
                stats: SchedulerStats::default(),
            }),
            expiry: Mutex::new(None),
        });

        let weak = Arc::downgrade(&scheduler);
        bus.listen(
            &topic,
            Box::new(move |payload| {
                if let Some(scheduler) = weak.upgrade() {
                    scheduler.on_message(&payload);
                }
            }),
        );

        let handle = tokio::spawn(expiry_loop(Arc::downgrade(&scheduler), expiry_interval));
        *scheduler.expiry.lock() = Some(handle);

        scheduler
    }

    /// Handle one `SchedulerRequests` payload from a requester.
    pub fn on_message(&self, payload: &Value) {
        let incoming = match SchedulerRequests::deserialize(payload)
            .map_err(|e| e.to_string())
            .and_then(|msg| RequestSet::try_from(&msg).map_err(|e| e.to_string()))
        {
            Ok(incoming) => incoming,
            Err(e) => {
                warn!(error = %e, "Dropping malformed request set");
                return;
            }
        };

        let feedback = {
            let mut state = self.state.lock();
            state.on_requests(incoming, Instant::now());
            state.take_feedback()
        };
        self.publish(feedback);
    }

    /// Close the requests of requesters that have gone quiet.
    ///
    /// Returns the requesters that were expired.
    pub fn expire_now(&self) -> Vec<Identifier> {
        let (dead, feedback) = {
            let mut state = self.state.lock();
            let dead = state.expire(Instant::now());
            let feedback = state.take_feedback();
            for id in &dead {
                state.requesters.shift_remove(id);
            }
            (dead, feedback)
        };
        self.publish(feedback);
        dead
    }

    /// Status of a request as the scheduler sees it.
    pub fn status_of(&self, requester_id: Identifier, request_id: Identifier) -> Option<Status> {
        self.state
            .lock()
            .requesters
            .get(&requester_id)
            .and_then(|record| record.requests.get(&request_id))
            .map(|request| request.status())
    }

    /// Slots currently granted for `capability_name`.
    pub fn in_use(&self, capability_name: &str) -> usize {
        self.state
            .lock()
            .in_use
            .get(capability_name)
            .copied()
            .unwrap_or(0)
    }

    pub fn stats(&self) -> SchedulerStats {
        self.state.lock().stats
    }

    fn publish(&self, feedback: Vec<(String, SchedulerRequests)>) {
        for (channel, message) in feedback {
            match serde_json::to_value(&message) {
                Ok(payload) => self.bus.send(&channel, payload),
                Err(e) => warn!(%channel, error = %e, "Failed to encode feedback"),
            }
        }
    }
}

impl Drop for SimulatedScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.expiry.get_mut().take() {
            handle.abort();
        }
    }
}

async fn expiry_loop(scheduler: Weak<SimulatedScheduler>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        let Some(scheduler) = scheduler.upgrade() else {
            break;
        };
        scheduler.expire_now();
    }
}
