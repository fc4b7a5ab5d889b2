//! Requester configuration.

use rocon_types::{Identifier, Priority};
use std::time::Duration;

/// Shared channel every requester publishes its request set on.
pub const DEFAULT_SCHEDULER_TOPIC: &str = "/concert/scheduler/requests";

/// Configuration for the requester protocol.
#[derive(Debug, Clone, PartialEq)]
pub struct RequesterConfig {
    /// Shared outbound channel. Feedback arrives on
    /// `<scheduler_topic>_<requester-hex>`.
    pub scheduler_topic: String,

    /// Heartbeat rate in Hz. The full request set is republished at this
    /// rate so the scheduler can detect a dead requester. Zero disables it.
    pub heartbeat_hz: f64,

    /// Fallback interval for re-checking callers waiting on an outcome.
    /// Outcomes are normally resolved as soon as feedback is reconciled.
    pub status_check_interval: Duration,

    /// Priority used when the caller does not give one.
    pub default_priority: Priority,

    /// Default limit on waiting for an outcome. `None` waits indefinitely.
    pub outcome_timeout: Option<Duration>,
}

impl Default for RequesterConfig {
    fn default() -> Self {
        Self {
            scheduler_topic: DEFAULT_SCHEDULER_TOPIC.to_string(),
            heartbeat_hz: 0.25,
            status_check_interval: Duration::from_millis(500),
            default_priority: Priority::DEFAULT,
            outcome_timeout: None,
        }
    }
}

impl RequesterConfig {
    /// Set the shared scheduler topic.
    pub fn with_scheduler_topic(mut self, topic: impl Into<String>) -> Self {
        self.scheduler_topic = topic.into();
        self
    }

    /// Set the heartbeat rate.
    pub fn with_heartbeat_hz(mut self, hz: f64) -> Self {
        self.heartbeat_hz = hz;
        self
    }

    /// Set the fallback status check interval.
    pub fn with_status_check_interval(mut self, interval: Duration) -> Self {
        self.status_check_interval = interval;
        self
    }

    /// Set the default request priority.
    pub fn with_default_priority(mut self, priority: Priority) -> Self {
        self.default_priority = priority;
        self
    }

    /// Set the default outcome timeout.
    pub fn with_outcome_timeout(mut self, timeout: Duration) -> Self {
        self.outcome_timeout = Some(timeout);
        self
    }

    /// Interval between heartbeats, or `None` when disabled or when the
    /// period does not fit in a `Duration`.
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        if self.heartbeat_hz.is_finite() && self.heartbeat_hz > 0.0 {
            Duration::try_from_secs_f64(1.0 / self.heartbeat_hz).ok()
        } else {
            None
        }
    }

    /// Per-requester feedback channel.
    pub fn feedback_topic(&self, requester_id: Identifier) -> String {
        format!("{}_{}", self.scheduler_topic, requester_id.render())
    }
}
