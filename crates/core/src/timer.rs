//! Timers the state machine asks the runner to schedule.

/// Timer identifiers. Setting a timer that is already pending replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// Periodic republish of the request set, read by the scheduler as a
    /// liveness signal.
    Heartbeat,

    /// Fallback re-check of callers waiting on an outcome.
    StatusCheck,
}
