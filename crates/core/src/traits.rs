//! The seam between protocol logic and the runner.

use crate::{Action, Event};
use std::time::Duration;

/// Protocol logic driven one event at a time.
///
/// Implementations never publish, sleep or read the clock. They record what
/// should happen as [`Action`]s and the runner carries those out, so the same
/// event sequence always yields the same actions.
///
/// ```ignore
/// let mut state = RequesterState::new(RequesterConfig::default());
/// state.set_time(Duration::from_secs(4));
/// for action in state.handle(Event::HeartbeatTimer) {
///     runner.execute(action);
/// }
/// ```
pub trait StateMachine {
    /// Apply `event` and return the actions it calls for, in order.
    fn handle(&mut self, event: Event) -> Vec<Action>;

    /// Advance the logical clock. The runner calls this before each
    /// [`handle`](Self::handle).
    fn set_time(&mut self, now: Duration);

    /// Time passed to the last [`set_time`](Self::set_time).
    fn now(&self) -> Duration;
}
