//! Caller tracking.

use std::fmt;

/// Names one outstanding caller of the requester.
///
/// Every submit, await or release gets a fresh ticket. The state machine
/// echoes it back on the matching `Emit*` action so the runner can find the
/// oneshot sender that caller is parked on. Async plumbing never enters the
/// state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(pub u64);

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
