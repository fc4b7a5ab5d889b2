//! Request status, reason codes and priority labels.
//!
//! Numeric values are fixed by the wire protocol.

use crate::RequestError;
use std::fmt;

/// Lifecycle status of a request.
///
/// ```text
/// NEW ──► RESERVED / WAITING ──► GRANTED ──► PREEMPTING
///  │            │                   │            │
///  └────────────┴───────────────────┴────────────┴──► CANCELING ──► CLOSED
/// ```
///
/// The scheduler may also close a request from any state (e.g. on rejection).
/// `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum Status {
    /// New request for the scheduler.
    #[default]
    New = 0,
    /// Request for a reservation at some future time.
    Reserved = 1,
    /// Request has been queued by the scheduler.
    Waiting = 2,
    /// Request was granted by the scheduler.
    Granted = 3,
    /// The scheduler wants to preempt this previously-granted request,
    /// but the requester has not yet canceled it.
    Preempting = 4,
    /// The requester wishes to cancel this request, but the scheduler has
    /// not yet confirmed that it is closed.
    Canceling = 5,
    /// Request is closed.
    Closed = 6,
}

impl Status {
    /// All statuses in protocol order.
    pub const ALL: [Status; 7] = [
        Status::New,
        Status::Reserved,
        Status::Waiting,
        Status::Granted,
        Status::Preempting,
        Status::Canceling,
        Status::Closed,
    ];

    /// Wire value.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether this is the terminal state.
    pub fn is_terminal(self) -> bool {
        self == Status::Closed
    }

    /// Whether the scheduler may move a request from `self` to `next`.
    ///
    /// Status only advances; repeating the current status is allowed so that
    /// duplicated feedback stays harmless.
    pub fn can_advance_to(self, next: Status) -> bool {
        if self.is_terminal() {
            return next == Status::Closed;
        }
        next >= self
    }
}

impl TryFrom<u8> for Status {
    type Error = RequestError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Status::ALL
            .get(value as usize)
            .copied()
            .ok_or(RequestError::InvalidStatus(value))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Status::New => "NEW",
            Status::Reserved => "RESERVED",
            Status::Waiting => "WAITING",
            Status::Granted => "GRANTED",
            Status::Preempting => "PREEMPTING",
            Status::Canceling => "CANCELING",
            Status::Closed => "CLOSED",
        };
        f.write_str(label)
    }
}

/// Why a request was preempted, canceled or closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Reason {
    /// No reason provided.
    #[default]
    None = 0,
    /// Preempted for a higher-priority task.
    Preempted = 1,
    /// Requested resource busy elsewhere.
    Busy = 2,
    /// Requested resource not available.
    Unavailable = 3,
    /// Lost contact with requester.
    Timeout = 4,
    /// Ill-formed request; see the problem string for details.
    Invalid = 5,
}

impl Reason {
    const ALL: [Reason; 6] = [
        Reason::None,
        Reason::Preempted,
        Reason::Busy,
        Reason::Unavailable,
        Reason::Timeout,
        Reason::Invalid,
    ];

    /// Wire value.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether this reason reports a failure rather than a normal close.
    pub fn is_failure(self) -> bool {
        self != Reason::None
    }
}

impl TryFrom<u8> for Reason {
    type Error = RequestError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Reason::ALL
            .get(value as usize)
            .copied()
            .ok_or(RequestError::InvalidReason(value))
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Reason::None => "NONE",
            Reason::Preempted => "PREEMPTED",
            Reason::Busy => "BUSY",
            Reason::Unavailable => "UNAVAILABLE",
            Reason::Timeout => "TIMEOUT",
            Reason::Invalid => "INVALID",
        };
        f.write_str(label)
    }
}

/// Request priority. Higher values are served first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Priority(pub i32);

impl Priority {
    /// When nothing else to do.
    pub const BACKGROUND: Self = Priority(-20_000);
    /// Low-priority task.
    pub const LOW: Self = Priority(-10_000);
    /// Sane default priority.
    pub const DEFAULT: Self = Priority(0);
    /// High-priority task.
    pub const HIGH: Self = Priority(10_000);
    /// Mission-critical task.
    pub const CRITICAL: Self = Priority(20_000);

    /// Get the raw value.
    pub fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_values_are_fixed() {
        assert_eq!(Status::New.as_u8(), 0);
        assert_eq!(Status::Granted.as_u8(), 3);
        assert_eq!(Status::Closed.as_u8(), 6);
        assert_eq!(Reason::Unavailable.as_u8(), 3);
        assert_eq!(Reason::Invalid.as_u8(), 5);

        for status in Status::ALL {
            assert_eq!(Status::try_from(status.as_u8()).unwrap(), status);
        }
        assert_eq!(Status::try_from(7), Err(RequestError::InvalidStatus(7)));
        assert_eq!(Reason::try_from(4).unwrap(), Reason::Timeout);
        assert_eq!(Reason::try_from(9), Err(RequestError::InvalidReason(9)));
    }

    #[test]
    fn test_status_only_advances() {
        assert!(Status::New.can_advance_to(Status::Waiting));
        assert!(Status::New.can_advance_to(Status::Granted));
        assert!(Status::Waiting.can_advance_to(Status::Granted));
        assert!(Status::Granted.can_advance_to(Status::Preempting));
        assert!(Status::Preempting.can_advance_to(Status::Canceling));
        assert!(Status::Canceling.can_advance_to(Status::Closed));
        assert!(Status::Granted.can_advance_to(Status::Granted));

        // Stale echoes of earlier states are rejected
        assert!(!Status::Canceling.can_advance_to(Status::Granted));
        assert!(!Status::Granted.can_advance_to(Status::Waiting));

        // Closed is terminal
        assert!(Status::Closed.can_advance_to(Status::Closed));
        for status in &Status::ALL[..6] {
            assert!(!Status::Closed.can_advance_to(*status));
        }
    }

    #[test]
    fn test_priority_labels_are_ordered() {
        assert!(Priority::BACKGROUND < Priority::LOW);
        assert!(Priority::LOW < Priority::DEFAULT);
        assert!(Priority::HIGH < Priority::CRITICAL);
        assert_eq!(Priority::default(), Priority::DEFAULT);
    }
}
