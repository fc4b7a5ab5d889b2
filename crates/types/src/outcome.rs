//! Results delivered to callers waiting on a request.

use crate::{Identifier, Reason};
use std::fmt;

/// Result of waiting for an allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationOutcome {
    /// The scheduler granted the request.
    Granted { request_id: Identifier },

    /// The scheduler closed the request without (or after) granting it.
    Closed {
        request_id: Identifier,
        reason: Reason,
        problem: String,
    },
}

impl AllocationOutcome {
    pub fn request_id(&self) -> Identifier {
        match self {
            AllocationOutcome::Granted { request_id } => *request_id,
            AllocationOutcome::Closed { request_id, .. } => *request_id,
        }
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, AllocationOutcome::Granted { .. })
    }
}

impl fmt::Display for AllocationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationOutcome::Granted { request_id } => write!(f, "{request_id} granted"),
            AllocationOutcome::Closed {
                request_id,
                reason,
                problem,
            } if problem.is_empty() => write!(f, "{request_id} closed ({reason})"),
            AllocationOutcome::Closed {
                request_id,
                reason,
                problem,
            } => write!(f, "{request_id} closed ({reason}): {problem}"),
        }
    }
}

/// Confirmation that a released request has been closed by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseOutcome {
    pub request_id: Identifier,
    pub reason: Reason,
}
