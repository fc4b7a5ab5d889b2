//! Duration wire form.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// ROS `duration`: whole seconds plus nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DurationMsg {
    #[serde(default)]
    pub secs: i32,
    #[serde(default)]
    pub nsecs: i32,
}

impl From<Duration> for DurationMsg {
    fn from(duration: Duration) -> Self {
        Self {
            secs: i32::try_from(duration.as_secs()).unwrap_or(i32::MAX),
            nsecs: duration.subsec_nanos() as i32,
        }
    }
}

impl From<DurationMsg> for Duration {
    /// Negative components clamp to zero.
    fn from(msg: DurationMsg) -> Self {
        Duration::from_secs(msg.secs.max(0) as u64) + Duration::from_nanos(msg.nsecs.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_conversion() {
        let msg = DurationMsg::from(Duration::from_millis(2_500));
        assert_eq!(msg, DurationMsg { secs: 2, nsecs: 500_000_000 });
        assert_eq!(Duration::from(msg), Duration::from_millis(2_500));
    }

    #[test]
    fn test_negative_duration_clamps_to_zero() {
        let msg = DurationMsg { secs: -3, nsecs: -1 };
        assert_eq!(Duration::from(msg), Duration::ZERO);
    }
}
