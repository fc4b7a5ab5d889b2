//! Random request workload for simulation runs.

use rand::seq::SliceRandom;
use rand::Rng;
use rocon_types::{Identifier, Priority, Resource};
use std::time::Duration;

/// One allocation a simulated requester will make.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub resource: Resource,
    pub priority: Priority,
    /// How long the requester keeps the resource once granted.
    pub hold: Duration,
}

/// Generates allocation requests over a fixed set of capabilities.
pub struct RequestWorkload {
    /// Capabilities the scheduler knows about.
    capabilities: Vec<String>,

    /// Fraction of requests naming a capability the scheduler lacks (0.0 to 1.0).
    unknown_ratio: f64,

    /// Upper bound on hold time.
    max_hold: Duration,
}

const PRIORITIES: [Priority; 5] = [
    Priority::BACKGROUND,
    Priority::LOW,
    Priority::DEFAULT,
    Priority::HIGH,
    Priority::CRITICAL,
];

impl RequestWorkload {
    pub fn new(capabilities: Vec<String>) -> Self {
        Self {
            capabilities,
            unknown_ratio: 0.0,
            max_hold: Duration::from_millis(500),
        }
    }

    /// Set the fraction of requests for unknown capabilities.
    pub fn with_unknown_ratio(mut self, ratio: f64) -> Self {
        self.unknown_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    /// Set the upper bound on hold time.
    pub fn with_max_hold(mut self, max_hold: Duration) -> Self {
        self.max_hold = max_hold;
        self
    }

    pub fn generate_one(&self, rng: &mut impl Rng) -> WorkItem {
        let capability = match self.capabilities.choose(rng) {
            Some(name) if rng.gen::<f64>() >= self.unknown_ratio => name.clone(),
            _ => format!("unknown/capability_{}", rng.gen_range(0..100)),
        };
        let priority = PRIORITIES[rng.gen_range(0..PRIORITIES.len())];
        let max_ms = self.max_hold.as_millis().max(1) as u64;
        let hold = Duration::from_millis(rng.gen_range(0..=max_ms));

        WorkItem {
            resource: Resource::with_id(Identifier::from_rng(rng), capability)
                .with_uri("rocon:/sim"),
            priority,
            hold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn capabilities() -> Vec<String> {
        vec!["rocon_apps/talker".into(), "rocon_apps/listener".into()]
    }

    #[test]
    fn test_same_seed_same_workload() {
        let workload = RequestWorkload::new(capabilities());
        let mut a = ChaCha8Rng::seed_from_u64(42);
        let mut b = ChaCha8Rng::seed_from_u64(42);

        for _ in 0..10 {
            let (x, y) = (workload.generate_one(&mut a), workload.generate_one(&mut b));
            assert_eq!(x.resource, y.resource);
            assert_eq!(x.priority, y.priority);
            assert_eq!(x.hold, y.hold);
        }
    }

    #[test]
    fn test_known_capabilities_only() {
        let workload = RequestWorkload::new(capabilities());
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for _ in 0..50 {
            let item = workload.generate_one(&mut rng);
            assert!(capabilities().contains(&item.resource.capability_name().to_string()));
            assert!(item.hold <= Duration::from_millis(500));
        }
    }

    #[test]
    fn test_all_unknown() {
        let workload = RequestWorkload::new(capabilities()).with_unknown_ratio(1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let item = workload.generate_one(&mut rng);
        assert!(item.resource.capability_name().starts_with("unknown/"));
    }
}
