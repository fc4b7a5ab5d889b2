//! Simulated environment for requesters.
//!
//! ```text
//! ┌──────────────────┐  /concert/scheduler/requests  ┌────────────────────┐
//! │ RequesterClient  │──────────────────────────────►│ SimulatedScheduler │
//! │  (one per robot) │◄──────────────────────────────│  inventory, queue  │
//! └──────────────────┘   <topic>_<requester-hex>     └────────────────────┘
//!           ▲                                                  ▲
//!           └──────────────────── InMemoryBus ─────────────────┘
//! ```
//!
//! The bus delivers synchronously and in order. The scheduler grants from a
//! fixed capability inventory and expires requesters whose heartbeat stops.

mod bus;
mod scheduler;
mod workload;

pub use bus::InMemoryBus;
pub use scheduler::{SchedulerConfig, SchedulerStats, SimulatedScheduler};
pub use workload::{RequestWorkload, WorkItem};
