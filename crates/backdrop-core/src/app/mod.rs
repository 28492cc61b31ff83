//! App - application layer.
//!
//! Composes the ports into the running system.
//!
//! # Components
//! - **AppBuilder**: wiring and fail-fast start-up validation
//! - **Scheduler**: state machine and the timed cycle
//! - **SchedulerStats**: counters exposed for status output

pub mod builder;
pub mod scheduler;
pub mod status;

pub use self::builder::{AppBuilder, BuildError};
pub use self::scheduler::Scheduler;
pub use self::status::{AppliedArtifact, SchedulerStats};
