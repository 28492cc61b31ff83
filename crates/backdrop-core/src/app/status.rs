//! Status - counters describing what the scheduler has done so far.

use serde::{Deserialize, Serialize};

use crate::domain::ArtifactId;

/// SchedulerStats accumulates per-cycle outcomes.
///
/// Read it through `Scheduler::stats()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub cycles_completed: u64,
    /// Provider results rejected as invalid and retried.
    pub empty_results: u64,
    /// History writes that failed without stopping the cycle.
    pub record_failures: u64,
    pub files_evicted: u64,
    /// Last artifact made the background; `ArtifactId::UNSET` if its history write failed.
    pub last_applied: Option<AppliedArtifact>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedArtifact {
    pub id: ArtifactId,
    pub origin: String,
    pub filename: String,
}
