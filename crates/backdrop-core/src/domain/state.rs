//! Scheduler state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// SchedulerState tracks where the orchestration loop is in its lifetime.
///
/// State transitions:
/// - Uninitialized -> Initializing (builder starts wiring components)
/// - Initializing -> Running (first cycle starts)
/// - Running -> Faulted (a cycle returned an error)
///
/// `Faulted` is terminal: the scheduler never restarts itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchedulerState {
    Uninitialized,
    Initializing,
    Running,
    Faulted,
}

impl SchedulerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SchedulerState::Faulted)
    }

    /// Is the transition `self -> next` allowed?
    pub fn can_transition_to(self, next: SchedulerState) -> bool {
        use SchedulerState::*;
        matches!(
            (self, next),
            (Uninitialized, Initializing)
                | (Initializing, Running)
                | (Initializing, Faulted)
                | (Running, Running)
                | (Running, Faulted)
        )
    }
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchedulerState::Uninitialized => "uninitialized",
            SchedulerState::Initializing => "initializing",
            SchedulerState::Running => "running",
            SchedulerState::Faulted => "faulted",
        };
        f.write_str(name)
    }
}
