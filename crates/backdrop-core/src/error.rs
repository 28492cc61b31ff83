//! Scheduler-level errors and their place in the failure taxonomy.

use thiserror::Error;

use crate::app::BuildError;
use crate::domain::SchedulerState;
use crate::ports::{ApplyError, CacheError, ProviderError, RepositoryError};

/// How a failure affects the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Retried in place; never surfaces as a cycle failure.
    Transient,
    /// Logged and counted; the cycle proceeds.
    Recorded,
    /// Aborts the cycle and stops the scheduler.
    FatalToCycle,
    /// The scheduler never reaches `Running`.
    FatalToStart,
}

#[derive(Debug, Error)]
pub enum BackdropError {
    #[error("start: {0}")]
    Start(#[from] BuildError),

    #[error("provide artifact: {0}")]
    Provide(#[from] ProviderError),

    #[error("record {origin} in history: {source}")]
    Record {
        origin: String,
        source: RepositoryError,
    },

    #[error("save {filename} to local cache: {source}")]
    Save { filename: String, source: CacheError },

    #[error("apply {origin}: {source}")]
    Apply { origin: String, source: ApplyError },

    #[error("clean up local cache: {0}")]
    CleanUp(#[source] CacheError),

    #[error("scheduler is {0} and cannot run")]
    NotRunnable(SchedulerState),
}

impl BackdropError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BackdropError::Start(_) | BackdropError::NotRunnable(_) => ErrorKind::FatalToStart,
            BackdropError::Record { .. } => ErrorKind::Recorded,
            BackdropError::Provide(_)
            | BackdropError::Save { .. }
            | BackdropError::Apply { .. }
            | BackdropError::CleanUp(_) => ErrorKind::FatalToCycle,
        }
    }

    pub fn is_fatal(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Transient | ErrorKind::Recorded)
    }
}
