//! Domain model (artifact, period, retry policy, scheduler state, history query).

pub mod artifact;
pub mod period;
pub mod query;
pub mod retry;
pub mod state;

pub use self::artifact::{Artifact, ArtifactId, LOCAL_SCHEME, OriginKind};
pub use self::period::{Period, PeriodError};
pub use self::query::HistoryQuery;
pub use self::retry::RetryPolicy;
pub use self::state::SchedulerState;
