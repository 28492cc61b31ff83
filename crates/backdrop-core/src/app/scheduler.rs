//! Scheduler - the provide → record → cache → apply → evict loop.
//!
//! # Cycle
//! 1. `Provider::provide`, re-invoked until the artifact is valid
//! 2. `Repository::add`; a failure is logged and counted, the cycle goes on
//! 3. `LocalCache::save` unless the artifact is already local
//! 4. `Applier::apply`
//! 5. `LocalCache::clean_up` when a limit is configured
//!
//! Steps 3 to 5 and a provider error end the cycle with an error, and the
//! scheduler moves to `Faulted`. There is no restart at this layer.
//!
//! # Timing
//! The first cycle runs immediately. Cycles never overlap: a slow cycle
//! delays the next tick instead of queueing extra ones.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::app::status::{AppliedArtifact, SchedulerStats};
use crate::domain::{Artifact, Period, RetryPolicy, SchedulerState};
use crate::error::BackdropError;
use crate::ports::{Applier, LocalCache, Provider, Repository};

pub struct Scheduler {
    period: Period,
    interval: Duration,
    repository: Arc<dyn Repository>,
    cache: Arc<dyn LocalCache>,
    provider: Arc<dyn Provider>,
    applier: Arc<dyn Applier>,
    retry: RetryPolicy,
    state: SchedulerState,
    stats: SchedulerStats,
}

impl Scheduler {
    pub(crate) fn new(
        period: Period,
        interval: Duration,
        repository: Arc<dyn Repository>,
        cache: Arc<dyn LocalCache>,
        provider: Arc<dyn Provider>,
        applier: Arc<dyn Applier>,
        retry: RetryPolicy,
    ) -> Self {
        let mut scheduler = Self {
            period,
            interval,
            repository,
            cache,
            provider,
            applier,
            retry,
            state: SchedulerState::Uninitialized,
            stats: SchedulerStats::default(),
        };
        scheduler.transition(SchedulerState::Initializing);
        scheduler
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    pub fn period(&self) -> &Period {
        &self.period
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn applier_target(&self) -> &str {
        self.applier.target()
    }

    /// Run one cycle now, then one per period, until a cycle fails.
    ///
    /// Only returns on error; the scheduler is `Faulted` afterwards.
    pub async fn run(&mut self) -> Result<(), BackdropError> {
        self.enter_running()?;
        info!(period = %self.period, interval_secs = self.interval.as_secs(), "scheduler started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.run_guarded().await?;
        }
    }

    /// Run exactly one cycle and return the applied artifact (without bytes).
    pub async fn run_once(&mut self) -> Result<Artifact, BackdropError> {
        self.enter_running()?;
        self.run_guarded().await
    }

    async fn run_guarded(&mut self) -> Result<Artifact, BackdropError> {
        match self.run_cycle().await {
            Ok(artifact) => Ok(artifact),
            Err(e) => {
                error!(error = %e, kind = ?e.kind(), "cycle failed, stopping scheduler");
                self.transition(SchedulerState::Faulted);
                Err(e)
            }
        }
    }

    fn enter_running(&mut self) -> Result<(), BackdropError> {
        match self.state {
            SchedulerState::Running => Ok(()),
            state if state.can_transition_to(SchedulerState::Running) => {
                self.transition(SchedulerState::Running);
                Ok(())
            }
            state => Err(BackdropError::NotRunnable(state)),
        }
    }

    fn transition(&mut self, next: SchedulerState) {
        if self.state == next {
            return;
        }
        debug_assert!(self.state.can_transition_to(next), "{} -> {next}", self.state);
        info!(from = %self.state, to = %next, "scheduler state changed");
        self.state = next;
    }

    async fn run_cycle(&mut self) -> Result<Artifact, BackdropError> {
        let cycle = self.stats.cycles_completed + 1;
        info!(cycle, provider = self.provider.name(), "cycle started");

        let mut artifact = self.acquire().await?;

        match self.repository.add(&artifact).await {
            Ok(id) => artifact.id = id,
            Err(source) => {
                self.stats.record_failures += 1;
                let error = BackdropError::Record {
                    origin: artifact.origin.clone(),
                    source,
                };
                warn!(error = %error, "history write failed, applying anyway");
            }
        }

        if !artifact.is_local() {
            let bytes = artifact.take_bytes();
            self.cache
                .save(&artifact.filename, &bytes)
                .await
                .map_err(|source| BackdropError::Save {
                    filename: artifact.filename.clone(),
                    source,
                })?;
        }

        self.applier
            .apply(&artifact)
            .await
            .map_err(|source| BackdropError::Apply {
                origin: artifact.origin.clone(),
                source,
            })?;

        if self.cache.limit() != 0 {
            let report = self.cache.clean_up().await.map_err(BackdropError::CleanUp)?;
            self.stats.files_evicted += report.removed.len() as u64;
        }

        self.stats.cycles_completed = cycle;
        self.stats.last_applied = Some(AppliedArtifact {
            id: artifact.id,
            origin: artifact.origin.clone(),
            filename: artifact.filename.clone(),
        });
        info!(
            cycle,
            id = %artifact.id,
            origin = %artifact.origin,
            filename = %artifact.filename,
            "cycle finished"
        );
        Ok(artifact)
    }

    /// Ask the provider until it hands over a valid artifact.
    async fn acquire(&mut self) -> Result<Artifact, BackdropError> {
        let mut attempts: u32 = 0;
        loop {
            attempts = attempts.saturating_add(1);
            let artifact = self.provider.provide().await?;
            if artifact.is_valid() {
                debug!(attempts, origin = %artifact.origin, "artifact acquired");
                return Ok(artifact);
            }
            self.stats.empty_results += 1;
            warn!(
                attempts,
                provider = self.provider.name(),
                origin = %artifact.origin,
                "provider returned an empty artifact, retrying"
            );
            self.retry.pause(attempts).await;
        }
    }
}
