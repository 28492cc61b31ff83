//! AppBuilder - wiring and start-up validation.
//!
//! # Fail-fast
//! - Every component must be supplied before `build()`
//! - The period is parsed in `build()`, so a malformed one never reaches `Running`
//! - `from_config` opens the repository and cache and resolves the applier up front

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::app::Scheduler;
use crate::config::{
    Config, ConfigError, LocalDirectoryOptions, PROVIDER_LOCAL_DIRECTORY,
    PROVIDER_SIMPLE_DESKTOPS, SimpleDesktopsOptions,
};
use crate::domain::{Period, PeriodError, RetryPolicy};
use crate::impls::{
    FsLocalCache, LocalDirectoryProvider, RemoteProvider, SimpleDesktopsGallery,
    SqliteRepository, resolve_applier,
};
use crate::ports::{
    Applier, ApplyError, CacheError, Clock, LocalCache, Provider, ProviderError, Repository,
    RepositoryError, SystemClock,
};

/// BuildError covers everything that keeps the scheduler from starting.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing components: {0:?}")]
    MissingComponents(Vec<&'static str>),

    #[error("invalid period: {0}")]
    Period(#[from] PeriodError),

    #[error("open repository: {0}")]
    Repository(#[from] RepositoryError),

    #[error("open local cache: {0}")]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("unknown provider {0:?}")]
    UnknownProvider(String),

    #[error("initialize provider {name}: {source}")]
    Provider {
        name: String,
        source: ProviderError,
    },

    #[error("resolve applier: {0}")]
    Applier(#[from] ApplyError),
}

/// AppBuilder assembles a `Scheduler`.
///
/// ```ignore
/// let scheduler = AppBuilder::new()
///     .period("30m")
///     .repository(repo.clone())
///     .cache(cache)
///     .provider(provider)
///     .applier(applier)
///     .build()?;
/// ```
#[derive(Default)]
pub struct AppBuilder {
    period: Option<Period>,
    repository: Option<Arc<dyn Repository>>,
    cache: Option<Arc<dyn LocalCache>>,
    provider: Option<Arc<dyn Provider>>,
    applier: Option<Arc<dyn Applier>>,
    retry: RetryPolicy,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire production implementations from a loaded config.
    pub fn from_config(config: &Config) -> Result<Self, BuildError> {
        Self::from_config_with_clock(config, Arc::new(SystemClock))
    }

    pub fn from_config_with_clock(
        config: &Config,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, BuildError> {
        for name in config.unknown_providers() {
            warn!(provider = name, "ignoring unknown provider in config");
        }

        let repository: Arc<dyn Repository> = Arc::new(SqliteRepository::open(config.db_path())?);
        let storage = config.storage_path();
        let cache: Arc<dyn LocalCache> = Arc::new(FsLocalCache::open(
            &storage,
            config.storage_limit(),
            Arc::clone(&repository),
        )?);
        let provider = build_provider(config, clock)?;
        let applier: Arc<dyn Applier> =
            Arc::new(resolve_applier(config.desktop.as_deref(), storage.clone())?);

        info!(
            provider = provider.name(),
            applier = applier.target(),
            storage = %storage.display(),
            limit = config.storage_limit(),
            "components initialized"
        );

        Ok(Self::new()
            .period(config.period.clone())
            .repository(repository)
            .cache(cache)
            .provider(provider)
            .applier(applier)
            .retry(config.retry_policy()))
    }

    pub fn period(mut self, period: impl Into<Period>) -> Self {
        self.period = Some(period.into());
        self
    }

    pub fn repository(mut self, repository: Arc<dyn Repository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn cache(mut self, cache: Arc<dyn LocalCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn applier(mut self, applier: Arc<dyn Applier>) -> Self {
        self.applier = Some(applier);
        self
    }

    /// Pause policy between invalid provider results. Immediate by default.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn build(self) -> Result<Scheduler, BuildError> {
        let mut missing = Vec::new();
        if self.repository.is_none() {
            missing.push("repository");
        }
        if self.cache.is_none() {
            missing.push("cache");
        }
        if self.provider.is_none() {
            missing.push("provider");
        }
        if self.applier.is_none() {
            missing.push("applier");
        }

        let (Some(repository), Some(cache), Some(provider), Some(applier)) =
            (self.repository, self.cache, self.provider, self.applier)
        else {
            return Err(BuildError::MissingComponents(missing));
        };

        let period = self.period.unwrap_or_default();
        let interval = period.to_duration()?;

        Ok(Scheduler::new(
            period, interval, repository, cache, provider, applier, self.retry,
        ))
    }
}

fn build_provider(config: &Config, clock: Arc<dyn Clock>) -> Result<Arc<dyn Provider>, BuildError> {
    let name = config.provider_name();
    match name.as_str() {
        PROVIDER_SIMPLE_DESKTOPS => {
            let options: SimpleDesktopsOptions = config.provider_options(&name)?;
            let gallery = SimpleDesktopsGallery::new(options.request_timeout())
                .map_err(|source| BuildError::Provider {
                    name: name.clone(),
                    source,
                })?;
            Ok(Arc::new(
                RemoteProvider::new(gallery, options.remote_options(), clock)
                    .with_retry(config.retry_policy()),
            ))
        }
        PROVIDER_LOCAL_DIRECTORY => {
            let options: LocalDirectoryOptions = config.provider_options(&name)?;
            let directory = options
                .path
                .map(|p| PathBuf::from(p.trim()))
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| config.storage_path());
            Ok(Arc::new(LocalDirectoryProvider::new(directory, clock)))
        }
        _ => Err(BuildError::UnknownProvider(name)),
    }
}
