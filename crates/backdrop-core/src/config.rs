//! Configuration record and JSON loading.
//!
//! The file is optional. Every key has a default, and `fill_defaults`
//! applies the rules that depend on the home directory.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Period, RetryPolicy};
use crate::impls::RemoteOptions;

pub const PROVIDER_SIMPLE_DESKTOPS: &str = "simpledesktops";
pub const PROVIDER_LOCAL_DIRECTORY: &str = "local_directory";
pub const KNOWN_PROVIDERS: [&str; 2] = [PROVIDER_SIMPLE_DESKTOPS, PROVIDER_LOCAL_DIRECTORY];

/// Limit substituted for a negative `local_storage_limit`.
pub const FALLBACK_STORAGE_LIMIT: usize = 100;

const APP_DIR: &str = ".backdrop";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("read config {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("parse config {origin}: {source}")]
    Parse {
        origin: String,
        source: serde_json::Error,
    },

    #[error("options for provider {provider}: {source}")]
    ProviderOptions {
        provider: String,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub period: Period,
    pub local_storage_path: String,
    /// `0` is unlimited; negative values fall back to `FALLBACK_STORAGE_LIMIT`.
    pub local_storage_limit: i64,
    pub db_path: String,
    /// Active provider. Defaults to the first configured one, by name.
    pub provider: Option<String>,
    pub providers: BTreeMap<String, serde_json::Value>,
    /// Forces the applier target instead of detecting it.
    pub desktop: Option<String>,
    pub retry: Option<RetryConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            period: Period::default(),
            local_storage_path: String::new(),
            local_storage_limit: 0,
            db_path: String::new(),
            provider: None,
            providers: BTreeMap::new(),
            desktop: None,
            retry: None,
        }
    }
}

impl Config {
    pub fn default_path() -> PathBuf {
        home_dir().join(APP_DIR).join("config.json")
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut config: Config = serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            origin: "<inline>".to_string(),
            source,
        })?;
        config.fill_defaults();
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                origin: path.display().to_string(),
                source,
            })?;
        config.fill_defaults();
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Like `from_file`, but a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match Self::from_file(path.as_ref()) {
            Err(ConfigError::Read { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.as_ref().display(), "no config file, using defaults");
                let mut config = Self::default();
                config.fill_defaults();
                Ok(config)
            }
            other => other,
        }
    }

    pub fn fill_defaults(&mut self) {
        self.fill_defaults_with_home(&home_dir());
    }

    pub fn fill_defaults_with_home(&mut self, home: &Path) {
        let app_dir = home.join(APP_DIR);

        self.local_storage_path =
            resolve_path(&self.local_storage_path, home, app_dir.join("images"));
        self.db_path = resolve_path(&self.db_path, home, app_dir.join("backdrop.sqlite"));

        if self.local_storage_limit < 0 {
            self.local_storage_limit = FALLBACK_STORAGE_LIMIT as i64;
        }
        self.provider = self
            .provider
            .take()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        self.desktop = self
            .desktop
            .take()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
    }

    pub fn storage_path(&self) -> PathBuf {
        PathBuf::from(&self.local_storage_path)
    }

    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.db_path)
    }

    pub fn storage_limit(&self) -> usize {
        usize::try_from(self.local_storage_limit).unwrap_or(FALLBACK_STORAGE_LIMIT)
    }

    pub fn provider_name(&self) -> String {
        self.provider
            .clone()
            .or_else(|| self.providers.keys().next().cloned())
            .unwrap_or_else(|| PROVIDER_SIMPLE_DESKTOPS.to_string())
    }

    /// Configured provider names this build does not know.
    pub fn unknown_providers(&self) -> Vec<&str> {
        self.providers
            .keys()
            .map(String::as_str)
            .filter(|name| !KNOWN_PROVIDERS.contains(name))
            .collect()
    }

    /// Options for `provider`, or `T::default()` when the section is absent.
    pub fn provider_options<T>(&self, provider: &str) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Default,
    {
        match self.providers.get(provider) {
            None | Some(serde_json::Value::Null) => Ok(T::default()),
            Some(value) => {
                serde_json::from_value(value.clone()).map_err(|source| {
                    ConfigError::ProviderOptions {
                        provider: provider.to_string(),
                        source,
                    }
                })
            }
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
            .as_ref()
            .map_or_else(RetryPolicy::immediate, RetryConfig::policy)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 0,
            multiplier: 2.0,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        if self.base_delay_ms == 0 {
            return RetryPolicy::immediate();
        }
        RetryPolicy::backoff(
            Duration::from_millis(self.base_delay_ms),
            self.multiplier,
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleDesktopsOptions {
    pub max_fetch_pages: u32,
    pub probes_per_round: usize,
    pub max_in_flight: usize,
    pub request_timeout_secs: u64,
}

impl Default for SimpleDesktopsOptions {
    fn default() -> Self {
        Self {
            max_fetch_pages: 10,
            probes_per_round: 4,
            max_in_flight: 2,
            request_timeout_secs: 30,
        }
    }
}

impl SimpleDesktopsOptions {
    pub fn remote_options(&self) -> RemoteOptions {
        RemoteOptions {
            max_fetch_pages: self.max_fetch_pages.max(2),
            probes_per_round: self.probes_per_round.max(1),
            max_in_flight: self.max_in_flight.max(1),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalDirectoryOptions {
    /// Directory to pick from. Defaults to `local_storage_path`.
    pub path: Option<String>,
}

fn home_dir() -> PathBuf {
    ["HOME", "USERPROFILE"]
        .into_iter()
        .filter_map(std::env::var_os)
        .find(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn resolve_path(raw: &str, home: &Path, fallback: PathBuf) -> String {
    let raw = raw.trim();
    let path = if raw.is_empty() {
        fallback
    } else if raw == "~" {
        home.to_path_buf()
    } else if let Some(rest) = raw.strip_prefix("~/") {
        home.join(rest)
    } else {
        PathBuf::from(raw)
    };
    path.to_string_lossy().into_owned()
}
