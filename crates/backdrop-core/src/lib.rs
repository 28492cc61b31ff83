//! backdrop-core
//!
//! Core building blocks for the backdrop wallpaper rotator.
//!
//! # Modules
//! - **domain**: data model (artifact, period, state, retry policy, history query)
//! - **ports**: abstraction layer (Repository, LocalCache, Provider, Applier, Clock)
//! - **app**: application logic (builder, scheduler, status)
//! - **impls**: SQLite history, filesystem cache, providers, desktop appliers
//! - **config**: JSON configuration
//! - **error**: scheduler-level errors and their kinds

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod ports;

#[cfg(test)]
pub(crate) mod test_support;

pub use self::app::{AppBuilder, BuildError, Scheduler, SchedulerStats};
pub use self::config::{Config, ConfigError};
pub use self::error::{BackdropError, ErrorKind};
