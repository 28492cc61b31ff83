//! Ports - abstraction layer.
//!
//! Each trait is the seam between the scheduler and an external system
//! (SQLite, the filesystem, a remote gallery, the desktop environment).
//!
//! # Design
//! - The repository is the source of truth for history
//! - The local cache only holds bytes and defers to history for eviction order
//! - Providers and appliers are polymorphic and chosen at startup

pub mod applier;
pub mod clock;
pub mod local_cache;
pub mod provider;
pub mod repository;

pub use self::applier::{Applier, ApplyError};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::local_cache::{CacheError, CleanUpReport, LocalCache};
pub use self::provider::{Provider, ProviderError};
pub use self::repository::{Repository, RepositoryError};
