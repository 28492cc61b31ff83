//! Provider port - produces a fresh artifact on demand.
//!
//! # Contract
//! - `provide` returns an artifact with non-empty bytes (remote) or a local origin
//! - transient failures are retried inside the provider; an `Err` is non-retryable
//! - source-specific options are applied at construction, before any `provide`

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::Artifact;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("read directory {}: {source}", .path.display())]
    ReadDir { path: PathBuf, source: io::Error },

    #[error("no images found in {}", .0.display())]
    NoImages(PathBuf),

    #[error("http client: {0}")]
    Client(String),
}

#[async_trait]
pub trait Provider: Send + Sync {
    /// Name as used in the `providers` config section.
    fn name(&self) -> &'static str;

    async fn provide(&self) -> Result<Artifact, ProviderError>;
}
