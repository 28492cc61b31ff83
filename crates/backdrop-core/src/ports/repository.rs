//! Repository port - durable, append-only history of artifacts.
//!
//! # Design
//! - Rows are immutable after insert; there is no update
//! - `add` does not enforce origin uniqueness; callers that care use `exists`
//! - Only `clear_all` deletes rows; cache eviction never touches history

use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::{Artifact, ArtifactId, HistoryQuery};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("open {}: {message}", .path.display())]
    Open { path: PathBuf, message: String },

    #[error("{operation}: {message}")]
    Query {
        operation: &'static str,
        message: String,
    },

    #[error("repository is unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Repository: Send + Sync {
    /// Insert a new row and return its freshly assigned id.
    async fn add(&self, artifact: &Artifact) -> Result<ArtifactId, RepositoryError>;

    /// All rows, newest first (by `fetched_at`, then by id).
    async fn list(&self) -> Result<Vec<Artifact>, RepositoryError>;

    async fn get(&self, id: ArtifactId) -> Result<Option<Artifact>, RepositoryError>;

    async fn exists(&self, origin: &str) -> Result<bool, RepositoryError>;

    /// Destructive: removes every row.
    async fn clear_all(&self) -> Result<(), RepositoryError>;

    async fn query(&self, query: &HistoryQuery) -> Result<Vec<Artifact>, RepositoryError> {
        Ok(query.apply(self.list().await?))
    }
}
