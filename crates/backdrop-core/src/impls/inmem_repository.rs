//! InMemoryRepository - non-durable history for development and tests.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Artifact, ArtifactId};
use crate::ports::{Repository, RepositoryError};

#[derive(Default)]
struct State {
    rows: Vec<Artifact>,
    next_id: i64,
}

/// InMemoryRepository keeps rows in insertion order behind a tokio `Mutex`.
#[derive(Default)]
pub struct InMemoryRepository {
    state: Mutex<State>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn add(&self, artifact: &Artifact) -> Result<ArtifactId, RepositoryError> {
        let mut state = self.state.lock().await;
        state.next_id += 1;
        let id = ArtifactId::new(state.next_id);

        let mut row = artifact.clone();
        row.id = id;
        row.bytes = Vec::new();
        state.rows.push(row);
        Ok(id)
    }

    async fn list(&self) -> Result<Vec<Artifact>, RepositoryError> {
        let state = self.state.lock().await;
        let mut rows = state.rows.clone();
        rows.sort_by(|a, b| b.fetched_at.cmp(&a.fetched_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn get(&self, id: ArtifactId) -> Result<Option<Artifact>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.rows.iter().find(|row| row.id == id).cloned())
    }

    async fn exists(&self, origin: &str) -> Result<bool, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.rows.iter().any(|row| row.origin == origin))
    }

    async fn clear_all(&self) -> Result<(), RepositoryError> {
        self.state.lock().await.rows.clear();
        Ok(())
    }
}
