//! Stub ports shared by unit tests.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::DateTime;

use crate::domain::{Artifact, ArtifactId};
use crate::impls::{FsLocalCache, InMemoryRepository};
use crate::ports::{
    Applier, ApplyError, LocalCache, Provider, ProviderError, Repository, RepositoryError,
};

pub fn cache_in(dir: &Path, limit: usize, history: Arc<dyn Repository>) -> Arc<dyn LocalCache> {
    Arc::new(FsLocalCache::open(dir.join("cache"), limit, history).unwrap())
}

pub enum Step {
    Valid,
    Empty,
    Fail,
}

/// Plays back scripted steps, then returns valid remote artifacts forever.
///
/// Valid artifact `n` has origin `http://example.com/n`, filename `img-n.png`
/// and `fetched_at` of `1000 + n` seconds, so later ones are newer.
#[derive(Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
    produced: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            script: Mutex::new(steps.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn provide(&self) -> Result<Artifact, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.script.lock().unwrap().pop_front().unwrap_or(Step::Valid);
        match step {
            Step::Valid => {
                let n = self.produced.fetch_add(1, Ordering::SeqCst) + 1;
                let fetched_at = DateTime::from_timestamp(1_000 + n as i64, 0).unwrap();
                Ok(Artifact::new(
                    format!("http://example.com/{n}"),
                    format!("img-{n}.png"),
                    fetched_at,
                )
                .with_bytes(vec![n as u8; 8]))
            }
            Step::Empty => Ok(Artifact::new("http://example.com/empty", "", chrono::Utc::now())),
            Step::Fail => Err(ProviderError::Client("scripted failure".into())),
        }
    }
}

/// In-memory history that counts writes and can be told to fail them.
#[derive(Default)]
pub struct CountingRepository {
    inner: InMemoryRepository,
    adds: AtomicUsize,
    fail_adds: AtomicBool,
}

impl CountingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let repo = Self::default();
        repo.fail_adds.store(true, Ordering::SeqCst);
        repo
    }

    pub fn adds(&self) -> usize {
        self.adds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Repository for CountingRepository {
    async fn add(&self, artifact: &Artifact) -> Result<ArtifactId, RepositoryError> {
        self.adds.fetch_add(1, Ordering::SeqCst);
        if self.fail_adds.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("scripted failure".into()));
        }
        self.inner.add(artifact).await
    }

    async fn list(&self) -> Result<Vec<Artifact>, RepositoryError> {
        self.inner.list().await
    }

    async fn get(&self, id: ArtifactId) -> Result<Option<Artifact>, RepositoryError> {
        self.inner.get(id).await
    }

    async fn exists(&self, origin: &str) -> Result<bool, RepositoryError> {
        self.inner.exists(origin).await
    }

    async fn clear_all(&self) -> Result<(), RepositoryError> {
        self.inner.clear_all().await
    }
}

/// Wraps a cache and counts calls.
pub struct CountingCache {
    inner: Arc<dyn LocalCache>,
    saves: AtomicUsize,
    clean_ups: AtomicUsize,
}

impl CountingCache {
    pub fn new(inner: Arc<dyn LocalCache>) -> Self {
        Self {
            inner,
            saves: AtomicUsize::new(0),
            clean_ups: AtomicUsize::new(0),
        }
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn clean_ups(&self) -> usize {
        self.clean_ups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocalCache for CountingCache {
    fn directory(&self) -> &Path {
        self.inner.directory()
    }

    fn limit(&self) -> usize {
        self.inner.limit()
    }

    async fn save(
        &self,
        filename: &str,
        bytes: &[u8],
    ) -> Result<std::path::PathBuf, crate::ports::CacheError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(filename, bytes).await
    }

    async fn clean_up(&self) -> Result<crate::ports::CleanUpReport, crate::ports::CacheError> {
        self.clean_ups.fetch_add(1, Ordering::SeqCst);
        self.inner.clean_up().await
    }
}

/// Records applied artifacts; fails every call once `fail_after` successes happened.
#[derive(Default)]
pub struct RecordingApplier {
    applied: Mutex<Vec<Artifact>>,
    attempts: AtomicUsize,
    fail_after: Option<usize>,
}

impl RecordingApplier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self::failing_after(0)
    }

    pub fn failing_after(successes: usize) -> Self {
        Self {
            fail_after: Some(successes),
            ..Self::default()
        }
    }

    pub fn applied(&self) -> Vec<Artifact> {
        self.applied.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Applier for RecordingApplier {
    fn target(&self) -> &str {
        "recording"
    }

    async fn apply(&self, artifact: &Artifact) -> Result<(), ApplyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let mut applied = self.applied.lock().unwrap();
        if self.fail_after.is_some_and(|limit| applied.len() >= limit) {
            return Err(ApplyError::Exit {
                program: "recording".into(),
                status: "exit status: 1".into(),
                stderr: "scripted failure".into(),
            });
        }
        applied.push(artifact.clone());
        Ok(())
    }
}
