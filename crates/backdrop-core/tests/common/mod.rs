//! Common fixtures: an on-disk environment plus stub provider and applier.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use backdrop_core::domain::Artifact;
use backdrop_core::impls::{
    Download, FetchError, FsLocalCache, Gallery, GalleryEntry, SqliteRepository,
};
use backdrop_core::ports::{Applier, ApplyError, Provider, ProviderError};
use chrono::DateTime;
use tempfile::TempDir;

/// SQLite history and a filesystem cache under one temp directory.
pub struct TestEnv {
    pub dir: TempDir,
    pub repository: Arc<SqliteRepository>,
    pub cache: Arc<FsLocalCache>,
}

impl TestEnv {
    pub fn new(limit: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let repository = Arc::new(SqliteRepository::open(dir.path().join("history.sqlite")).unwrap());
        let cache = Arc::new(
            FsLocalCache::open(dir.path().join("images"), limit, repository.clone()).unwrap(),
        );
        Self {
            dir,
            repository,
            cache,
        }
    }

    pub fn images(&self) -> PathBuf {
        self.dir.path().join("images")
    }

    pub fn cached_files(&self) -> Vec<String> {
        list_files(&self.images())
    }
}

pub fn list_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .filter(|e| e.path().is_file())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}

/// Returns `empties` invalid artifacts first, then numbered valid ones.
pub struct SequenceProvider {
    empties: AtomicUsize,
    produced: AtomicUsize,
    calls: AtomicUsize,
}

impl SequenceProvider {
    pub fn new(empties: usize) -> Self {
        Self {
            empties: AtomicUsize::new(empties),
            produced: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for SequenceProvider {
    fn name(&self) -> &'static str {
        "sequence"
    }

    async fn provide(&self) -> Result<Artifact, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self
            .empties
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Ok(Artifact::new("http://example.com/empty", "empty.png", DateTime::UNIX_EPOCH));
        }
        let n = self.produced.fetch_add(1, Ordering::SeqCst) + 1;
        let fetched_at = DateTime::from_timestamp(10_000 + n as i64 * 60, 0).unwrap();
        Ok(Artifact::new(
            format!("http://example.com/wallpapers/{n}"),
            format!("wall-{n}.png"),
            fetched_at,
        )
        .with_title(format!("Wallpaper {n}"))
        .with_author("tester", "http://example.com/tester")
        .with_bytes(vec![0xAB; 16]))
    }
}

/// Applier that records image paths; fails every call after `fail_after` successes.
pub struct StubApplier {
    cache_dir: PathBuf,
    fail_after: Option<usize>,
    applied: Mutex<Vec<PathBuf>>,
}

impl StubApplier {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            fail_after: None,
            applied: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(cache_dir: impl Into<PathBuf>) -> Self {
        Self::failing_after(cache_dir, 0)
    }

    pub fn failing_after(cache_dir: impl Into<PathBuf>, successes: usize) -> Self {
        Self {
            fail_after: Some(successes),
            ..Self::new(cache_dir)
        }
    }

    pub fn applied(&self) -> Vec<PathBuf> {
        self.applied.lock().unwrap().clone()
    }
}

#[async_trait]
impl Applier for StubApplier {
    fn target(&self) -> &str {
        "stub"
    }

    async fn apply(&self, artifact: &Artifact) -> Result<(), ApplyError> {
        let mut applied = self.applied.lock().unwrap();
        if self.fail_after.is_some_and(|limit| applied.len() >= limit) {
            return Err(ApplyError::UnsupportedEnvironment("stub applier".into()));
        }
        let path = artifact.local_path(&self.cache_dir);
        assert!(path.exists(), "applied image must exist on disk: {}", path.display());
        applied.push(path);
        Ok(())
    }
}

/// In-memory gallery: `pages[i]` is the entry count of page `i + 1`.
pub struct MemoryGallery {
    pages: Vec<usize>,
}

impl MemoryGallery {
    pub fn new(pages: Vec<usize>) -> Self {
        Self { pages }
    }
}

#[async_trait]
impl Gallery for MemoryGallery {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn list_page(&self, page: u32) -> Result<Vec<GalleryEntry>, FetchError> {
        let count = self
            .pages
            .get(page as usize - 1)
            .copied()
            .unwrap_or_default();
        Ok((0..count)
            .map(|i| GalleryEntry {
                page_url: format!("memory://desktops/{page}/{i}"),
                title: format!("Desktop {page}.{i}"),
                author: "Unknown".into(),
                author_url: String::new(),
            })
            .collect())
    }

    async fn download(&self, entry: &GalleryEntry) -> Result<Download, FetchError> {
        let name = entry.page_url.replace('/', "_").replace(':', "");
        Ok(Download {
            filename: format!("{name}.png"),
            bytes: entry.page_url.as_bytes().to_vec(),
        })
    }
}
