//! LocalCache port - bounded on-disk store of artifact bytes.
//!
//! # Design
//! - One flat directory, one file per artifact `filename`
//! - Bounded by file count; `limit == 0` means unlimited
//! - Eviction order comes from repository history (oldest first)
//! - Files unknown to history are never deleted

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::ports::RepositoryError;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("create directory {}: {source}", .path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("list {}: {source}", .path.display())]
    List { path: PathBuf, source: io::Error },

    #[error("remove {}: {source}", .path.display())]
    Remove { path: PathBuf, source: io::Error },

    #[error("invalid filename {0:?}")]
    InvalidFilename(String),

    #[error("read history: {0}")]
    History(#[from] RepositoryError),
}

/// Outcome of one `clean_up` pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanUpReport {
    /// Files in the directory before the pass.
    pub before: usize,
    /// Files left after the pass.
    pub after: usize,
    /// Filenames deleted, oldest first.
    pub removed: Vec<String>,
    /// Files skipped because history does not know them.
    pub orphans: usize,
}

#[async_trait]
pub trait LocalCache: Send + Sync {
    fn directory(&self) -> &Path;

    /// Maximum number of files kept after `clean_up`. `0` disables eviction.
    fn limit(&self) -> usize;

    /// Write `bytes` to `directory/filename`, creating the directory if needed.
    async fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, CacheError>;

    /// Delete the oldest known files until the count is at or below `limit`.
    async fn clean_up(&self) -> Result<CleanUpReport, CacheError>;
}
