//! Artifact - an acquired image plus its provenance.
//!
//! # Lifecycle
//! 1. A `Provider` builds the artifact (`id` unset, `bytes` filled for remote origins)
//! 2. `Repository::add` assigns the id
//! 3. `LocalCache::save` persists the bytes, after which the buffer is dropped
//! 4. Eviction may later remove the cached file; the history row stays

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Origins with this scheme already live on the local disk.
pub const LOCAL_SCHEME: &str = "file://";

/// Identifier assigned by the repository on insert.
///
/// `0` means "not inserted yet".
#[repr(transparent)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ArtifactId(i64);

impl ArtifactId {
    pub const UNSET: Self = Self(0);

    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn get(self) -> i64 {
        self.0
    }

    pub fn is_unset(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "artifact-{}", self.0)
    }
}

/// Where an artifact came from, derived from its origin scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginKind {
    Local,
    Remote,
}

impl OriginKind {
    pub fn of(origin: &str) -> Self {
        if origin.starts_with(LOCAL_SCHEME) {
            OriginKind::Local
        } else {
            OriginKind::Remote
        }
    }
}

/// An image and its metadata.
///
/// `bytes` is transient: it is never serialized and never stored in the repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    /// Source URL or `file://` URI. Used as the dedup key.
    pub origin: String,
    /// Name of the file inside the local cache directory.
    pub filename: String,
    pub fetched_at: DateTime<Utc>,
    pub title: String,
    pub author: String,
    pub author_url: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(
        origin: impl Into<String>,
        filename: impl Into<String>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ArtifactId::UNSET,
            origin: origin.into(),
            filename: filename.into(),
            fetched_at,
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>, author_url: impl Into<String>) -> Self {
        self.author = author.into();
        self.author_url = author_url.into();
        self
    }

    pub fn with_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.bytes = bytes;
        self
    }

    pub fn is_local(&self) -> bool {
        self.origin_kind() == OriginKind::Local
    }

    pub fn origin_kind(&self) -> OriginKind {
        OriginKind::of(&self.origin)
    }

    /// Usable by the scheduler: either carries bytes or already lives on disk.
    pub fn is_valid(&self) -> bool {
        !self.bytes.is_empty() || self.is_local()
    }

    /// Hand the payload over, leaving an empty buffer behind.
    pub fn take_bytes(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }

    /// Path of the image file an applier should point the desktop at.
    ///
    /// Local origins carry their own path; everything else lives in the cache directory.
    pub fn local_path(&self, cache_dir: &Path) -> PathBuf {
        match self.origin.strip_prefix(LOCAL_SCHEME) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => cache_dir.join(&self.filename),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_with_bytes_is_valid() {
        let artifact = Artifact::new("http://example.com/a", "a.png", Utc::now())
            .with_bytes(vec![1, 2, 3]);
        assert!(artifact.is_valid());
        assert!(!artifact.is_local());
    }

    #[test]
    fn empty_remote_artifact_is_invalid() {
        assert!(!Artifact::default().is_valid());
        assert!(!Artifact::new("http://example.com/a", "a.png", Utc::now()).is_valid());
    }

    #[test]
    fn local_artifact_is_valid_without_bytes() {
        let artifact = Artifact::new("file:///pictures/a.png", "a.png", Utc::now());
        assert!(artifact.is_valid());
        assert_eq!(artifact.origin_kind(), OriginKind::Local);
    }

    #[test]
    fn take_bytes_leaves_empty_buffer() {
        let mut artifact =
            Artifact::new("http://example.com/a", "a.png", Utc::now()).with_bytes(vec![7; 4]);
        let bytes = artifact.take_bytes();
        assert_eq!(bytes.len(), 4);
        assert!(artifact.bytes.is_empty());
    }

    #[test]
    fn local_path_prefers_origin_path_for_local_files() {
        let cache = Path::new("/cache");
        let local = Artifact::new("file:///pictures/a.png", "a.png", Utc::now());
        let remote = Artifact::new("http://example.com/a", "x-a.png", Utc::now());

        assert_eq!(local.local_path(cache), PathBuf::from("/pictures/a.png"));
        assert_eq!(remote.local_path(cache), PathBuf::from("/cache/x-a.png"));
    }

    #[test]
    fn unset_id_displays_with_prefix() {
        assert!(ArtifactId::UNSET.is_unset());
        assert_eq!(ArtifactId::new(42).to_string(), "artifact-42");
    }
}
