//! FsLocalCache - the local cache as a flat directory of image files.
//!
//! # Eviction
//! 1. List regular files in the directory
//! 2. Stop if the count is within `limit`
//! 3. Rank files by their newest downloaded history row (repository order is newest first)
//! 4. Delete from the oldest end until the count is within `limit`
//!
//! Files with no downloaded history row are orphans: counted, logged, never
//! deleted. Rows with a `file://` origin point at images the cache did not
//! write, so they never rank a file for eviction. The newest `limit` ranked
//! files always survive, even when orphans keep the directory over its limit.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::ports::{CacheError, CleanUpReport, LocalCache, Repository};

pub struct FsLocalCache {
    directory: PathBuf,
    limit: usize,
    history: Arc<dyn Repository>,
}

impl FsLocalCache {
    /// The directory itself is created lazily on the first `save`.
    pub fn open(
        directory: impl Into<PathBuf>,
        limit: usize,
        history: Arc<dyn Repository>,
    ) -> Result<Self, CacheError> {
        let directory = directory.into();
        if directory.exists() && !directory.is_dir() {
            return Err(CacheError::NotADirectory(directory));
        }
        Ok(Self {
            directory,
            limit,
            history,
        })
    }

    async fn list_files(&self) -> Result<Vec<String>, CacheError> {
        let list_error = |source| CacheError::List {
            path: self.directory.clone(),
            source,
        };

        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(list_error(e)),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(list_error)? {
            let file_type = entry.file_type().await.map_err(list_error)?;
            if !file_type.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                files.push(name.to_string());
            }
        }
        Ok(files)
    }
}

fn validate_filename(filename: &str) -> Result<(), CacheError> {
    let invalid = filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\'])
        || filename.contains('\0');
    if invalid {
        return Err(CacheError::InvalidFilename(filename.to_string()));
    }
    Ok(())
}

#[async_trait]
impl LocalCache for FsLocalCache {
    fn directory(&self) -> &Path {
        &self.directory
    }

    fn limit(&self) -> usize {
        self.limit
    }

    async fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, CacheError> {
        validate_filename(filename)?;

        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|source| CacheError::CreateDir {
                path: self.directory.clone(),
                source,
            })?;

        let path = self.directory.join(filename);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| CacheError::Write {
                path: path.clone(),
                source,
            })?;

        info!(path = %path.display(), kib = bytes.len() / 1024, "saved image to local cache");
        Ok(path)
    }

    async fn clean_up(&self) -> Result<CleanUpReport, CacheError> {
        let files = self.list_files().await?;
        let before = files.len();
        if self.limit == 0 || before <= self.limit {
            return Ok(CleanUpReport {
                before,
                after: before,
                ..CleanUpReport::default()
            });
        }

        let history = self.history.list().await?;

        // rank 0 is the newest row; the first occurrence of a filename wins
        let mut rank: HashMap<&str, usize> = HashMap::new();
        for (position, artifact) in history.iter().enumerate() {
            if artifact.is_local() {
                continue;
            }
            rank.entry(artifact.filename.as_str()).or_insert(position);
        }

        let mut known: Vec<(usize, &String)> = files
            .iter()
            .filter_map(|name| rank.get(name.as_str()).map(|r| (*r, name)))
            .collect();
        let orphans = before - known.len();
        known.sort_by(|a, b| b.0.cmp(&a.0));

        let excess = known.len().saturating_sub(self.limit).min(before - self.limit);
        let mut removed = Vec::with_capacity(excess);
        for (_, name) in known.into_iter().take(excess) {
            let path = self.directory.join(name);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(path = %path.display(), "evicted cached image"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(path = %path.display(), "cached image already gone");
                }
                Err(source) => return Err(CacheError::Remove { path, source }),
            }
            removed.push(name.clone());
        }

        let after = before - removed.len();
        if after > self.limit {
            warn!(
                directory = %self.directory.display(),
                orphans,
                after,
                limit = self.limit,
                "local cache stays above limit; orphan files are never evicted"
            );
        }
        info!(removed = removed.len(), after, limit = self.limit, "local cache cleaned up");

        Ok(CleanUpReport {
            before,
            after,
            removed,
            orphans,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Artifact;
    use crate::impls::InMemoryRepository;
    use chrono::{TimeZone, Utc};

    async fn record(repo: &InMemoryRepository, filename: &str, secs: i64) {
        let at = Utc.timestamp_opt(secs, 0).unwrap();
        repo.add(&Artifact::new(format!("http://example.com/{filename}"), filename, at))
            .await
            .unwrap();
    }

    fn cache_with(
        dir: &Path,
        limit: usize,
    ) -> (FsLocalCache, Arc<InMemoryRepository>) {
        let repo = Arc::new(InMemoryRepository::new());
        let cache = FsLocalCache::open(dir.join("images"), limit, repo.clone()).unwrap();
        (cache, repo)
    }

    fn sorted(mut names: Vec<String>) -> Vec<String> {
        names.sort();
        names
    }

    #[tokio::test]
    async fn save_creates_directory_on_first_use() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, _) = cache_with(dir.path(), 3);
        assert!(!cache.directory().exists());

        let path = cache.save("a.png", b"png").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"png");
        assert_eq!(path, cache.directory().join("a.png"));
    }

    #[tokio::test]
    async fn save_rejects_path_like_filenames() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, _) = cache_with(dir.path(), 3);
        for name in ["", "..", "../escape.png", "a/b.png"] {
            assert!(matches!(
                cache.save(name, b"x").await,
                Err(CacheError::InvalidFilename(_))
            ));
        }
    }

    #[tokio::test]
    async fn save_fails_when_directory_cannot_be_created() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file").unwrap();

        let cache = FsLocalCache::open(
            blocker.join("images"),
            3,
            Arc::new(InMemoryRepository::new()),
        )
        .unwrap();
        assert!(matches!(
            cache.save("a.png", b"x").await,
            Err(CacheError::CreateDir { .. })
        ));
    }

    #[test]
    fn open_rejects_a_file_as_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("images");
        std::fs::write(&file, b"file").unwrap();
        assert!(matches!(
            FsLocalCache::open(&file, 3, Arc::new(InMemoryRepository::new())),
            Err(CacheError::NotADirectory(_))
        ));
    }

    #[tokio::test]
    async fn clean_up_is_noop_within_limit() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, repo) = cache_with(dir.path(), 3);
        for (i, name) in ["a.png", "b.png", "c.png"].iter().enumerate() {
            record(&repo, name, i as i64).await;
            cache.save(name, b"x").await.unwrap();
        }

        let report = cache.clean_up().await.unwrap();
        assert_eq!(report.before, 3);
        assert_eq!(report.after, 3);
        assert!(report.removed.is_empty());
    }

    #[tokio::test]
    async fn clean_up_evicts_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, repo) = cache_with(dir.path(), 2);
        record(&repo, "newest.png", 300).await;
        record(&repo, "oldest.png", 100).await;
        record(&repo, "middle.png", 200).await;
        for name in ["newest.png", "oldest.png", "middle.png"] {
            cache.save(name, b"x").await.unwrap();
        }

        let report = cache.clean_up().await.unwrap();
        assert_eq!(report.removed, vec!["oldest.png".to_string()]);
        assert_eq!(
            sorted(cache.list_files().await.unwrap()),
            vec!["middle.png".to_string(), "newest.png".to_string()]
        );
    }

    #[tokio::test]
    async fn clean_up_never_deletes_orphans() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, repo) = cache_with(dir.path(), 1);
        record(&repo, "known-old.png", 100).await;
        record(&repo, "known-new.png", 200).await;
        for name in ["known-old.png", "known-new.png", "orphan-1.png", "orphan-2.png"] {
            cache.save(name, b"x").await.unwrap();
        }

        let report = cache.clean_up().await.unwrap();
        assert_eq!(report.orphans, 2);
        assert_eq!(report.removed, vec!["known-old.png".to_string()]);
        assert_eq!(report.after, 3);
        assert_eq!(
            sorted(cache.list_files().await.unwrap()),
            vec![
                "known-new.png".to_string(),
                "orphan-1.png".to_string(),
                "orphan-2.png".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn clean_up_keeps_newest_file_when_orphans_fill_the_limit() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, repo) = cache_with(dir.path(), 1);
        cache.save("hand-placed.png", b"x").await.unwrap();
        record(&repo, "latest.png", 100).await;
        cache.save("latest.png", b"x").await.unwrap();

        let report = cache.clean_up().await.unwrap();
        assert!(report.removed.is_empty());
        assert_eq!(report.after, 2);
        assert!(cache.directory().join("latest.png").exists());
    }

    #[tokio::test]
    async fn clean_up_never_evicts_local_origin_files() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, repo) = cache_with(dir.path(), 1);
        for (i, name) in ["a.jpg", "b.jpg", "c.jpg"].iter().enumerate() {
            cache.save(name, b"x").await.unwrap();
            let origin = format!("file://{}", cache.directory().join(name).display());
            repo.add(&Artifact::new(origin, *name, Utc.timestamp_opt(i as i64, 0).unwrap()))
                .await
                .unwrap();
        }

        let report = cache.clean_up().await.unwrap();
        assert_eq!(report.orphans, 3);
        assert!(report.removed.is_empty());
        assert_eq!(cache.list_files().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn clean_up_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, repo) = cache_with(dir.path(), 2);
        for i in 0..5 {
            let name = format!("img-{i}.png");
            record(&repo, &name, i).await;
            cache.save(&name, b"x").await.unwrap();
        }
        cache.save("orphan.png", b"x").await.unwrap();

        let first = cache.clean_up().await.unwrap();
        let second = cache.clean_up().await.unwrap();

        // two newest ranked files plus the orphan
        assert_eq!(first.after, 3);
        assert_eq!(first.removed.len(), 3);
        assert_eq!(second.after, first.after);
        assert!(second.removed.is_empty());
    }

    #[tokio::test]
    async fn clean_up_deletes_only_what_is_needed() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, repo) = cache_with(dir.path(), 4);
        for i in 0..6 {
            let name = format!("img-{i}.png");
            record(&repo, &name, i).await;
            cache.save(&name, b"x").await.unwrap();
        }

        let report = cache.clean_up().await.unwrap();
        assert_eq!(
            report.removed,
            vec!["img-0.png".to_string(), "img-1.png".to_string()]
        );
        assert_eq!(report.after, 4);
    }

    #[tokio::test]
    async fn clean_up_ignores_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, repo) = cache_with(dir.path(), 1);
        record(&repo, "a.png", 1).await;
        cache.save("a.png", b"x").await.unwrap();
        std::fs::create_dir(cache.directory().join("nested")).unwrap();

        let report = cache.clean_up().await.unwrap();
        assert_eq!(report.before, 1);
        assert!(report.removed.is_empty());
    }

    #[tokio::test]
    async fn clean_up_on_missing_directory_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, _) = cache_with(dir.path(), 1);
        let report = cache.clean_up().await.unwrap();
        assert_eq!(report, CleanUpReport::default());
    }
}
