//! LocalDirectoryProvider - picks a random image from a directory on disk.
//!
//! The candidate set is re-read on every call and is static for that call,
//! so an unreadable or empty directory is a hard error rather than a retry.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::domain::{Artifact, LOCAL_SCHEME};
use crate::ports::{Clock, Provider, ProviderError};

pub const PROVIDER_NAME: &str = "local_directory";

/// Extensions accepted as images, compared case-insensitively.
const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

pub struct LocalDirectoryProvider {
    directory: PathBuf,
    author: String,
    clock: Arc<dyn Clock>,
}

impl LocalDirectoryProvider {
    pub fn new(directory: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Self {
        let directory = directory.as_ref();
        let directory =
            std::path::absolute(directory).unwrap_or_else(|_| directory.to_path_buf());
        Self {
            directory,
            author: current_user(),
            clock,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    async fn candidates(&self) -> Result<Vec<PathBuf>, ProviderError> {
        let read_error = |source| ProviderError::ReadDir {
            path: self.directory.clone(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&self.directory)
            .await
            .map_err(read_error)?;
        let mut images = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(read_error)? {
            let path = entry.path();
            if is_image(&path) && entry.file_type().await.map_err(read_error)?.is_file() {
                images.push(path);
            }
        }
        Ok(images)
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
}

fn current_user() -> String {
    ["USER", "USERNAME"]
        .into_iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "Someone".to_string())
}

#[async_trait]
impl Provider for LocalDirectoryProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn provide(&self) -> Result<Artifact, ProviderError> {
        let images = self.candidates().await?;
        let Some(path) = images.choose(&mut rand::thread_rng()) else {
            return Err(ProviderError::NoImages(self.directory.clone()));
        };
        debug!(path = %path.display(), candidates = images.len(), "picked local image");

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let title = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(
            Artifact::new(
                format!("{LOCAL_SCHEME}{}", path.display()),
                filename,
                self.clock.now(),
            )
            .with_title(title)
            .with_author(self.author.clone(), ""),
        )
    }
}
