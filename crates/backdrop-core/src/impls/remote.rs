//! RemoteProvider - adaptive random sampling over a paged remote gallery.
//!
//! # Algorithm
//! 1. Pick a page uniformly in `[1, upper_bound)`
//! 2. Fetch it; an empty page shrinks `upper_bound` to `page - 1`
//! 3. Pick one entry uniformly, download its image
//! 4. Any fetch error is "nothing this attempt"; the next round starts
//!    after `RetryPolicy::pause` (immediate by default)
//!
//! Each round runs `probes_per_round` attempts concurrently. A semaphore
//! admits at most `max_in_flight` of them to the network at once, and the
//! first attempt that yields bytes wins; the rest are dropped.
//!
//! `upper_bound` only ever decreases and never drops below 2, so page 1
//! stays reachable.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use rand::Rng;
use rand::seq::SliceRandom;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::domain::{Artifact, RetryPolicy};
use crate::ports::{Clock, Provider, ProviderError};

const MIN_UPPER_BOUND: u32 = 2;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request {url}: {message}")]
    Request { url: String, message: String },

    #[error("{url} answered {status}")]
    Status { url: String, status: u16 },

    #[error("parse {url}: {message}")]
    Parse { url: String, message: String },

    #[error("{url} returned an empty body")]
    Empty { url: String },
}

impl FetchError {
    /// The page does not exist, as opposed to a transport failure.
    pub fn is_missing_page(&self) -> bool {
        matches!(self, FetchError::Status { status: 404, .. })
    }
}

/// One listing entry of a gallery page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GalleryEntry {
    /// Detail page of the entry; becomes the artifact origin.
    pub page_url: String,
    pub title: String,
    pub author: String,
    pub author_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Site-specific access to a paged image gallery.
#[async_trait]
pub trait Gallery: Send + Sync {
    fn name(&self) -> &'static str;

    /// Entries on listing page `page` (1-based). An empty vec means the page has no entries.
    async fn list_page(&self, page: u32) -> Result<Vec<GalleryEntry>, FetchError>;

    async fn download(&self, entry: &GalleryEntry) -> Result<Download, FetchError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteOptions {
    /// Initial exclusive upper bound on page numbers.
    pub max_fetch_pages: u32,
    pub probes_per_round: usize,
    /// Admission gate size: concurrent outbound fetches.
    pub max_in_flight: usize,
}

impl Default for RemoteOptions {
    fn default() -> Self {
        Self {
            max_fetch_pages: 10,
            probes_per_round: 4,
            max_in_flight: 2,
        }
    }
}

#[derive(Debug)]
enum Probe {
    Found(Artifact),
    EmptyPage,
    Failed,
}

pub struct RemoteProvider<G> {
    gallery: G,
    upper_bound: Mutex<u32>,
    admission: Semaphore,
    probes_per_round: usize,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl<G: Gallery> RemoteProvider<G> {
    pub fn new(gallery: G, options: RemoteOptions, clock: Arc<dyn Clock>) -> Self {
        Self {
            gallery,
            upper_bound: Mutex::new(options.max_fetch_pages.max(MIN_UPPER_BOUND)),
            admission: Semaphore::new(options.max_in_flight.max(1)),
            probes_per_round: options.probes_per_round.max(1),
            retry: RetryPolicy::immediate(),
            clock,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn gallery(&self) -> &G {
        &self.gallery
    }

    /// Current exclusive upper bound on page numbers.
    pub fn upper_bound(&self) -> u32 {
        *self.upper_bound.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pick_page(&self) -> u32 {
        let upper = self.upper_bound();
        if upper <= MIN_UPPER_BOUND {
            return 1;
        }
        rand::thread_rng().gen_range(1..upper)
    }

    fn shrink(&self, empty_page: u32) {
        let mut upper = self.upper_bound.lock().unwrap_or_else(PoisonError::into_inner);
        let candidate = empty_page.saturating_sub(1).max(MIN_UPPER_BOUND);
        if candidate < *upper {
            info!(page = empty_page, from = *upper, to = candidate, "narrowed page range");
            *upper = candidate;
        }
    }

    async fn probe(&self) -> Probe {
        let Ok(_permit) = self.admission.acquire().await else {
            return Probe::Failed;
        };
        // drawn under the permit so queued probes see bounds shrunk meanwhile
        let page = self.pick_page();

        let entries = match self.gallery.list_page(page).await {
            Ok(entries) if entries.is_empty() => {
                debug!(page, "empty listing page");
                self.shrink(page);
                return Probe::EmptyPage;
            }
            Ok(entries) => entries,
            Err(e) if e.is_missing_page() => {
                debug!(page, error = %e, "listing page missing");
                self.shrink(page);
                return Probe::EmptyPage;
            }
            Err(e) => {
                warn!(page, error = %e, "listing page fetch failed");
                return Probe::Failed;
            }
        };

        let Some(entry) = entries.choose(&mut rand::thread_rng()).cloned() else {
            return Probe::EmptyPage;
        };
        debug!(page, entries = entries.len(), origin = %entry.page_url, "probing entry");

        match self.gallery.download(&entry).await {
            Ok(download) if !download.bytes.is_empty() => Probe::Found(
                Artifact::new(entry.page_url, download.filename, self.clock.now())
                    .with_title(entry.title)
                    .with_author(entry.author, entry.author_url)
                    .with_bytes(download.bytes),
            ),
            Ok(_) => {
                warn!(page, origin = %entry.page_url, "download returned no bytes");
                Probe::Failed
            }
            Err(e) => {
                warn!(page, origin = %entry.page_url, error = %e, "download failed");
                Probe::Failed
            }
        }
    }
}

#[async_trait]
impl<G: Gallery> Provider for RemoteProvider<G> {
    fn name(&self) -> &'static str {
        self.gallery.name()
    }

    async fn provide(&self) -> Result<Artifact, ProviderError> {
        let mut round: u32 = 0;
        loop {
            round = round.saturating_add(1);
            let mut probes: FuturesUnordered<_> =
                (0..self.probes_per_round).map(|_| self.probe()).collect();

            let mut empty_pages = 0;
            while let Some(outcome) = probes.next().await {
                match outcome {
                    Probe::Found(artifact) => {
                        debug!(round, origin = %artifact.origin, "provider found an image");
                        return Ok(artifact);
                    }
                    Probe::EmptyPage => empty_pages += 1,
                    Probe::Failed => {}
                }
            }

            warn!(
                round,
                empty_pages,
                upper_bound = self.upper_bound(),
                "no image this round, retrying"
            );
            self.retry.pause(round).await;
        }
    }
}
