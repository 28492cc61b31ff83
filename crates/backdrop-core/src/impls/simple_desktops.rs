//! SimpleDesktopsGallery - `Gallery` over http://simpledesktops.com.
//!
//! Listing pages live at `/browse/{n}`. Each `.desktops .edge` block links
//! to a detail page whose `.desktop-detail` block links to the full image.
//! The markup is scanned with a handful of regexes; no DOM is built.

use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;
use ulid::Ulid;

use crate::impls::remote::{Download, FetchError, Gallery, GalleryEntry};
use crate::ports::ProviderError;

pub const PROVIDER_NAME: &str = "simpledesktops";
pub const DEFAULT_BASE_URL: &str = "http://simpledesktops.com";
const UNKNOWN_AUTHOR: &str = "Unknown";

static EDGE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<div[^>]*class="[^"]*\bedge\b[^"]*"[^>]*>"#).expect("edge block pattern")
});
static HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="([^"]*)""#).expect("href pattern"));
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<h2[^>]*>(.*?)</h2>").expect("heading pattern"));
static CREATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)class="[^"]*\bcreator\b[^"]*"[^>]*>.*?<a[^>]*href="([^"]*)"[^>]*>(.*?)</a>"#)
        .expect("creator pattern")
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern"));

pub struct SimpleDesktopsGallery {
    client: reqwest::Client,
    base_url: String,
}

impl SimpleDesktopsGallery {
    pub fn new(request_timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("backdrop/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::Client(e.to_string()))?;
        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn absolute(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else {
            format!("{}/{}", self.base_url, href.trim_start_matches('/'))
        }
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Request {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.get(url)
            .await?
            .text()
            .await
            .map_err(|e| FetchError::Request {
                url: url.to_string(),
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl Gallery for SimpleDesktopsGallery {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn list_page(&self, page: u32) -> Result<Vec<GalleryEntry>, FetchError> {
        let url = format!("{}/browse/{page}", self.base_url);
        debug!(url = %url, "fetching listing page");
        let html = self.get_text(&url).await?;
        Ok(parse_listing(&html)
            .into_iter()
            .map(|mut entry| {
                entry.page_url = self.absolute(&entry.page_url);
                entry
            })
            .collect())
    }

    async fn download(&self, entry: &GalleryEntry) -> Result<Download, FetchError> {
        let html = self.get_text(&entry.page_url).await?;
        let href = parse_image_link(&html).ok_or_else(|| FetchError::Parse {
            url: entry.page_url.clone(),
            message: "no image link in desktop-detail".to_string(),
        })?;
        let image_url = self.absolute(&href);
        debug!(url = %image_url, "downloading image");

        let response = self.get(&image_url).await?;
        let final_url = response.url().clone();
        let bytes = response.bytes().await.map_err(|e| FetchError::Request {
            url: image_url.clone(),
            message: e.to_string(),
        })?;
        if bytes.is_empty() {
            return Err(FetchError::Empty { url: image_url });
        }

        Ok(Download {
            filename: unique_filename(final_url.path()),
            bytes: bytes.to_vec(),
        })
    }
}

/// `{ulid}-{basename}`; the prefix keeps names unique inside the cache directory.
fn unique_filename(url_path: &str) -> String {
    let base = Path::new(url_path)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or("image");
    format!("{}-{base}", Ulid::new())
}

/// Entries of a listing page, hrefs left as found.
fn parse_listing(html: &str) -> Vec<GalleryEntry> {
    let Some(start) = html.find("class=\"desktops") else {
        return Vec::new();
    };
    let listing = &html[start..];

    let starts: Vec<usize> = EDGE_BLOCK.find_iter(listing).map(|m| m.end()).collect();
    starts
        .iter()
        .enumerate()
        .filter_map(|(i, &from)| {
            let to = starts.get(i + 1).copied().unwrap_or(listing.len());
            parse_entry(&listing[from..to])
        })
        .collect()
}

fn parse_entry(block: &str) -> Option<GalleryEntry> {
    let page_url = HREF.captures(block)?.get(1)?.as_str().to_string();
    let title = HEADING
        .captures(block)
        .and_then(|c| c.get(1))
        .map(|m| text_of(m.as_str()))
        .unwrap_or_default();

    let (author, author_url) = match CREATOR.captures(block) {
        Some(c) => (
            c.get(2).map(|m| text_of(m.as_str())).unwrap_or_default(),
            c.get(1).map(|m| decode_entities(m.as_str())).unwrap_or_default(),
        ),
        None => (String::new(), String::new()),
    };
    let author = if author.is_empty() {
        UNKNOWN_AUTHOR.to_string()
    } else {
        author
    };

    Some(GalleryEntry {
        page_url: decode_entities(&page_url),
        title,
        author,
        author_url,
    })
}

fn parse_image_link(html: &str) -> Option<String> {
    let start = html.find("desktop-detail")?;
    let href = HREF.captures(&html[start..])?.get(1)?.as_str();
    (!href.is_empty()).then(|| decode_entities(href))
}

fn text_of(fragment: &str) -> String {
    decode_entities(TAG.replace_all(fragment, "").trim())
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}
