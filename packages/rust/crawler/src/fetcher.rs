//! Page-fetch collaborator.
//!
//! [`PageFetcher`] is the seam used by the deep-read stage and by the
//! fetcher-backed site search. [`HttpPageFetcher`] is the shipped
//! implementation: a plain GET whose HTML body is reduced to Markdown.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, instrument};
use url::Url;

use siteinventory_markdown::html_to_page_text;
use siteinventory_shared::{InventoryError, Result};

/// User-Agent string for page requests.
const USER_AGENT: &str = concat!("SiteInventory/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects to follow per page.
const MAX_REDIRECTS: usize = 5;

/// Content returned by a page fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedContent {
    /// Markdown-like page text.
    pub content: String,
    pub title: Option<String>,
}

/// Fetches the readable content of one absolute URL.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedContent>;
}

// ---------------------------------------------------------------------------
// HttpPageFetcher
// ---------------------------------------------------------------------------

/// [`PageFetcher`] over HTTP with HTML-to-Markdown conversion.
pub struct HttpPageFetcher {
    client: Client,
    timeout_secs: u64,
}

impl HttpPageFetcher {
    /// Build a fetcher with the given per-request timeout in seconds.
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| InventoryError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout_secs,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    #[instrument(skip_all, fields(url = %url))]
    async fn fetch(&self, url: &str) -> Result<FetchedContent> {
        let parsed = Url::parse(url)
            .map_err(|e| InventoryError::validation(format!("invalid URL '{url}': {e}")))?;

        let response = self.client.get(parsed.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                InventoryError::timeout(url, self.timeout_secs)
            } else {
                InventoryError::Network(format!("{url}: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(InventoryError::Network(format!("{url}: HTTP {status}")));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let body = response
            .text()
            .await
            .map_err(|e| InventoryError::Network(format!("{url}: body read failed: {e}")))?;

        if content_type.starts_with("text/plain") || content_type.contains("markdown") {
            debug!(bytes = body.len(), "plain text page");
            return Ok(FetchedContent {
                content: body,
                title: None,
            });
        }

        let page = html_to_page_text(&body, Some(&parsed))?;
        debug!(words = page.word_count(), "page fetched");

        Ok(FetchedContent {
            content: page.markdown,
            title: page.title,
        })
    }
}
