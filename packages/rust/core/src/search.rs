//! Site search backed by the page fetcher.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use url::form_urlencoded::byte_serialize;

use siteinventory_crawler::PageFetcher;
use siteinventory_discovery::SiteSearch;
use siteinventory_shared::{InventoryError, Result};

/// Placeholder replaced by the URL-encoded query in the endpoint template.
pub const QUERY_PLACEHOLDER: &str = "{query}";

/// [`SiteSearch`] that fetches a search-results page through a [`PageFetcher`].
///
/// The endpoint is a URL template such as
/// `https://html.duckduckgo.com/html/?q={query}`; the fetched body text is
/// returned as-is for URL extraction.
pub struct FetcherSiteSearch {
    fetcher: Arc<dyn PageFetcher>,
    endpoint: String,
}

impl FetcherSiteSearch {
    pub fn new(fetcher: Arc<dyn PageFetcher>, endpoint: impl Into<String>) -> Result<Self> {
        let endpoint = endpoint.into();
        if !endpoint.contains(QUERY_PLACEHOLDER) {
            return Err(InventoryError::config(format!(
                "search endpoint '{endpoint}' has no {QUERY_PLACEHOLDER} placeholder"
            )));
        }
        Ok(Self { fetcher, endpoint })
    }

    /// The concrete URL requested for `query`.
    pub fn search_url(&self, query: &str) -> String {
        let encoded: String = byte_serialize(query.as_bytes()).collect();
        self.endpoint.replace(QUERY_PLACEHOLDER, &encoded)
    }
}

#[async_trait]
impl SiteSearch for FetcherSiteSearch {
    async fn search(&self, query: &str) -> Result<String> {
        let url = self.search_url(query);
        debug!(%url, "running site search");
        let page = self.fetcher.fetch(&url).await?;
        Ok(page.content)
    }
}
