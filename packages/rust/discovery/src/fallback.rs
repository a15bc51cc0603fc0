//! Fallback discovery for sites without a sitemap.
//!
//! A site-search collaborator is asked for `site:<domain>` results and the
//! returned free text is scanned for absolute URLs on the domain. Search
//! result pages often wrap targets in redirect links
//! (`/l/?uddg=https%3A%2F%2F...`); those are unwrapped from their query
//! parameters.

use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::{info, instrument, warn};
use url::Url;

use siteinventory_shared::{InventoryError, Result, SitemapUrl, host_for};

/// Maximum candidate URLs taken from one search response.
pub const MAX_FALLBACK_URLS: usize = 100;

/// Absolute http(s) URLs embedded in free text.
static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s<>"'()\[\]{}|\\^`]+"#).expect("url regex")
});

/// Free-text site-search collaborator.
#[async_trait]
pub trait SiteSearch: Send + Sync {
    /// Run a search query and return the raw result text.
    async fn search(&self, query: &str) -> Result<String>;
}

/// The query sent to the search collaborator for a domain.
pub fn site_query(host: &str) -> String {
    format!("site:{host}")
}

/// Discover candidate page URLs for `domain` via site search.
///
/// Never fails: search errors and timeouts are logged and yield an empty list.
#[instrument(skip_all, fields(domain = %domain))]
pub async fn discover_via_search(
    search: &dyn SiteSearch,
    domain: &str,
    timeout: Duration,
) -> Vec<SitemapUrl> {
    let host = match host_for(domain) {
        Ok(host) => host,
        Err(e) => {
            warn!(error = %e, "cannot search for invalid domain");
            return Vec::new();
        }
    };

    let query = site_query(&host);
    let text = match tokio::time::timeout(timeout, search.search(&query)).await {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            warn!(%query, error = %e, "site search failed");
            return Vec::new();
        }
        Err(_) => {
            let e = InventoryError::timeout(&query, timeout.as_secs());
            warn!(%query, error = %e, "site search failed");
            return Vec::new();
        }
    };

    let urls = extract_domain_urls(&text, &host);
    info!(urls = urls.len(), "fallback search discovery complete");
    urls
}

/// Scan free text for absolute URLs on `host` or its `www.` variant.
///
/// Other subdomains are rejected: pages are keyed by path and later fetched
/// from the domain's own origin.
///
/// Order of first appearance is kept, duplicates are dropped, and the result
/// is capped at [`MAX_FALLBACK_URLS`].
pub fn extract_domain_urls(text: &str, host: &str) -> Vec<SitemapUrl> {
    let bare_host = host.trim_start_matches("www.").to_lowercase();
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for m in URL_RE.find_iter(text) {
        let raw = m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']);
        let Ok(url) = Url::parse(raw) else {
            continue;
        };

        let Some(mut target) = on_host(url.clone(), &bare_host).or_else(|| unwrap_redirect(&url, &bare_host))
        else {
            continue;
        };

        target.set_fragment(None);
        let location = target.to_string();
        if seen.insert(location.clone()) {
            out.push(SitemapUrl::new(location));
            if out.len() >= MAX_FALLBACK_URLS {
                break;
            }
        }
    }

    out
}

fn on_host(url: Url, bare_host: &str) -> Option<Url> {
    let host = url.host_str()?.to_lowercase();
    let matches = host.strip_prefix("www.").unwrap_or(&host) == bare_host;
    matches.then_some(url)
}

/// Find a query parameter of a redirect link that is itself a URL on the host.
fn unwrap_redirect(url: &Url, bare_host: &str) -> Option<Url> {
    url.query_pairs().find_map(|(_, value)| {
        let inner = Url::parse(&value).ok()?;
        match inner.scheme() {
            "http" | "https" => on_host(inner, bare_host),
            _ => None,
        }
    })
}
