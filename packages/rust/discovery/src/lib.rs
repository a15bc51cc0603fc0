//! Page discovery: sitemap resolution and site-search fallback.
//!
//! Before classifying anything, the inventory needs the list of pages a site
//! publishes. The primary source is the site's sitemap (or sitemap index);
//! when none exists, [`fallback`] derives candidates from a site search.
//!
//! Resolution never fails: a missing sitemap is an empty list, and a broken
//! sub-sitemap is skipped without affecting its siblings.

pub mod fallback;
mod parser;

use std::collections::HashSet;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info, instrument, warn};
use url::Url;

use siteinventory_shared::{InventoryError, Result, SitemapUrl, origin_for};

pub use fallback::{MAX_FALLBACK_URLS, SiteSearch, discover_via_search, extract_domain_urls};
pub use parser::SitemapDocument;

/// Well-known sitemap locations, probed in order until one answers.
pub const WELL_KNOWN_SITEMAP_PATHS: [&str; 6] = [
    "/sitemap.xml",
    "/sitemap_index.xml",
    "/sitemap-index.xml",
    "/wp-sitemap.xml",
    "/post-sitemap.xml",
    "/page-sitemap.xml",
];

/// Sub-sitemaps followed per index document; later entries are ignored.
pub const MAX_SUB_SITEMAPS: usize = 10;

/// Default timeout in seconds for each sitemap fetch.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Maximum number of redirects to follow per sitemap fetch.
const MAX_REDIRECTS: usize = 5;

/// Maximum sitemap size we accept (50 MB, the protocol's own limit).
const MAX_RESPONSE_SIZE: u64 = 50 * 1024 * 1024;

/// User-Agent string for discovery requests.
pub const USER_AGENT: &str = concat!("SiteInventory/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Resolver options
// ---------------------------------------------------------------------------

/// Configuration for sitemap resolution.
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Timeout for each sitemap request in seconds.
    pub timeout_secs: u64,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution state
// ---------------------------------------------------------------------------

/// Accumulators for one resolution. Owned by a single `resolve` call.
struct Resolution {
    /// Absolute sitemap URLs already fetched (or attempted).
    visited: HashSet<String>,
    /// Page locations already collected.
    seen: HashSet<String>,
    urls: Vec<SitemapUrl>,
    max_urls: usize,
}

impl Resolution {
    fn new(max_urls: usize) -> Self {
        Self {
            visited: HashSet::new(),
            seen: HashSet::new(),
            urls: Vec::new(),
            max_urls,
        }
    }

    fn is_full(&self) -> bool {
        self.urls.len() >= self.max_urls
    }
}

// ---------------------------------------------------------------------------
// SitemapResolver
// ---------------------------------------------------------------------------

/// Fetches a domain's sitemap(s) and flattens them into page URLs.
pub struct SitemapResolver {
    client: Client,
    timeout_secs: u64,
}

impl SitemapResolver {
    /// Build a resolver. Fails only if the HTTP client cannot be constructed.
    pub fn new(opts: &ResolverOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| InventoryError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout_secs: opts.timeout_secs,
        })
    }

    /// Resolve every page URL published in the domain's sitemaps, up to
    /// `max_urls`.
    ///
    /// Well-known paths are probed in order; the first valid sitemap becomes
    /// the root. Index documents are walked depth-first, following at most
    /// [`MAX_SUB_SITEMAPS`] children each, and every sitemap URL is fetched
    /// at most once across the whole walk.
    #[instrument(skip_all, fields(domain = %domain, max_urls = max_urls))]
    pub async fn resolve(&self, domain: &str, max_urls: usize) -> Vec<SitemapUrl> {
        let origin = match origin_for(domain) {
            Ok(origin) => origin,
            Err(e) => {
                warn!(error = %e, "cannot resolve sitemap for invalid domain");
                return Vec::new();
            }
        };

        if max_urls == 0 {
            return Vec::new();
        }
        let mut state = Resolution::new(max_urls);

        for path in WELL_KNOWN_SITEMAP_PATHS {
            let sitemap_url = format!("{origin}{path}");
            state.visited.insert(sitemap_url.clone());

            match self.fetch_document(&sitemap_url).await {
                Ok(doc) => {
                    info!(%sitemap_url, "sitemap found");
                    self.walk(&sitemap_url, doc, &mut state).await;
                    break;
                }
                Err(e) => {
                    debug!(%sitemap_url, error = %e, "no sitemap at this path");
                }
            }
        }

        info!(
            urls = state.urls.len(),
            sitemaps_fetched = state.visited.len(),
            "sitemap resolution complete"
        );

        state.urls
    }

    /// Depth-first walk from an already fetched root document.
    ///
    /// Sub-sitemaps are fetched sequentially: `state` is shared by the whole
    /// walk.
    async fn walk(&self, root_url: &str, root: SitemapDocument, state: &mut Resolution) {
        let mut pending: Vec<String> = Vec::new();
        absorb(root_url, root, &mut pending, state);

        while let Some(next) = pending.pop() {
            if state.is_full() {
                debug!(max_urls = state.max_urls, "URL budget reached, stopping walk");
                break;
            }

            if !state.visited.insert(next.clone()) {
                debug!(sitemap_url = %next, "sitemap already visited, skipping");
                continue;
            }

            match self.fetch_document(&next).await {
                Ok(doc) => absorb(&next, doc, &mut pending, state),
                Err(e) => warn!(sitemap_url = %next, error = %e, "sub-sitemap skipped"),
            }
        }
    }

    /// Fetch one sitemap URL and parse it.
    async fn fetch_document(&self, url: &str) -> Result<SitemapDocument> {
        let response = self.client.get(url).send().await.map_err(|e| {
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
        if !(content_type.contains("xml") || content_type.contains("text")) {
            return Err(InventoryError::validation(format!(
                "{url}: unexpected content type '{content_type}'"
            )));
        }

        if let Some(len) = response.content_length() {
            if len > MAX_RESPONSE_SIZE {
                return Err(InventoryError::validation(format!(
                    "{url}: response too large ({len} bytes, max {MAX_RESPONSE_SIZE})"
                )));
            }
        }

        let body = response
            .text()
            .await
            .map_err(|e| InventoryError::Network(format!("{url}: failed to read body: {e}")))?;

        if !parser::has_sitemap_markers(&body) {
            return Err(InventoryError::parse(format!("{url}: no sitemap markup")));
        }

        parser::parse_sitemap(&body)
    }
}

/// Merge a parsed document into the walk state.
///
/// Page entries are appended until the budget is reached. Index children
/// (first [`MAX_SUB_SITEMAPS`] only) are pushed so the first child is
/// popped next.
fn absorb(base: &str, doc: SitemapDocument, pending: &mut Vec<String>, state: &mut Resolution) {
    match doc {
        SitemapDocument::UrlSet(entries) => {
            for mut entry in entries {
                if state.is_full() {
                    debug!(max_urls = state.max_urls, "URL budget reached mid-document");
                    break;
                }
                entry.location = resolve_location(base, &entry.location);
                if state.seen.insert(entry.location.clone()) {
                    state.urls.push(entry);
                }
            }
        }
        SitemapDocument::Index(children) => {
            if children.len() > MAX_SUB_SITEMAPS {
                debug!(
                    listed = children.len(),
                    followed = MAX_SUB_SITEMAPS,
                    "sitemap index truncated"
                );
            }
            let followed: Vec<String> = children
                .iter()
                .take(MAX_SUB_SITEMAPS)
                .map(|child| resolve_location(base, child))
                .collect();
            pending.extend(followed.into_iter().rev());
        }
    }
}

/// Resolve a possibly relative `<loc>` against the sitemap it came from.
fn resolve_location(base: &str, location: &str) -> String {
    match Url::parse(base).and_then(|b| b.join(location)) {
        Ok(mut resolved) => {
            resolved.set_fragment(None);
            resolved.to_string()
        }
        Err(_) => location.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn xml(body: String) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(body, "application/xml")
    }

    fn urlset(base: &str, paths: &[&str]) -> String {
        let mut out = String::from(r#"<?xml version="1.0"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#);
        for p in paths {
            out.push_str(&format!(
                "<url><loc>{base}{p}</loc><lastmod>2024-02-10</lastmod></url>"
            ));
        }
        out.push_str("</urlset>");
        out
    }

    fn index(children: &[String]) -> String {
        let mut out = String::from("<sitemapindex>");
        for c in children {
            out.push_str(&format!("<sitemap><loc>{c}</loc></sitemap>"));
        }
        out.push_str("</sitemapindex>");
        out
    }

    fn resolver() -> SitemapResolver {
        SitemapResolver::new(&ResolverOptions::default()).unwrap()
    }

    #[test]
    fn resolve_location_handles_relative() {
        assert_eq!(
            resolve_location("https://a.io/sitemap.xml", "/post-sitemap.xml"),
            "https://a.io/post-sitemap.xml"
        );
        assert_eq!(
            resolve_location("https://a.io/sitemap.xml", "https://b.io/x#frag"),
            "https://b.io/x"
        );
    }

    #[tokio::test]
    async fn flat_sitemap_returns_every_entry() {
        let server = MockServer::start().await;
        let base = server.uri();

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(xml(urlset(&base, &["/blog/a", "/blog/b", "/blog/c"])))
            .expect(1)
            .mount(&server)
            .await;

        let urls = resolver().resolve(&base, 100).await;

        assert_eq!(urls.len(), 3);
        assert_eq!(urls[0].location, format!("{base}/blog/a"));
        assert!(urls.iter().all(|u| u.last_modified.is_some()));
    }

    #[tokio::test]
    async fn falls_through_to_later_well_known_path() {
        let server = MockServer::start().await;
        let base = server.uri();

        // /sitemap.xml serves an HTML 200 page, which must not count
        Mock::given(path("/sitemap.xml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html><body>Home</body></html>", "text/html"),
            )
            .mount(&server)
            .await;

        Mock::given(path("/wp-sitemap.xml"))
            .respond_with(xml(urlset(&base, &["/guides/setup"])))
            .mount(&server)
            .await;

        let urls = resolver().resolve(&base, 100).await;
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].location, format!("{base}/guides/setup"));
    }

    #[tokio::test]
    async fn rejects_non_xml_content_type() {
        let server = MockServer::start().await;
        let base = server.uri();

        Mock::given(path("/sitemap.xml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(urlset(&base, &["/a"]), "application/octet-stream"),
            )
            .mount(&server)
            .await;

        let urls = resolver().resolve(&base, 100).await;
        assert!(urls.is_empty());
    }

    #[tokio::test]
    async fn truncates_at_max_urls() {
        let server = MockServer::start().await;
        let base = server.uri();

        Mock::given(path("/sitemap.xml"))
            .respond_with(xml(urlset(&base, &["/1", "/2", "/3", "/4", "/5"])))
            .mount(&server)
            .await;

        let urls = resolver().resolve(&base, 2).await;
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[1].location, format!("{base}/2"));
    }

    #[tokio::test]
    async fn follows_only_first_ten_sub_sitemaps() {
        let server = MockServer::start().await;
        let base = server.uri();

        let children: Vec<String> = (0..15).map(|i| format!("{base}/sub-{i}.xml")).collect();
        Mock::given(path("/sitemap.xml"))
            .respond_with(xml(index(&children)))
            .mount(&server)
            .await;

        for i in 0..15 {
            let expected = if i < MAX_SUB_SITEMAPS as u64 { 1 } else { 0 };
            Mock::given(path(format!("/sub-{i}.xml")))
                .respond_with(xml(urlset(&base, &[format!("/page-{i}").as_str()])))
                .expect(expected)
                .mount(&server)
                .await;
        }

        let urls = resolver().resolve(&base, 1000).await;

        assert_eq!(urls.len(), MAX_SUB_SITEMAPS);
        // Depth-first in document order
        assert_eq!(urls[0].location, format!("{base}/page-0"));
        assert_eq!(urls[9].location, format!("{base}/page-9"));
    }

    #[tokio::test]
    async fn self_referencing_index_terminates() {
        let server = MockServer::start().await;
        let base = server.uri();

        // root -> [root, a]; a -> [root, b]; b -> pages
        Mock::given(path("/sitemap.xml"))
            .respond_with(xml(index(&[
                format!("{base}/sitemap.xml"),
                format!("{base}/a.xml"),
            ])))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(path("/a.xml"))
            .respond_with(xml(index(&[
                format!("{base}/sitemap.xml"),
                format!("{base}/b.xml"),
                format!("{base}/a.xml"),
            ])))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(path("/b.xml"))
            .respond_with(xml(urlset(&base, &["/blog/x", "/blog/y"])))
            .expect(1)
            .mount(&server)
            .await;

        let urls = resolver().resolve(&base, 100).await;
        assert_eq!(urls.len(), 2);
    }

    #[tokio::test]
    async fn broken_sub_sitemap_does_not_abort_siblings() {
        let server = MockServer::start().await;
        let base = server.uri();

        Mock::given(path("/sitemap.xml"))
            .respond_with(xml(index(&[
                format!("{base}/broken.xml"),
                format!("{base}/garbage.xml"),
                format!("{base}/good.xml"),
            ])))
            .mount(&server)
            .await;

        Mock::given(path("/broken.xml"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        Mock::given(path("/garbage.xml"))
            .respond_with(xml("not a sitemap at all".to_string()))
            .mount(&server)
            .await;

        Mock::given(path("/good.xml"))
            .respond_with(xml(urlset(&base, &["/resources/ebook"])))
            .mount(&server)
            .await;

        let urls = resolver().resolve(&base, 100).await;
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].location, format!("{base}/resources/ebook"));
    }

    #[tokio::test]
    async fn no_sitemap_is_empty_success() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let urls = resolver().resolve(&server.uri(), 100).await;
        assert!(urls.is_empty());
    }

    #[tokio::test]
    async fn slow_sitemap_times_out_as_failure() {
        let server = MockServer::start().await;
        let base = server.uri();

        Mock::given(path("/sitemap.xml"))
            .respond_with(
                xml(urlset(&base, &["/slow"])).set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let resolver = SitemapResolver::new(&ResolverOptions { timeout_secs: 1 }).unwrap();
        let urls = resolver.resolve(&base, 100).await;
        assert!(urls.is_empty());
    }

    #[tokio::test]
    async fn duplicate_pages_across_sub_sitemaps_collapse() {
        let server = MockServer::start().await;
        let base = server.uri();

        Mock::given(path("/sitemap.xml"))
            .respond_with(xml(index(&[format!("{base}/one.xml"), format!("{base}/two.xml")])))
            .mount(&server)
            .await;
        Mock::given(path("/one.xml"))
            .respond_with(xml(urlset(&base, &["/blog/a", "/blog/b"])))
            .mount(&server)
            .await;
        Mock::given(path("/two.xml"))
            .respond_with(xml(urlset(&base, &["/blog/b", "/blog/c"])))
            .mount(&server)
            .await;

        let urls = resolver().resolve(&base, 100).await;
        let locations: Vec<&str> = urls.iter().map(|u| u.location.as_str()).collect();
        assert_eq!(
            locations,
            vec![
                format!("{base}/blog/a"),
                format!("{base}/blog/b"),
                format!("{base}/blog/c"),
            ]
        );
    }

    #[tokio::test]
    async fn invalid_domain_yields_empty() {
        assert!(resolver().resolve("", 10).await.is_empty());
    }
}
