//! Sitemap XML parser.
//!
//! Third-party sitemaps are frequently not well-formed XML, so this is a
//! tolerant tag scanner rather than a strict parser:
//! - `<urlset>` documents: each `<url>` block yields its `<loc>` and `<lastmod>`
//! - `<sitemapindex>` documents: each `<sitemap>` block yields its `<loc>`
//! - `<![CDATA[...]]>` wrappers and the five predefined XML entities are decoded

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;

use siteinventory_shared::{InventoryError, Result, SitemapUrl};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A parsed sitemap document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// A sitemap index listing sub-sitemap locations, in document order.
    Index(Vec<String>),
    /// A page sitemap listing page entries, in document order.
    UrlSet(Vec<SitemapUrl>),
}

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// `<url>...</url>` blocks. `\b` keeps `<urlset>` out.
static URL_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<url\b[^>]*>(.*?)</url\s*>").expect("url block regex")
});

/// `<sitemap>...</sitemap>` blocks. `\b` keeps `<sitemapindex>` out.
static SITEMAP_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<sitemap\b[^>]*>(.*?)</sitemap\s*>").expect("sitemap block regex")
});

static LOC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<loc\b[^>]*>(.*?)</loc\s*>").expect("loc regex"));

static LASTMOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<lastmod\b[^>]*>(.*?)</lastmod\s*>").expect("lastmod regex")
});

static INDEX_ROOT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<sitemapindex\b").expect("index root regex"));

static URLSET_ROOT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<urlset\b").expect("urlset root regex"));

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Cheap pre-check: does the body look like any kind of sitemap?
pub(crate) fn has_sitemap_markers(body: &str) -> bool {
    let lower = body.to_ascii_lowercase();
    lower.contains("<url") || lower.contains("<sitemap")
}

/// Parse a sitemap or sitemap index body.
pub(crate) fn parse_sitemap(xml: &str) -> Result<SitemapDocument> {
    if INDEX_ROOT_RE.is_match(xml) {
        let locations = SITEMAP_BLOCK_RE
            .captures_iter(xml)
            .filter_map(|caps| extract_tag(&LOC_RE, &caps[1]))
            .collect();
        return Ok(SitemapDocument::Index(locations));
    }

    let entries: Vec<SitemapUrl> = URL_BLOCK_RE
        .captures_iter(xml)
        .filter_map(|caps| {
            let block = &caps[1];
            let location = extract_tag(&LOC_RE, block)?;
            let last_modified = extract_tag(&LASTMOD_RE, block).and_then(|s| parse_lastmod(&s));
            Some(SitemapUrl {
                location,
                last_modified,
            })
        })
        .collect();

    if entries.is_empty() && !URLSET_ROOT_RE.is_match(xml) {
        return Err(InventoryError::parse(
            "document has neither a <urlset> nor a <sitemapindex> root",
        ));
    }

    Ok(SitemapDocument::UrlSet(entries))
}

/// Extract and decode the text of the first matching tag in `block`.
fn extract_tag(re: &Regex, block: &str) -> Option<String> {
    let caps = re.captures(block)?;
    let text = decode_text(&caps[1]);
    if text.is_empty() { None } else { Some(text) }
}

/// Strip CDATA wrappers and decode the predefined XML entities.
fn decode_text(raw: &str) -> String {
    let trimmed = raw.trim();
    let unwrapped = trimmed
        .strip_prefix("<![CDATA[")
        .and_then(|s| s.strip_suffix("]]>"))
        .unwrap_or(trimmed);

    unwrapped
        .trim()
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Parse a W3C datetime `<lastmod>` value. Unrecognized formats yield `None`.
fn parse_lastmod(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    // W3C allows minutes precision without seconds: 2024-03-01T10:30+00:00
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M%:z") {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
