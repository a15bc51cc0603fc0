//! Core domain types for a website content inventory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Word count above which a deep-read page counts as substantive.
pub const SUBSTANTIVE_WORD_THRESHOLD: usize = 500;

/// Maximum number of topic phrases kept per page.
pub const MAX_TOPICS: usize = 3;

// ---------------------------------------------------------------------------
// SitemapUrl
// ---------------------------------------------------------------------------

/// A candidate page URL produced by discovery (sitemap or fallback search).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SitemapUrl {
    /// Absolute URL of the page.
    pub location: String,
    /// `<lastmod>` from the sitemap, when present and parseable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

impl SitemapUrl {
    /// A discovered URL with no modification date.
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            last_modified: None,
        }
    }
}

// ---------------------------------------------------------------------------
// ContentType
// ---------------------------------------------------------------------------

/// Closed set of editorial content categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Blog,
    Landing,
    Resource,
    Product,
    Industry,
    Comparison,
    CaseStudy,
    Docs,
    Other,
}

impl ContentType {
    /// Every variant, in declaration order.
    pub const ALL: [ContentType; 9] = [
        Self::Blog,
        Self::Landing,
        Self::Resource,
        Self::Product,
        Self::Industry,
        Self::Comparison,
        Self::CaseStudy,
        Self::Docs,
        Self::Other,
    ];

    /// Wire name, as used in JSON and in classification prompts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blog => "blog",
            Self::Landing => "landing",
            Self::Resource => "resource",
            Self::Product => "product",
            Self::Industry => "industry",
            Self::Comparison => "comparison",
            Self::CaseStudy => "case_study",
            Self::Docs => "docs",
            Self::Other => "other",
        }
    }

    /// Parse a wire name leniently. Case and `-`/space separators are
    /// ignored; anything outside the closed set yields `None`.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|ct| ct.as_str() == normalized)
    }

    /// Deep-read priority index (lower reads first).
    pub fn deep_read_priority(&self) -> u8 {
        match self {
            Self::Comparison => 0,
            Self::Resource => 1,
            Self::Industry => 2,
            Self::CaseStudy => 3,
            Self::Blog => 4,
            Self::Product => 5,
            Self::Docs => 6,
            Self::Landing => 7,
            Self::Other => 8,
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ContentQuality
// ---------------------------------------------------------------------------

/// Quality verdict assigned after a successful deep-read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentQuality {
    Substantive,
    Thin,
}

impl ContentQuality {
    /// `Substantive` strictly above the threshold, `Thin` otherwise.
    pub fn from_word_count(words: usize) -> Self {
        if words > SUBSTANTIVE_WORD_THRESHOLD {
            Self::Substantive
        } else {
            Self::Thin
        }
    }
}

// ---------------------------------------------------------------------------
// SitePageEntry
// ---------------------------------------------------------------------------

/// One distinct content page of a site, keyed by path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SitePageEntry {
    /// Normalized path, unique within one inventory.
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    pub content_type: ContentType,
    /// Up to [`MAX_TOPICS`] keyword phrases.
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
    /// Set together with `content_quality`, only after a successful deep-read.
    #[serde(default)]
    pub word_count: Option<usize>,
    #[serde(default)]
    pub content_quality: Option<ContentQuality>,
}

impl SitePageEntry {
    /// Build a freshly classified entry. Topics beyond [`MAX_TOPICS`] and
    /// blank titles are dropped.
    pub fn classified(
        url: impl Into<String>,
        title: Option<String>,
        content_type: ContentType,
        mut topics: Vec<String>,
        last_modified: Option<DateTime<Utc>>,
    ) -> Self {
        topics.truncate(MAX_TOPICS);
        Self {
            url: url.into(),
            title: title.filter(|t| !t.trim().is_empty()),
            content_type,
            topics,
            last_modified,
            word_count: None,
            content_quality: None,
        }
    }

    /// Record a successful deep-read. The fetched title replaces the current
    /// one only when non-empty.
    pub fn record_deep_read(&mut self, content: &str, fetched_title: Option<&str>) {
        let words = content.split_whitespace().count();
        self.word_count = Some(words);
        self.content_quality = Some(ContentQuality::from_word_count(words));

        if let Some(title) = fetched_title.map(str::trim).filter(|t| !t.is_empty()) {
            self.title = Some(title.to_string());
        }
    }

    /// Whether a deep-read result has been recorded.
    pub fn is_deep_read(&self) -> bool {
        self.word_count.is_some()
    }
}

// ---------------------------------------------------------------------------
// Run output
// ---------------------------------------------------------------------------

/// Which discovery method produced the candidate URL list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoverySource {
    Sitemap,
    FallbackSearch,
    None,
}

impl std::fmt::Display for DiscoverySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Sitemap => "sitemap",
            Self::FallbackSearch => "fallback_search",
            Self::None => "none",
        };
        f.write_str(s)
    }
}

/// Statistics for one inventory run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatistics {
    /// URLs produced by discovery, before filtering.
    pub urls_found: usize,
    pub pages_classified: usize,
    pub pages_deep_read: usize,
    pub discovery_source: DiscoverySource,
}

impl RunStatistics {
    /// Statistics of a run where neither discovery path produced anything.
    pub fn empty() -> Self {
        Self {
            urls_found: 0,
            pages_classified: 0,
            pages_deep_read: 0,
            discovery_source: DiscoverySource::None,
        }
    }
}

/// Full snapshot returned by one inventory run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub pages: Vec<SitePageEntry>,
    pub stats: RunStatistics,
}

impl Inventory {
    /// The valid "no data available yet" result.
    pub fn empty() -> Self {
        Self {
            pages: Vec::new(),
            stats: RunStatistics::empty(),
        }
    }
}
