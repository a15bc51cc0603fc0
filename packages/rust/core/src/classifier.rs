//! Content classifier.
//!
//! Two strategies are chained:
//! 1. **Semantic**: one batch request to a [`ClassificationService`]; the
//!    first top-level JSON array in the reply is parsed into entries. The
//!    service may omit URLs it judges non-content.
//! 2. **Pattern**: a deterministic rule table over the URL path. Total: one
//!    entry per input URL.
//!
//! The pattern strategy runs whenever the semantic one yields nothing usable
//! (no service configured, service error or timeout, no parseable array).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use siteinventory_shared::{
    ContentType, InventoryError, MAX_TOPICS, SitePageEntry, SitemapUrl, normalize_path,
};

use crate::semantic::{ClassificationRequest, ClassificationService};

/// Maximum URLs handed to the classifier in one run.
pub const CLASSIFICATION_CAP: usize = 300;

/// Default timeout for the semantic classification call.
const DEFAULT_CLASSIFY_TIMEOUT: Duration = Duration::from_secs(60);

/// Ordered rule table for the pattern strategy. First match wins.
const PATTERN_RULES: &[(ContentType, &[&str])] = &[
    (ContentType::Blog, &["/blog/", "/posts/", "/articles/"]),
    (
        ContentType::Resource,
        &["/resources/", "/guides/", "/whitepapers/", "/ebooks/", "/webinars/"],
    ),
    (ContentType::Product, &["/products/", "/features/", "/pricing"]),
    (
        ContentType::Industry,
        &["/industries/", "/sectors/", "/solutions/"],
    ),
    (
        ContentType::Comparison,
        &["/vs/", "/compare/", "/alternatives/", "-vs-"],
    ),
    (
        ContentType::CaseStudy,
        &["/case-stud", "/customers/", "/success-stor"],
    ),
    (ContentType::Docs, &["/docs/", "/help/", "/support/"]),
];

/// A deduplicated classifier input.
#[derive(Debug, Clone)]
struct ClassifierInput {
    path: String,
    last_modified: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// ContentClassifier
// ---------------------------------------------------------------------------

/// Classifies discovered URLs into [`SitePageEntry`] records.
pub struct ContentClassifier {
    service: Option<Arc<dyn ClassificationService>>,
    timeout: Duration,
}

impl ContentClassifier {
    /// Classifier that tries `service` first and falls back to patterns.
    pub fn new(service: Arc<dyn ClassificationService>, timeout: Duration) -> Self {
        Self {
            service: Some(service),
            timeout,
        }
    }

    /// Classifier that only uses the pattern strategy.
    pub fn pattern_only() -> Self {
        Self {
            service: None,
            timeout: DEFAULT_CLASSIFY_TIMEOUT,
        }
    }

    /// Classify `urls` for `domain`. Never fails.
    ///
    /// Paths are normalized and deduplicated first (first occurrence wins),
    /// so every returned `url` is unique.
    #[instrument(skip_all, fields(domain = %domain, urls = urls.len()))]
    pub async fn classify(&self, domain: &str, urls: &[SitemapUrl]) -> Vec<SitePageEntry> {
        let inputs = prepare_inputs(urls);
        if inputs.is_empty() {
            return Vec::new();
        }

        if let Some(entries) = self.classify_semantic(domain, &inputs).await {
            info!(
                inputs = inputs.len(),
                classified = entries.len(),
                strategy = "semantic",
                "classification complete"
            );
            return entries;
        }

        let entries = classify_by_pattern(&inputs);
        info!(
            inputs = inputs.len(),
            classified = entries.len(),
            strategy = "pattern",
            "classification complete"
        );
        entries
    }

    /// Semantic strategy. `None` means "fall back".
    async fn classify_semantic(
        &self,
        domain: &str,
        inputs: &[ClassifierInput],
    ) -> Option<Vec<SitePageEntry>> {
        let service = self.service.as_ref()?;
        let request = ClassificationRequest::new(
            domain,
            inputs.iter().map(|i| (i.path.as_str(), i.last_modified)),
        );

        let text = match tokio::time::timeout(self.timeout, service.classify(&request)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!(error = %e, "classification service failed, using pattern fallback");
                return None;
            }
            Err(_) => {
                let e = InventoryError::timeout("classification request", self.timeout.as_secs());
                warn!(error = %e, "classification service failed, using pattern fallback");
                return None;
            }
        };

        let parsed = try_structured_parse(&text, inputs);
        if parsed.is_none() {
            warn!(
                response_len = text.len(),
                "classification response unusable, using pattern fallback"
            );
        }
        parsed
    }
}

/// Normalize to paths and drop repeats, keeping the first occurrence.
fn prepare_inputs(urls: &[SitemapUrl]) -> Vec<ClassifierInput> {
    let mut seen = HashSet::new();
    urls.iter()
        .filter_map(|u| {
            let path = normalize_path(&u.location);
            seen.insert(path.clone()).then(|| ClassifierInput {
                path,
                last_modified: u.last_modified,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Semantic strategy: structured parse
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawEntry {
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    topics: Vec<String>,
}

/// Parse the first top-level JSON array in `text` into entries.
///
/// Returns `None` when no array is found, it is not valid JSON, or it maps to
/// no known input path. Elements naming a path outside `inputs` are ignored.
fn try_structured_parse(text: &str, inputs: &[ClassifierInput]) -> Option<Vec<SitePageEntry>> {
    let array = find_json_array(text)?;
    let values: Vec<serde_json::Value> = match serde_json::from_str(array) {
        Ok(values) => values,
        Err(e) => {
            debug!(error = %e, "embedded array is not valid JSON");
            return None;
        }
    };

    let known: HashMap<&str, Option<DateTime<Utc>>> = inputs
        .iter()
        .map(|i| (i.path.as_str(), i.last_modified))
        .collect();

    let mut emitted = HashSet::new();
    let mut unknown = 0usize;
    let mut malformed = 0usize;
    let mut entries = Vec::new();

    for value in values {
        let raw: RawEntry = match serde_json::from_value(value) {
            Ok(raw) => raw,
            Err(_) => {
                malformed += 1;
                continue;
            }
        };

        let path = normalize_path(&raw.url);
        let Some(&last_modified) = known.get(path.as_str()) else {
            debug!(%path, "classified URL not in input, ignored");
            unknown += 1;
            continue;
        };
        if !emitted.insert(path.clone()) {
            continue;
        }

        let content_type = raw
            .content_type
            .as_deref()
            .and_then(ContentType::parse)
            .unwrap_or(ContentType::Other);
        let topics = raw
            .topics
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        entries.push(SitePageEntry::classified(
            path,
            raw.title.map(|t| t.trim().to_string()),
            content_type,
            topics,
            last_modified,
        ));
    }

    if unknown > 0 || malformed > 0 {
        warn!(unknown, malformed, "ignored unusable classification elements");
    }

    if entries.is_empty() {
        return None;
    }
    Some(entries)
}

/// Locate the first top-level `[...]` in free text, honoring JSON strings.
fn find_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

// ---------------------------------------------------------------------------
// Pattern strategy
// ---------------------------------------------------------------------------

/// Deterministic classification of every input.
fn classify_by_pattern(inputs: &[ClassifierInput]) -> Vec<SitePageEntry> {
    inputs
        .iter()
        .map(|input| {
            let (title, topics) = title_and_topics(&input.path);
            SitePageEntry::classified(
                input.path.clone(),
                title,
                content_type_for_path(&input.path),
                topics,
                input.last_modified,
            )
        })
        .collect()
}

/// Content type for a normalized path under the rule table.
pub fn content_type_for_path(path: &str) -> ContentType {
    let lower = path.to_lowercase();
    // Trailing slash lets "/blog" match the "/blog/" rule.
    let probe = format!("{}/", lower.trim_end_matches('/'));

    for (content_type, needles) in PATTERN_RULES {
        if needles.iter().any(|n| probe.contains(n)) {
            return *content_type;
        }
    }

    let segments = lower.split('/').filter(|s| !s.is_empty()).count();
    if segments <= 1 {
        ContentType::Landing
    } else {
        ContentType::Other
    }
}

/// Title and topics derived from the final path segment.
///
/// Tokens are split on `-` and `_`, tokens of two characters or fewer are
/// dropped, and at most [`MAX_TOPICS`] become topics. The title joins all
/// kept tokens, title-cased.
fn title_and_topics(path: &str) -> (Option<String>, Vec<String>) {
    let last = path.rsplit('/').find(|s| !s.is_empty()).unwrap_or_default();
    let stem = [".html", ".htm", ".php", ".aspx"]
        .iter()
        .find_map(|ext| last.strip_suffix(ext))
        .unwrap_or(last);

    let tokens: Vec<String> = stem
        .split(['-', '_'])
        .filter(|t| t.chars().count() > 2)
        .map(str::to_lowercase)
        .collect();

    let title = tokens
        .iter()
        .map(|t| title_case(t))
        .collect::<Vec<_>>()
        .join(" ");
    let topics = tokens.into_iter().take(MAX_TOPICS).collect();

    (Some(title), topics)
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use siteinventory_shared::Result;

    /// Service returning a canned reply (or error) and recording the request.
    struct CannedService {
        reply: std::result::Result<String, String>,
        delay: Duration,
    }

    impl CannedService {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                delay: Duration::ZERO,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err("service unavailable".into()),
                delay: Duration::ZERO,
            })
        }
    }

    #[async_trait]
    impl ClassificationService for CannedService {
        async fn classify(&self, _request: &ClassificationRequest) -> Result<String> {
            tokio::time::sleep(self.delay).await;
            self.reply.clone().map_err(InventoryError::Service)
        }
    }

    fn sitemap_urls(paths: &[&str]) -> Vec<SitemapUrl> {
        paths
            .iter()
            .map(|p| SitemapUrl::new(format!("https://acme.io{p}")))
            .collect()
    }

    fn classifier(service: Arc<CannedService>) -> ContentClassifier {
        ContentClassifier::new(service, Duration::from_secs(5))
    }

    #[test]
    fn rule_table() {
        let cases = [
            ("/blog/launch-week", ContentType::Blog),
            ("/blog", ContentType::Blog),
            ("/articles/why-now", ContentType::Blog),
            ("/guides/setup", ContentType::Resource),
            ("/whitepapers/state-of-ai", ContentType::Resource),
            ("/pricing", ContentType::Product),
            ("/features/sso", ContentType::Product),
            ("/solutions/healthcare", ContentType::Industry),
            ("/vs/rival", ContentType::Comparison),
            ("/acme-vs-rival", ContentType::Comparison),
            ("/alternatives/rival", ContentType::Comparison),
            ("/case-studies/globex", ContentType::CaseStudy),
            ("/customers/initech", ContentType::CaseStudy),
            ("/success-stories/hooli", ContentType::CaseStudy),
            ("/docs/api/auth", ContentType::Docs),
            ("/help/billing", ContentType::Docs),
            ("/", ContentType::Landing),
            ("/about", ContentType::Landing),
            ("/company/team/leadership", ContentType::Other),
        ];

        for (path, expected) in cases {
            assert_eq!(content_type_for_path(path), expected, "path {path}");
        }
    }

    #[test]
    fn topics_and_title_from_last_segment() {
        let (title, topics) = title_and_topics("/blog/how-to-scale-ai_engineering-teams");
        assert_eq!(title.as_deref(), Some("How Scale Engineering Teams"));
        assert_eq!(topics, vec!["how", "scale", "engineering"]);
    }

    #[test]
    fn root_has_no_title_or_topics() {
        let entries = classify_by_pattern(&prepare_inputs(&sitemap_urls(&["/"])));
        assert_eq!(entries[0].title, None);
        assert!(entries[0].topics.is_empty());
        assert_eq!(entries[0].content_type, ContentType::Landing);
    }

    #[test]
    fn find_array_in_prose() {
        let text = "Sure! Here is the result:\n```json\n[{\"url\":\"/a\",\"title\":\"x [draft]\"}, [1]]\n```\nThanks [done]";
        assert_eq!(
            find_json_array(text),
            Some("[{\"url\":\"/a\",\"title\":\"x [draft]\"}, [1]]")
        );
        assert_eq!(find_json_array("no array here"), None);
        assert_eq!(find_json_array("[unterminated"), None);
    }

    #[test]
    fn inputs_are_deduplicated_by_path() {
        let inputs = prepare_inputs(&sitemap_urls(&[
            "/blog/a",
            "/blog/a/",
            "/blog/a?utm=1",
            "/blog/b",
        ]));
        let paths: Vec<&str> = inputs.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["/blog/a", "/blog/b"]);
    }

    #[tokio::test]
    async fn semantic_reply_is_used() {
        let reply = r#"Here are the classifications:
[
  {"url": "/blog/launch", "title": "Launch Week", "content_type": "blog", "topics": ["launch", "release", "product", "extra"]},
  {"url": "https://acme.io/vs/rival/", "title": "Acme vs Rival", "content_type": "comparison", "topics": ["rival"]}
]
Let me know if you need more."#;
        let ts = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();
        let mut urls = sitemap_urls(&["/blog/launch", "/vs/rival", "/about"]);
        urls[0].last_modified = Some(ts);

        let entries = classifier(CannedService::ok(reply))
            .classify("acme.io", &urls)
            .await;

        // The service omitted /about: allowed for the semantic strategy.
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].url, "/blog/launch");
        assert_eq!(entries[0].title.as_deref(), Some("Launch Week"));
        assert_eq!(entries[0].topics.len(), 3);
        assert_eq!(entries[0].last_modified, Some(ts));
        assert_eq!(entries[1].url, "/vs/rival");
        assert_eq!(entries[1].content_type, ContentType::Comparison);
    }

    #[tokio::test]
    async fn unknown_paths_and_types_are_handled() {
        let reply = r#"[
  {"url": "/blog/launch", "title": "", "content_type": "podcast", "topics": []},
  {"url": "/invented/page", "title": "Made up", "content_type": "blog", "topics": []}
]"#;
        let urls = sitemap_urls(&["/blog/launch"]);

        let entries = classifier(CannedService::ok(reply))
            .classify("acme.io", &urls)
            .await;

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].content_type, ContentType::Other);
        assert_eq!(entries[0].title, None);
    }

    #[tokio::test]
    async fn service_failure_falls_back_to_total_pattern_classification() {
        let urls = sitemap_urls(&["/blog/a", "/blog/b", "/pricing", "/company/team/x"]);

        let entries = classifier(CannedService::failing())
            .classify("acme.io", &urls)
            .await;

        assert_eq!(entries.len(), urls.len());
        assert!(entries.iter().all(|e| ContentType::ALL.contains(&e.content_type)));
        assert_eq!(entries[0].content_type, ContentType::Blog);
        assert_eq!(entries[2].content_type, ContentType::Product);
        assert_eq!(entries[3].content_type, ContentType::Other);
    }

    #[tokio::test]
    async fn non_json_reply_falls_back() {
        let urls = sitemap_urls(&["/blog/a", "/docs/start"]);
        let entries = classifier(CannedService::ok("I cannot help with that."))
            .classify("acme.io", &urls)
            .await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].content_type, ContentType::Docs);
    }

    #[tokio::test]
    async fn empty_array_falls_back() {
        let urls = sitemap_urls(&["/blog/a"]);
        let entries = classifier(CannedService::ok("[]"))
            .classify("acme.io", &urls)
            .await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].content_type, ContentType::Blog);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_service_times_out_to_fallback() {
        let service = Arc::new(CannedService {
            reply: Ok("[]".into()),
            delay: Duration::from_secs(600),
        });
        let classifier = ContentClassifier::new(service, Duration::from_secs(60));

        let entries = classifier
            .classify("acme.io", &sitemap_urls(&["/guides/setup"]))
            .await;

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].content_type, ContentType::Resource);
    }

    #[tokio::test]
    async fn pattern_only_and_empty_input() {
        let classifier = ContentClassifier::pattern_only();
        assert!(classifier.classify("acme.io", &[]).await.is_empty());

        let entries = classifier
            .classify("acme.io", &sitemap_urls(&["/customers/globex"]))
            .await;
        assert_eq!(entries[0].content_type, ContentType::CaseStudy);
        assert_eq!(entries[0].title.as_deref(), Some("Globex"));
    }
}
