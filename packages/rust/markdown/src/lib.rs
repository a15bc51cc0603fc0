//! HTML-to-Markdown conversion for page deep-reads.
//!
//! Marketing pages carry a lot of chrome (navigation, cookie banners, footers)
//! that would inflate word counts. This crate isolates the main content,
//! converts it with `htmd`, and runs a short cleanup pipeline so the result
//! is prose-like Markdown suitable for counting and quality assessment.

mod cleanup;

use scraper::{Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use siteinventory_shared::{InventoryError, Result};

/// Tags dropped entirely during conversion.
const SKIP_TAGS: [&str; 12] = [
    "script", "style", "nav", "header", "footer", "aside", "form", "button", "iframe",
    "noscript", "svg", "template",
];

/// Content containers, tried in priority order.
const CONTENT_SELECTORS: [&str; 6] = [
    "main",
    "[role=\"main\"]",
    "article",
    "#content",
    ".content",
    "body",
];

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Readable text extracted from an HTML page.
#[derive(Debug, Clone)]
pub struct PageText {
    /// Cleaned Markdown body.
    pub markdown: String,
    /// Page title from `og:title`, the first `<h1>`, or `<title>`.
    pub title: Option<String>,
}

impl PageText {
    /// Whitespace-delimited token count of the Markdown body.
    pub fn word_count(&self) -> usize {
        self.markdown.split_whitespace().count()
    }
}

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

/// Convert an HTML document to readable Markdown.
///
/// `source_url` is used to resolve relative links; pass `None` to keep them
/// as written.
#[instrument(skip(html, source_url), fields(url = source_url.map(Url::as_str).unwrap_or("")))]
pub fn html_to_page_text(html: &str, source_url: Option<&Url>) -> Result<PageText> {
    let doc = Html::parse_document(html);
    let title = extract_title(&doc);
    let content_html = extract_content_html(&doc).unwrap_or_else(|| html.to_string());

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(SKIP_TAGS.to_vec())
        .build();

    let raw_markdown = converter
        .convert(&content_html)
        .map_err(|e| InventoryError::Conversion(format!("htmd conversion failed: {e}")))?;

    let markdown = cleanup::run_pipeline(&raw_markdown, source_url);

    debug!(
        raw_len = raw_markdown.len(),
        final_len = markdown.len(),
        has_title = title.is_some(),
        "page converted"
    );

    Ok(PageText { markdown, title })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Inner HTML of the first matching content container.
fn extract_content_html(doc: &Html) -> Option<String> {
    CONTENT_SELECTORS.iter().find_map(|sel_str| {
        let selector = Selector::parse(sel_str).ok()?;
        doc.select(&selector).next().map(|el| el.inner_html())
    })
}

/// Best available page title: `og:title`, then first `<h1>`, then `<title>`.
fn extract_title(doc: &Html) -> Option<String> {
    let og = Selector::parse(r#"meta[property="og:title"]"#)
        .ok()
        .and_then(|sel| {
            doc.select(&sel)
                .next()
                .and_then(|el| el.value().attr("content"))
                .map(str::to_string)
        });

    let from_text = |sel_str: &str| {
        let sel = Selector::parse(sel_str).ok()?;
        doc.select(&sel)
            .next()
            .map(|el| el.text().collect::<Vec<_>>().join(" "))
    };

    [og, from_text("h1"), from_text("title")]
        .into_iter()
        .flatten()
        .map(|t| collapse_whitespace(&t))
        .find(|t| !t.is_empty())
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
