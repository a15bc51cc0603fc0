//! URL filter: drops discovered URLs that are not content pages.
//!
//! Pure string matching on the lowercased path, no network access.

use std::collections::HashSet;

use tracing::debug;

use siteinventory_shared::{SitemapUrl, normalize_path};

/// Path prefixes marking non-content pages.
///
/// Matched against the lowercased path with a trailing `/` appended, so a
/// needle ending in `/` only matches a whole segment (`/feed/` hits `/feed`
/// but not `/blog/feedback-loops`). Needles without the trailing slash are
/// plain prefixes (`/privacy` hits `/privacy-policy`).
pub const DENYLIST: &[&str] = &[
    // Authentication, accounts, sessions
    "/login",
    "/logout",
    "/signin",
    "/sign-in",
    "/signup",
    "/sign-up",
    "/register/",
    "/account/",
    "/accounts/",
    "/my-account",
    "/auth/",
    "/oauth/",
    "/session/",
    "/sessions/",
    "/unsubscribe/",
    // Legal and policy
    "/privacy",
    "/terms-of-",
    "/terms-and-",
    "/cookie-policy",
    "/gdpr/",
    // Careers
    "/careers/",
    "/jobs/",
    // Admin and CMS internals
    "/wp-",
    "/admin/",
    "/cms/",
    "/xmlrpc",
    // Feeds
    "/feed/",
    "/rss/",
    "/atom/",
    "/rss.xml/",
    "/feed.xml/",
    // Taxonomy and pagination
    "/tag/",
    "/tags/",
    "/category/",
    "/categories/",
    "/author/",
    "/page/",
];

/// Top-level sections that hold no content. Only matched as the first path
/// segment: `/legal/terms` is dropped, `/industries/legal` is not.
pub const DENIED_SECTIONS: &[&str] = &[
    "/legal/", "/terms/", "/cookie/", "/cookies/", "/error/", "/404/", "/500/",
];

/// Whether a URL's path avoids every denylisted needle and section.
pub fn is_content_url(location: &str) -> bool {
    let path = normalize_path(location).to_lowercase();
    let probe = format!("{}/", path.trim_end_matches('/'));
    !DENYLIST.iter().any(|needle| probe.contains(needle))
        && !DENIED_SECTIONS.iter().any(|section| probe.starts_with(section))
}

/// Keep only content URLs, preserving input order.
pub fn filter_urls(urls: Vec<SitemapUrl>) -> Vec<SitemapUrl> {
    let before = urls.len();
    let kept: Vec<SitemapUrl> = urls
        .into_iter()
        .filter(|u| {
            let keep = is_content_url(&u.location);
            if !keep {
                debug!(url = %u.location, "filtered out");
            }
            keep
        })
        .collect();

    debug!(before, after = kept.len(), "URL filter applied");
    kept
}

/// Drop URLs whose normalized path was already seen, keeping the first.
///
/// `https://x/a` and `https://x/a/` name the same page.
pub fn dedupe_paths(urls: Vec<SitemapUrl>) -> Vec<SitemapUrl> {
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter(|u| seen.insert(normalize_path(&u.location)))
        .collect()
}
