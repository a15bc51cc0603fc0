//! Domain and path normalization shared by every pipeline stage.

use url::Url;

use crate::error::{InventoryError, Result};

/// Resolve user input (`example.com`, `https://example.com/about`,
/// `http://127.0.0.1:8080`) to an origin without trailing slash.
///
/// Bare domains default to `https`.
pub fn origin_for(domain: &str) -> Result<String> {
    let url = parse_domain(domain)?;
    let host = url
        .host_str()
        .ok_or_else(|| InventoryError::validation(format!("domain has no host: {domain}")))?;

    match url.port() {
        Some(port) => Ok(format!("{}://{host}:{port}", url.scheme())),
        None => Ok(format!("{}://{host}", url.scheme())),
    }
}

/// Lowercased host of a domain input, without scheme, port or path.
pub fn host_for(domain: &str) -> Result<String> {
    let url = parse_domain(domain)?;
    url.host_str()
        .map(|h| h.to_lowercase())
        .ok_or_else(|| InventoryError::validation(format!("domain has no host: {domain}")))
}

fn parse_domain(domain: &str) -> Result<Url> {
    let trimmed = domain.trim();
    if trimmed.is_empty() {
        return Err(InventoryError::validation("domain is empty"));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    Url::parse(&candidate)
        .map_err(|e| InventoryError::validation(format!("invalid domain '{domain}': {e}")))
}

/// Path-only identifier for a page: leading `/`, no query or fragment, no
/// trailing `/` except for the root.
///
/// Accepts absolute URLs and bare paths alike.
pub fn normalize_path(location: &str) -> String {
    let trimmed = location.trim();
    let raw = match Url::parse(trimmed) {
        Ok(url) if url.has_host() => url.path().to_string(),
        _ => trimmed
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    let stripped = raw.trim_end_matches('/');
    if stripped.is_empty() {
        "/".to_string()
    } else if stripped.starts_with('/') {
        stripped.to_string()
    } else {
        format!("/{stripped}")
    }
}

/// Join an origin and a normalized path into an absolute URL.
pub fn absolute_url(origin: &str, path: &str) -> String {
    if path == "/" {
        format!("{origin}/")
    } else {
        format!("{origin}{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_for_bare_domain() {
        assert_eq!(origin_for("acme.io").unwrap(), "https://acme.io");
        assert_eq!(origin_for(" www.acme.io ").unwrap(), "https://www.acme.io");
    }

    #[test]
    fn origin_for_url_input() {
        assert_eq!(origin_for("https://acme.io/pricing").unwrap(), "https://acme.io");
        assert_eq!(
            origin_for("http://127.0.0.1:4321").unwrap(),
            "http://127.0.0.1:4321"
        );
    }

    #[test]
    fn origin_for_rejects_empty() {
        assert!(origin_for("").is_err());
        assert!(origin_for("   ").is_err());
    }

    #[test]
    fn host_for_strips_everything_else() {
        assert_eq!(host_for("HTTPS://Acme.io:8443/x").unwrap(), "acme.io");
        assert_eq!(host_for("acme.io").unwrap(), "acme.io");
    }

    #[test]
    fn normalize_path_variants() {
        assert_eq!(normalize_path("https://acme.io/blog/post/"), "/blog/post");
        assert_eq!(normalize_path("https://acme.io"), "/");
        assert_eq!(normalize_path("https://acme.io/?ref=x"), "/");
        assert_eq!(normalize_path("blog/post?utm=1#top"), "/blog/post");
        assert_eq!(normalize_path("/docs/"), "/docs");
        assert_eq!(normalize_path(""), "/");
    }

    #[test]
    fn absolute_url_joins() {
        assert_eq!(absolute_url("https://acme.io", "/"), "https://acme.io/");
        assert_eq!(absolute_url("https://acme.io", "/vs/rival"), "https://acme.io/vs/rival");
    }
}
