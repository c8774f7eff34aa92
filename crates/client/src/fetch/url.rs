//! URL parsing for operator and tool input.

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Whether `input` already names its own scheme.
///
/// `host:port` parses with the host as the scheme, so a scheme that looks
/// like a hostname (contains a dot, or is `localhost`) does not count.
fn has_scheme(input: &str) -> bool {
    match url::Url::parse(input) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            !scheme.contains('.') && scheme != "localhost"
        }
        Err(_) => false,
    }
}

/// Canonicalize a URL string typed by an operator or supplied to a tool.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if the input names none
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
///
/// Non-http schemes are accepted here; they route as pass-through.
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if has_scheme(trimmed) { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    if let Some(host) = parsed.host_str().map(str::to_lowercase) {
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

impl From<UrlError> for harbor_core::Error {
    fn from(err: UrlError) -> Self {
        match err {
            UrlError::Empty => harbor_core::Error::InvalidInput("url cannot be empty".into()),
            other => harbor_core::Error::InvalidUrl(other.to_string()),
        }
    }
}

/// Reject URLs the network client cannot fetch.
pub fn ensure_fetchable(url: &url::Url) -> Result<(), UrlError> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_basic() {
        let url = canonicalize("https://example.com").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_canonicalize_default_scheme() {
        let url = canonicalize("example.com/app.js").unwrap();
        assert_eq!(url.as_str(), "https://example.com/app.js");
    }

    #[test]
    fn test_canonicalize_lowercase_host() {
        let url = canonicalize("https://FONTS.GSTATIC.COM/font.woff2").unwrap();
        assert_eq!(url.host_str(), Some("fonts.gstatic.com"));
    }

    #[test]
    fn test_canonicalize_remove_fragment() {
        let url = canonicalize("https://example.com/page#section").unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path(), "/page");
    }

    #[test]
    fn test_canonicalize_preserve_query() {
        let url = canonicalize("https://fonts.googleapis.com/css2?family=Cairo:wght@300;400&display=swap").unwrap();
        assert_eq!(url.query(), Some("family=Cairo:wght@300;400&display=swap"));
    }

    #[test]
    fn test_canonicalize_keeps_opaque_schemes() {
        let url = canonicalize("data:text/plain,hello").unwrap();
        assert_eq!(url.scheme(), "data");
        let url = canonicalize("chrome-extension://abc/script.js").unwrap();
        assert_eq!(url.scheme(), "chrome-extension");
    }

    #[test]
    fn test_canonicalize_keeps_any_parsed_scheme() {
        let url = canonicalize("tel:123").unwrap();
        assert_eq!(url.as_str(), "tel:123");
        let url = canonicalize("mailto:ops@example.com").unwrap();
        assert_eq!(url.scheme(), "mailto");
        let url = canonicalize("urn:isbn:0451450523").unwrap();
        assert_eq!(url.scheme(), "urn");
    }

    #[test]
    fn test_canonicalize_host_port_gets_default_scheme() {
        let url = canonicalize("example.com:8443/x").unwrap();
        assert_eq!(url.as_str(), "https://example.com:8443/x");
        let url = canonicalize("example.com/login?next=https://other.example/").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
        let url = canonicalize("localhost:3000").unwrap();
        assert_eq!(url.as_str(), "https://localhost:3000/");
        let url = canonicalize("127.0.0.1:8080/a").unwrap();
        assert_eq!(url.as_str(), "https://127.0.0.1:8080/a");
    }

    #[test]
    fn test_canonicalize_empty() {
        assert!(matches!(canonicalize(""), Err(UrlError::Empty)));
        assert!(matches!(canonicalize("   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_ensure_fetchable() {
        assert!(ensure_fetchable(&canonicalize("http://example.com").unwrap()).is_ok());
        let result = ensure_fetchable(&canonicalize("file:///etc/hosts").unwrap());
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }
}
