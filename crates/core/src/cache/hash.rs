//! Request identity: the key entries are stored and matched under.
//!
//! The identity covers the method, the canonical URL (fragment removed,
//! host lowercased, query kept verbatim) and the values of the configured
//! vary headers.

use sha2::{Digest, Sha256};
use url::Url;

use crate::Request;

/// Canonical form of a URL for identity purposes.
pub fn canonical_url(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    if let Some(host) = url.host_str().map(str::to_lowercase) {
        // set_host only fails for cannot-be-a-base URLs, which have no host
        let _ = url.set_host(Some(&host));
    }
    url.to_string()
}

/// Collect the `name:value` pairs of the vary headers present on the request.
///
/// Names are lowercased and pairs sorted so header order never changes identity.
pub fn vary_key(request: &Request, vary_headers: &[String]) -> String {
    let mut pairs: Vec<String> = vary_headers
        .iter()
        .filter_map(|name| {
            request
                .header(name)
                .map(|value| format!("{}:{}", name.to_lowercase(), value.trim()))
        })
        .collect();
    pairs.sort();
    pairs.join("\n")
}

/// Compute the identity key of a request.
pub fn compute_cache_key(method: &str, url: &Url, vary: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(canonical_url(url).as_bytes());
    hasher.update(b"\n");
    hasher.update(vary.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compute the identity key of a request, honouring the given vary headers.
pub fn request_key(request: &Request, vary_headers: &[String]) -> String {
    compute_cache_key(&request.method, &request.url, &vary_key(request, vary_headers))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_hash_stability() {
        let hash1 = compute_cache_key("GET", &url("https://example.com"), "");
        let hash2 = compute_cache_key("get", &url("https://example.com/"), "");
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_ignores_fragment() {
        let a = compute_cache_key("GET", &url("https://example.com/page#top"), "");
        let b = compute_cache_key("GET", &url("https://example.com/page"), "");
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash_keeps_query() {
        let a = compute_cache_key("GET", &url("https://example.com/?v=1"), "");
        let b = compute_cache_key("GET", &url("https://example.com/?v=2"), "");
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_different_method() {
        let get = compute_cache_key("GET", &url("https://example.com"), "");
        let head = compute_cache_key("HEAD", &url("https://example.com"), "");
        assert_ne!(get, head);
    }

    #[test]
    fn test_vary_headers_change_identity() {
        let vary = vec!["Accept-Language".to_string()];
        let ar = Request::get(url("https://example.com/")).with_header("accept-language", "ar");
        let en = Request::get(url("https://example.com/")).with_header("Accept-Language", "en");
        assert_ne!(request_key(&ar, &vary), request_key(&en, &vary));
        assert_eq!(request_key(&ar, &[]), request_key(&en, &[]));
    }

    #[test]
    fn test_vary_key_sorted() {
        let vary = vec!["b".to_string(), "a".to_string()];
        let req = Request::get(url("https://example.com/")).with_header("A", "1").with_header("B", "2");
        assert_eq!(vary_key(&req, &vary), "a:1\nb:2");
    }

    #[test]
    fn test_hash_format() {
        let hash = compute_cache_key("GET", &url("https://example.com"), "");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
