//! Request and response types shared by the store, the router and the network.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// An intercepted outbound request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Upper-case HTTP method.
    pub method: String,
    pub url: Url,
    /// Header pairs in the order they were supplied.
    #[serde(default)]
    pub headers: Vec<(String, String)>,
}

impl Request {
    /// Build a request with an explicit method.
    pub fn new(method: &str, url: Url) -> Self {
        Self { method: method.to_ascii_uppercase(), url, headers: Vec::new() }
    }

    /// Build a GET request.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url)
    }

    /// Add a header, builder style.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First value of the named header, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Only HTTP and HTTPS requests are intercepted.
    pub fn is_interceptable(&self) -> bool {
        matches!(self.url.scheme(), "http" | "https")
    }

    /// Only GET requests are ever read from or written to the store.
    pub fn is_cacheable(&self) -> bool {
        self.method == "GET"
    }
}

/// Immutable captured copy of a response.
///
/// The body is a [`Bytes`], so cloning hands out another independently
/// readable view of the same bytes instead of consuming the original.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    /// URL the response was produced for. Empty for synthesized responses.
    #[serde(default)]
    pub url: String,
    pub status: u16,
    #[serde(default)]
    pub status_text: String,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub stored_at: DateTime<Utc>,
}

impl ResponseSnapshot {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            url: String::new(),
            status,
            status_text: reason_phrase(status).to_string(),
            headers: Vec::new(),
            body: body.into(),
            stored_at: Utc::now(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// The human-readable 503 returned by cache-first when nothing can answer.
    pub fn offline(message: &str) -> Self {
        Self::new(503, message.to_string()).with_header("Content-Type", "text/plain; charset=utf-8")
    }

    /// The empty 503 returned by network-first when nothing can answer.
    pub fn unavailable() -> Self {
        Self::new(503, Bytes::new())
    }

    /// True for 2xx statuses.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// True for the statuses cache-first is willing to store.
    pub fn is_storable(&self) -> bool {
        self.is_ok() && self.status < 400
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_interceptable_schemes() {
        assert!(Request::get(url("https://example.com/")).is_interceptable());
        assert!(Request::get(url("http://example.com/")).is_interceptable());
        assert!(!Request::get(url("chrome-extension://abc/script.js")).is_interceptable());
        assert!(!Request::get(url("data:text/plain,hello")).is_interceptable());
    }

    #[test]
    fn test_only_get_is_cacheable() {
        assert!(Request::get(url("https://example.com/")).is_cacheable());
        assert!(!Request::new("post", url("https://example.com/")).is_cacheable());
    }

    #[test]
    fn test_method_uppercased() {
        assert_eq!(Request::new("head", url("https://example.com/")).method, "HEAD");
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let req = Request::get(url("https://example.com/")).with_header("Accept-Language", "ar");
        assert_eq!(req.header("accept-language"), Some("ar"));
        assert_eq!(req.header("accept"), None);
    }

    #[test]
    fn test_ok_and_storable() {
        assert!(ResponseSnapshot::new(200, "x").is_storable());
        assert!(ResponseSnapshot::new(204, "").is_ok());
        assert!(!ResponseSnapshot::new(304, "").is_ok());
        assert!(!ResponseSnapshot::new(404, "").is_storable());
    }

    #[test]
    fn test_offline_response() {
        let res = ResponseSnapshot::offline("Offline");
        assert_eq!(res.status, 503);
        assert_eq!(res.status_text, "Service Unavailable");
        assert_eq!(res.body, Bytes::from_static(b"Offline"));
        assert_eq!(res.content_type(), Some("text/plain; charset=utf-8"));
    }

    #[test]
    fn test_unavailable_response_is_empty() {
        let res = ResponseSnapshot::unavailable();
        assert_eq!(res.status, 503);
        assert!(res.body.is_empty());
    }
}
