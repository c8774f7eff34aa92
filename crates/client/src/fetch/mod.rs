//! Network access for intercepted requests.
//!
//! ### Fetch semantics
//! - A resolved HTTP response is always `Ok`, whatever its status (a 404 is a
//!   valid network answer).
//! - `Err` means the fetch rejected: offline, DNS failure, connection reset,
//!   timeout, or a body that could not be read.
//!
//! ### Limits
//! - Max redirects: 5 (configurable)
//! - Max body bytes: 5MB (configurable)
//! - No deadline unless one is configured

pub mod error;
pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use harbor_core::{AppConfig, Request, ResponseSnapshot};
use reqwest::{Client, Method, header};
use std::time::{Duration, Instant};

pub use error::FetchError;
pub use url::{UrlError, canonicalize, ensure_fetchable};

/// The network as seen by the strategies.
#[async_trait]
pub trait Network: Send + Sync {
    /// Perform the request once, with no retries.
    async fn fetch(&self, request: &Request) -> Result<ResponseSnapshot, FetchError>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "harbor/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request deadline (default: none)
    pub timeout: Option<Duration>,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "harbor/0.1".to_string(), max_bytes: 5 * 1024 * 1024, timeout: None, max_redirects: 5 }
    }
}

impl FetchConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.fetch_timeout(),
            max_redirects: config.max_redirects,
        }
    }
}

/// reqwest-backed [`Network`].
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder.build().map_err(FetchError::from)?;

        Ok(Self { http, config })
    }

    fn build_request(&self, request: &Request) -> Result<reqwest::RequestBuilder, FetchError> {
        ensure_fetchable(&request.url).map_err(|e| FetchError::InvalidRequest(e.to_string()))?;

        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| FetchError::InvalidRequest(format!("invalid method: {}", request.method)))?;

        let mut builder = self.http.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            match (
                header::HeaderName::from_bytes(name.as_bytes()),
                header::HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => builder = builder.header(name, value),
                _ => tracing::debug!("dropping invalid request header {}", name),
            }
        }
        Ok(builder)
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<ResponseSnapshot, FetchError> {
        let start = Instant::now();
        let response = self.build_request(request)?.send().await?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(FetchError::TooLarge { size: len as usize, limit: self.config.max_bytes });
        }

        let final_url = response.url().clone();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
            .collect();

        let bytes: Bytes = response.bytes().await?;

        if bytes.len() > self.config.max_bytes {
            return Err(FetchError::TooLarge { size: bytes.len(), limit: self.config.max_bytes });
        }

        tracing::debug!(
            "fetched {} {} -> {} ({}) in {}ms ({} bytes)",
            request.method,
            request.url,
            final_url,
            status.as_u16(),
            start.elapsed().as_millis(),
            bytes.len()
        );

        Ok(ResponseSnapshot {
            url: final_url.to_string(),
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body: bytes,
            stored_at: chrono::Utc::now(),
        })
    }
}
