//! Retrieval strategies.
//!
//! Both strategies share one rule: a response that arrives with a non-ok
//! status is still returned to the caller, but only successful responses
//! are written to the namespace. A rejected fetch is never surfaced; it
//! turns into a cached copy or a synthesized 503.

mod cache_first;
mod network_first;

pub use cache_first::cache_first;
pub use network_first::network_first;

use harbor_core::{CacheStorage, NamespaceHandle, Request, ResponseSnapshot, Strategy};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::fetch::Network;

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Served {
    /// Stored snapshot for this exact request.
    Cache,
    /// Live network response.
    Network,
    /// Stored offline document, served because the network rejected.
    Fallback,
    /// Synthesized 503.
    Offline,
}

impl Served {
    pub fn as_str(&self) -> &'static str {
        match self {
            Served::Cache => "cache",
            Served::Network => "network",
            Served::Fallback => "fallback",
            Served::Offline => "offline",
        }
    }
}

/// A response plus its provenance.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub response: ResponseSnapshot,
    pub served: Served,
}

impl Outcome {
    pub fn new(response: ResponseSnapshot, served: Served) -> Self {
        Self { response, served }
    }
}

/// What cache-first serves when the network rejects.
#[derive(Debug, Clone)]
pub struct OfflineFallback {
    /// Request for the root document, looked up in the same namespace.
    pub document: Request,
    /// Body of the synthesized 503.
    pub message: String,
}

impl OfflineFallback {
    pub fn new(document_url: Url, message: impl Into<String>) -> Self {
        Self { document: Request::get(document_url), message: message.into() }
    }
}

/// Open the routed namespace and run the strategy against it.
///
/// A namespace that cannot be opened is treated like a dead network with an
/// empty cache: the strategy's synthesized 503 is returned.
pub async fn serve(
    strategy: Strategy, storage: &CacheStorage, namespace: &str, request: &Request, network: &dyn Network,
    offline: &OfflineFallback,
) -> Outcome {
    let cache = match storage.open(namespace).await {
        Ok(cache) => cache,
        Err(e) => {
            tracing::warn!(namespace, error = %e, "failed to open namespace");
            let response = match strategy {
                Strategy::CacheFirst => ResponseSnapshot::offline(&offline.message),
                Strategy::NetworkFirst => ResponseSnapshot::unavailable(),
            };
            return Outcome::new(response, Served::Offline);
        }
    };

    match strategy {
        Strategy::CacheFirst => cache_first(request, &cache, network, offline).await,
        Strategy::NetworkFirst => network_first(request, &cache, network).await,
    }
}

/// Write a copy of the response, logging instead of failing.
async fn store_copy(cache: &NamespaceHandle, request: &Request, response: &ResponseSnapshot) {
    if let Err(e) = cache.put(request, response).await {
        tracing::warn!(namespace = cache.name(), url = %request.url, error = %e, "failed to store response");
    }
}

/// Look up a stored copy, treating store failures as a miss.
async fn lookup(cache: &NamespaceHandle, request: &Request) -> Option<ResponseSnapshot> {
    if !request.is_cacheable() {
        return None;
    }
    match cache.get(request).await {
        Ok(hit) => hit,
        Err(e) => {
            tracing::warn!(namespace = cache.name(), url = %request.url, error = %e, "cache lookup failed");
            None
        }
    }
}
