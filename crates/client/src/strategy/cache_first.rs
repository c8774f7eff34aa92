use harbor_core::{NamespaceHandle, Request, ResponseSnapshot};

use super::{OfflineFallback, Outcome, Served, lookup, store_copy};
use crate::fetch::Network;

/// Serve from the namespace when present, otherwise from the network.
///
/// 1. A stored snapshot is returned as-is, with no network call.
/// 2. On a miss the network is asked once; a successful response is stored
///    before it is returned.
/// 3. If the fetch rejects, the stored offline document from the same
///    namespace is served, or a plain-text 503 when there is none.
pub async fn cache_first(
    request: &Request, cache: &NamespaceHandle, network: &dyn Network, offline: &OfflineFallback,
) -> Outcome {
    if let Some(hit) = lookup(cache, request).await {
        tracing::debug!("cache hit for {} in {}", request.url, cache.name());
        return Outcome::new(hit, Served::Cache);
    }

    match network.fetch(request).await {
        Ok(response) => {
            if response.is_storable() && request.is_cacheable() {
                store_copy(cache, request, &response).await;
            }
            Outcome::new(response, Served::Network)
        }
        Err(err) => {
            tracing::debug!("fetch failed for {}: {}; trying offline document", request.url, err);
            match lookup(cache, &offline.document).await {
                Some(document) => Outcome::new(document, Served::Fallback),
                None => Outcome::new(ResponseSnapshot::offline(&offline.message), Served::Offline),
            }
        }
    }
}
