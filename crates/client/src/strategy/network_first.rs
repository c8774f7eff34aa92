use harbor_core::{NamespaceHandle, Request, ResponseSnapshot};

use super::{Outcome, Served, lookup, store_copy};
use crate::fetch::Network;

/// Serve from the network, falling back to the namespace when it rejects.
///
/// 1. The network is always asked first; an ok response is stored and returned.
/// 2. If the fetch rejects, the stored snapshot for this exact request is
///    served, or an empty 503 when there is none.
pub async fn network_first(request: &Request, cache: &NamespaceHandle, network: &dyn Network) -> Outcome {
    match network.fetch(request).await {
        Ok(response) => {
            if response.is_ok() && request.is_cacheable() {
                store_copy(cache, request, &response).await;
            }
            Outcome::new(response, Served::Network)
        }
        Err(err) => {
            tracing::debug!("fetch failed for {}: {}; trying {}", request.url, err, cache.name());
            match lookup(cache, request).await {
                Some(hit) => Outcome::new(hit, Served::Cache),
                None => Outcome::new(ResponseSnapshot::unavailable(), Served::Offline),
            }
        }
    }
}
