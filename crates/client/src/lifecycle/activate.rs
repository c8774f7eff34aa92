use futures_util::future::join_all;
use harbor_core::{CacheStorage, Error, Namespaces};
use serde::Serialize;

/// Result of namespace garbage collection.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActivateReport {
    /// Current namespaces found in the store and left untouched.
    pub kept: Vec<String>,
    /// Stale namespaces that were deleted.
    pub deleted: Vec<String>,
}

/// Delete every namespace that is neither the current static nor the
/// current dynamic one.
///
/// Deletions run concurrently; the first store failure is returned after
/// all of them have settled.
pub async fn activate(storage: &CacheStorage, namespaces: &Namespaces) -> Result<ActivateReport, Error> {
    tracing::info!("activating: keeping {} and {}", namespaces.static_ns, namespaces.dynamic_ns);

    let (kept, stale): (Vec<String>, Vec<String>) = storage
        .keys()
        .await?
        .into_iter()
        .partition(|name| namespaces.is_current(name));

    let results = join_all(stale.iter().map(|name| async move {
        tracing::info!("deleting old cache: {}", name);
        storage.delete(name).await
    }))
    .await;

    results.into_iter().collect::<Result<Vec<bool>, Error>>()?;

    tracing::info!(kept = kept.len(), deleted = stale.len(), "activation cleanup complete");
    Ok(ActivateReport { kept, deleted: stale })
}
