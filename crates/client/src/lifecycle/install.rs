use futures_util::future::join_all;
use harbor_core::{AppConfig, CacheStorage, ConfigError, Error, NamespaceHandle, Namespaces, Request};
use serde::Serialize;
use url::Url;

use crate::fetch::Network;

/// URLs pre-cached at install.
#[derive(Debug, Clone, Default)]
pub struct InstallAssets {
    /// Same-origin assets, resolved to absolute URLs.
    pub static_assets: Vec<Url>,
    pub external_assets: Vec<Url>,
}

impl InstallAssets {
    /// Resolve the configured asset lists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if any entry fails to parse.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self { static_assets: config.static_asset_urls()?, external_assets: config.external_asset_urls()? })
    }
}

/// What install managed to pre-cache.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InstallReport {
    pub static_cached: usize,
    /// Why the static batch was skipped, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_skipped: Option<String>,
    pub external_cached: usize,
    /// External URLs that could not be cached, with the reason.
    pub external_failed: Vec<(String, String)>,
}

/// Run the install phase against the current namespaces.
///
/// Individual asset failures never fail install. Only a failure to open
/// one of the namespaces does.
pub async fn install(
    storage: &CacheStorage, network: &dyn Network, namespaces: &Namespaces, assets: &InstallAssets,
) -> Result<InstallReport, Error> {
    tracing::info!(
        "installing: pre-caching {} static and {} external assets",
        assets.static_assets.len(),
        assets.external_assets.len()
    );

    let (static_result, external_result) = tokio::join!(
        async {
            let cache = storage.open(&namespaces.static_ns).await?;
            Ok::<_, Error>(precache_static(&cache, network, &assets.static_assets).await)
        },
        async {
            let cache = storage.open(&namespaces.dynamic_ns).await?;
            Ok::<_, Error>(precache_external(&cache, network, &assets.external_assets).await)
        },
    );

    let (static_cached, static_skipped) = static_result?;
    let (external_cached, external_failed) = external_result?;

    let report = InstallReport { static_cached, static_skipped, external_cached, external_failed };
    tracing::info!(
        static_cached = report.static_cached,
        external_cached = report.external_cached,
        external_failed = report.external_failed.len(),
        "installation complete"
    );
    Ok(report)
}

/// All-or-nothing batch add of the static assets.
async fn precache_static(cache: &NamespaceHandle, network: &dyn Network, urls: &[Url]) -> (usize, Option<String>) {
    let requests: Vec<Request> = urls.iter().cloned().map(Request::get).collect();
    let results = join_all(requests.iter().map(|req| network.fetch(req))).await;

    let mut batch = Vec::with_capacity(requests.len());
    for (request, result) in requests.into_iter().zip(results) {
        match result {
            Ok(response) if response.is_ok() => batch.push((request, response)),
            Ok(response) => {
                let reason = format!("{} returned status {}", request.url, response.status);
                tracing::warn!("some static assets failed to cache: {}", reason);
                return (0, Some(reason));
            }
            Err(e) => {
                let reason = format!("{}: {}", request.url, e);
                tracing::warn!("some static assets failed to cache: {}", reason);
                return (0, Some(reason));
            }
        }
    }

    match cache.put_all(&batch).await {
        Ok(()) => (batch.len(), None),
        Err(e) => {
            tracing::warn!("some static assets failed to cache: {}", e);
            (0, Some(e.to_string()))
        }
    }
}

/// Settle-all pre-fetch of external assets; each ok response is stored on its own.
async fn precache_external(
    cache: &NamespaceHandle, network: &dyn Network, urls: &[Url],
) -> (usize, Vec<(String, String)>) {
    let settled = join_all(urls.iter().map(|url| cache_external(cache, network, url))).await;

    let mut cached = 0;
    let mut failed = Vec::new();
    for (url, result) in urls.iter().zip(settled) {
        match result {
            Ok(()) => cached += 1,
            Err(reason) => {
                tracing::debug!("external asset {} not cached: {}", url, reason);
                failed.push((url.to_string(), reason));
            }
        }
    }
    (cached, failed)
}

async fn cache_external(cache: &NamespaceHandle, network: &dyn Network, url: &Url) -> Result<(), String> {
    let request = Request::get(url.clone());
    let response = network.fetch(&request).await.map_err(|e| e.to_string())?;
    if !response.is_ok() {
        return Err(format!("status {}", response.status));
    }
    cache.put(&request, &response).await.map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use harbor_core::MemoryStore;

    use super::*;
    use crate::strategy::testing::ScriptedNetwork;

    const ORIGIN: &str = "https://app.example.com";

    fn namespaces() -> Namespaces {
        Namespaces::new("static-v1", "dynamic-v1")
    }

    fn assets() -> InstallAssets {
        let origin = Url::parse(ORIGIN).unwrap();
        InstallAssets {
            static_assets: ["/", "/index.html", "/manifest.json"]
                .iter()
                .map(|p| origin.join(p).unwrap())
                .collect(),
            external_assets: [
                "https://cdn.tailwindcss.com/",
                "https://fonts.googleapis.com/css2?family=Cairo",
                "https://images.unsplash.com/photo-1",
            ]
            .iter()
            .map(|u| Url::parse(u).unwrap())
            .collect(),
        }
    }

    fn storage() -> CacheStorage {
        CacheStorage::new(Arc::new(MemoryStore::new()), Vec::new())
    }

    fn full_network() -> ScriptedNetwork {
        ScriptedNetwork::new()
            .respond("https://app.example.com/", 200, "root")
            .respond("https://app.example.com/index.html", 200, "index")
            .respond("https://app.example.com/manifest.json", 200, "{}")
            .respond("https://cdn.tailwindcss.com/", 200, "tw")
            .respond("https://fonts.googleapis.com/css2?family=Cairo", 200, "font")
            .respond("https://images.unsplash.com/photo-1", 200, "img")
    }

    #[tokio::test]
    async fn test_install_caches_everything() {
        let storage = storage();
        let report = install(&storage, &full_network(), &namespaces(), &assets()).await.unwrap();

        assert_eq!(report.static_cached, 3);
        assert!(report.static_skipped.is_none());
        assert_eq!(report.external_cached, 3);
        assert!(report.external_failed.is_empty());
        assert_eq!(storage.open("static-v1").await.unwrap().len().await.unwrap(), 3);
        assert_eq!(storage.open("dynamic-v1").await.unwrap().len().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_one_external_failure_does_not_block_others() {
        let storage = storage();
        let network = ScriptedNetwork::new()
            .respond("https://app.example.com/", 200, "root")
            .respond("https://app.example.com/index.html", 200, "index")
            .respond("https://app.example.com/manifest.json", 200, "{}")
            .respond("https://cdn.tailwindcss.com/", 200, "tw")
            .respond("https://images.unsplash.com/photo-1", 404, "gone");

        let report = install(&storage, &network, &namespaces(), &assets()).await.unwrap();

        assert_eq!(report.external_cached, 1);
        assert_eq!(report.external_failed.len(), 2);
        assert_eq!(report.static_cached, 3);

        let dynamic = storage.open("dynamic-v1").await.unwrap();
        let tailwind = Request::get(Url::parse("https://cdn.tailwindcss.com/").unwrap());
        assert!(dynamic.get(&tailwind).await.unwrap().is_some());
        let photo = Request::get(Url::parse("https://images.unsplash.com/photo-1").unwrap());
        assert!(dynamic.get(&photo).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_static_batch_is_all_or_nothing() {
        let storage = storage();
        let network = ScriptedNetwork::new()
            .respond("https://app.example.com/", 200, "root")
            .respond("https://app.example.com/index.html", 200, "index")
            .respond("https://cdn.tailwindcss.com/", 200, "tw");

        let report = install(&storage, &network, &namespaces(), &assets()).await.unwrap();

        assert_eq!(report.static_cached, 0);
        assert!(report.static_skipped.unwrap().contains("manifest.json"));
        assert!(storage.open("static-v1").await.unwrap().is_empty().await.unwrap());
        assert_eq!(report.external_cached, 1);
    }

    #[tokio::test]
    async fn test_install_fully_offline_still_completes() {
        let storage = storage();
        let network = ScriptedNetwork::offline();

        let report = install(&storage, &network, &namespaces(), &assets()).await.unwrap();

        assert_eq!(report.static_cached, 0);
        assert_eq!(report.external_cached, 0);
        assert_eq!(report.external_failed.len(), 3);
        // Every asset was attempted despite the failures.
        assert_eq!(network.calls(), 6);
        assert_eq!(storage.keys().await.unwrap(), vec!["dynamic-v1".to_string(), "static-v1".to_string()]);
    }

    #[test]
    fn test_assets_from_config() {
        let config = AppConfig { app_origin: ORIGIN.into(), ..Default::default() };
        let assets = InstallAssets::from_config(&config).unwrap();
        assert_eq!(assets.static_assets[1].as_str(), "https://app.example.com/index.html");
        assert_eq!(assets.external_assets.len(), 2);
    }
}
