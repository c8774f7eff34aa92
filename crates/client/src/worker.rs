//! Lifecycle event wiring.
//!
//! [`ServiceWorker`] reacts to the host's three events. `install()` and
//! `activate()` return futures the host must drive to completion before it
//! considers the phase done; `handle_fetch()` returns `None` for requests
//! it does not intercept and otherwise a future resolving to the response.
//!
//! Requests are only intercepted once the worker is `Activated`, so stale
//! namespace cleanup and client claiming always happen first.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use harbor_core::{
    AppConfig, CacheStorage, ConfigError, Error, NamespaceKind, Namespaces, Request, Route, RouteTable, Strategy,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, watch};

use crate::fetch::Network;
use crate::lifecycle::{self, ActivateReport, InstallAssets, InstallReport};
use crate::strategy::{self, OfflineFallback, Outcome, Served};

/// Worker lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// A lifecycle phase failed; the worker will never serve.
    Redundant,
}

/// Open clients and the worker version controlling each.
#[derive(Debug, Default)]
pub struct Clients {
    inner: RwLock<ClientTable>,
}

#[derive(Debug, Default)]
struct ClientTable {
    controllers: HashMap<String, Option<String>>,
    /// Version that has claimed clients; later registrations are controlled by it.
    claimed_by: Option<String>,
}

impl Clients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a client. Once a version has claimed, new clients are controlled by it.
    pub async fn register(&self, id: &str) {
        let mut table = self.inner.write().await;
        let controller = table.claimed_by.clone();
        let slot = table.controllers.entry(id.to_string()).or_insert(None);
        if controller.is_some() {
            *slot = controller;
        }
    }

    /// Take control of every tracked client and of any registered later.
    /// Returns how many were claimed.
    pub async fn claim(&self, version: &str) -> usize {
        let mut table = self.inner.write().await;
        table.claimed_by = Some(version.to_string());
        for controller in table.controllers.values_mut() {
            *controller = Some(version.to_string());
        }
        table.controllers.len()
    }

    pub async fn controller(&self, id: &str) -> Option<String> {
        self.inner.read().await.controllers.get(id).cloned().flatten()
    }

    /// Number of clients controlled by `version`.
    pub async fn controlled_by(&self, version: &str) -> usize {
        self.inner
            .read()
            .await
            .controllers
            .values()
            .filter(|c| c.as_deref() == Some(version))
            .count()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.controllers.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Everything a worker needs besides the store and the network.
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    pub routes: RouteTable,
    pub namespaces: Namespaces,
    pub assets: InstallAssets,
    pub offline: OfflineFallback,
}

impl WorkerOptions {
    /// Build options from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin or an asset URL fails to parse.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let origin = config.origin()?;
        let document = origin.join(&config.offline_document).map_err(|e| ConfigError::Invalid {
            field: "offline_document".into(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            routes: RouteTable::from_config(config)?,
            namespaces: Namespaces::from_config(config),
            assets: InstallAssets::from_config(config)?,
            offline: OfflineFallback::new(document, &config.offline_message),
        })
    }
}

/// An intercepted request's response.
#[derive(Debug, Clone)]
pub struct Intercepted {
    pub route: Route,
    pub served: Served,
    pub response: harbor_core::ResponseSnapshot,
}

struct Inner {
    version: String,
    storage: CacheStorage,
    network: Arc<dyn Network>,
    options: WorkerOptions,
    state: watch::Sender<WorkerState>,
    skip_waiting: AtomicBool,
    clients: Clients,
}

/// Cheaply cloneable handle to one worker version.
#[derive(Clone)]
pub struct ServiceWorker {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ServiceWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceWorker")
            .field("version", &self.inner.version)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl ServiceWorker {
    pub fn new(storage: CacheStorage, network: Arc<dyn Network>, options: WorkerOptions) -> Self {
        let version = format!("{}+{}", options.namespaces.static_ns, options.namespaces.dynamic_ns);
        let (state, _) = watch::channel(WorkerState::Parsed);
        Self {
            inner: Arc::new(Inner {
                version,
                storage,
                network,
                options,
                state,
                skip_waiting: AtomicBool::new(false),
                clients: Clients::new(),
            }),
        }
    }

    /// Version identifier, derived from the current namespace names.
    pub fn version(&self) -> &str {
        &self.inner.version
    }

    pub fn state(&self) -> WorkerState {
        *self.inner.state.borrow()
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.inner.state.subscribe()
    }

    /// Whether install has asked to take over without waiting for old clients to close.
    pub fn skip_waiting_requested(&self) -> bool {
        self.inner.skip_waiting.load(Ordering::SeqCst)
    }

    pub fn namespaces(&self) -> &Namespaces {
        &self.inner.options.namespaces
    }

    pub fn routes(&self) -> &RouteTable {
        &self.inner.options.routes
    }

    pub fn storage(&self) -> &CacheStorage {
        &self.inner.storage
    }

    pub fn clients(&self) -> &Clients {
        &self.inner.clients
    }

    /// Move from `from` to `to`, or report the state the worker is actually in.
    fn transition(&self, from: WorkerState, to: WorkerState) -> Result<(), Error> {
        let mut actual = from;
        let moved = self.inner.state.send_if_modified(|state| {
            actual = *state;
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        });
        if moved {
            tracing::debug!(version = %self.inner.version, "worker state {:?} -> {:?}", from, to);
            Ok(())
        } else {
            Err(Error::WorkerState(format!("expected {from:?}, worker is {actual:?}")))
        }
    }

    /// Install event: pre-populate both namespaces.
    ///
    /// Settles once both pre-cache steps settle, then requests skip-waiting.
    pub fn install(&self) -> impl Future<Output = Result<InstallReport, Error>> + Send + 'static {
        let worker = self.clone();
        async move {
            worker.transition(WorkerState::Parsed, WorkerState::Installing)?;
            let inner = &worker.inner;

            let options = &inner.options;
            match lifecycle::install(&inner.storage, inner.network.as_ref(), &options.namespaces, &options.assets).await {
                Ok(report) => {
                    inner.skip_waiting.store(true, Ordering::SeqCst);
                    inner.state.send_replace(WorkerState::Installed);
                    Ok(report)
                }
                Err(e) => {
                    tracing::error!(error = %e, "install failed");
                    inner.state.send_replace(WorkerState::Redundant);
                    Err(e)
                }
            }
        }
    }

    /// Activate event: delete stale namespaces, then claim every open client.
    pub fn activate(&self) -> impl Future<Output = Result<ActivateReport, Error>> + Send + 'static {
        let worker = self.clone();
        async move {
            worker.transition(WorkerState::Installed, WorkerState::Activating)?;
            let inner = &worker.inner;

            match lifecycle::activate(&inner.storage, &inner.options.namespaces).await {
                Ok(report) => {
                    let claimed = inner.clients.claim(&inner.version).await;
                    tracing::info!(claimed, version = %inner.version, "activation complete");
                    inner.state.send_replace(WorkerState::Activated);
                    Ok(report)
                }
                Err(e) => {
                    tracing::error!(error = %e, "activate failed");
                    inner.state.send_replace(WorkerState::Redundant);
                    Err(e)
                }
            }
        }
    }

    /// Install then activate, as a host does for a worker that skips waiting.
    pub async fn start(&self) -> Result<(InstallReport, ActivateReport), Error> {
        let installed = self.install().await?;
        let activated = self.activate().await?;
        Ok((installed, activated))
    }

    /// Register a client connection. Clients opened after the claim are
    /// controlled immediately; earlier ones wait for it.
    pub async fn register_client(&self, id: &str) {
        self.inner.clients.register(id).await;
    }

    /// Route a request without performing it.
    pub fn route(&self, request: &Request) -> Route {
        self.inner.options.routes.classify(request)
    }

    /// Fetch event.
    ///
    /// Returns `None` when the request is not intercepted, in which case the
    /// host performs it as if no worker existed.
    pub fn handle_fetch(&self, request: Request) -> Option<impl Future<Output = Intercepted> + Send + 'static> {
        if self.state() != WorkerState::Activated {
            tracing::debug!("not intercepting {}: worker is {:?}", request.url, self.state());
            return None;
        }

        if !request.is_interceptable() {
            return None;
        }

        let route = self.route(&request);
        let Route::Handle { strategy, namespace } = route else {
            tracing::debug!("passing through {}", request.url);
            return None;
        };

        let worker = self.clone();
        Some(async move {
            let Outcome { response, served } = worker.run_strategy(&request, strategy, namespace).await;
            tracing::debug!(
                "{} {} via {} served from {:?} ({})",
                request.method,
                request.url,
                route,
                served,
                response.status
            );
            Intercepted { route, served, response }
        })
    }

    async fn run_strategy(&self, request: &Request, strategy: Strategy, namespace: NamespaceKind) -> Outcome {
        let inner = &self.inner;
        let name = inner.options.namespaces.name(namespace);
        strategy::serve(strategy, &inner.storage, name, request, inner.network.as_ref(), &inner.options.offline).await
    }
}

#[cfg(test)]
mod tests {
    use harbor_core::{MemoryStore, ResponseSnapshot};
    use url::Url;

    use super::*;
    use crate::strategy::testing::ScriptedNetwork;

    fn config() -> AppConfig {
        AppConfig {
            app_origin: "https://app.example.com".into(),
            static_namespace: "static-v2".into(),
            dynamic_namespace: "dynamic-v2".into(),
            static_assets: vec!["/".into(), "/index.html".into()],
            external_assets: vec!["https://cdn.tailwindcss.com/".into()],
            ..Default::default()
        }
    }

    fn network() -> Arc<ScriptedNetwork> {
        Arc::new(
            ScriptedNetwork::new()
                .respond("https://app.example.com/", 200, "root")
                .respond("https://app.example.com/index.html", 200, "index")
                .respond("https://cdn.tailwindcss.com/", 200, "tw")
                .respond("https://esm.sh/react", 200, "react"),
        )
    }

    fn worker(network: Arc<ScriptedNetwork>) -> (ServiceWorker, CacheStorage) {
        let storage = CacheStorage::new(Arc::new(MemoryStore::new()), Vec::new());
        let options = WorkerOptions::from_config(&config()).unwrap();
        (ServiceWorker::new(storage.clone(), network, options), storage)
    }

    fn request(s: &str) -> Request {
        Request::get(Url::parse(s).unwrap())
    }

    #[tokio::test]
    async fn test_lifecycle_transitions() {
        let (worker, _) = worker(network());
        assert_eq!(worker.state(), WorkerState::Parsed);
        assert!(!worker.skip_waiting_requested());

        worker.install().await.unwrap();
        assert_eq!(worker.state(), WorkerState::Installed);
        assert!(worker.skip_waiting_requested());

        worker.activate().await.unwrap();
        assert_eq!(worker.state(), WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_activate_before_install_is_rejected() {
        let (worker, _) = worker(network());
        let result = worker.activate().await;
        assert!(matches!(result, Err(Error::WorkerState(_))));
        assert_eq!(worker.state(), WorkerState::Parsed);
    }

    #[tokio::test]
    async fn test_install_twice_is_rejected() {
        let (worker, _) = worker(network());
        worker.install().await.unwrap();
        assert!(matches!(worker.install().await, Err(Error::WorkerState(_))));
    }

    #[tokio::test]
    async fn test_no_interception_before_activation() {
        let (worker, _) = worker(network());
        assert!(worker.handle_fetch(request("https://app.example.com/")).is_none());
        worker.install().await.unwrap();
        assert!(worker.handle_fetch(request("https://app.example.com/")).is_none());
        worker.activate().await.unwrap();
        assert!(worker.handle_fetch(request("https://app.example.com/")).is_some());
    }

    #[tokio::test]
    async fn test_non_http_not_intercepted() {
        let (worker, _) = worker(network());
        worker.start().await.unwrap();
        assert!(worker.handle_fetch(request("chrome-extension://abc/x.js")).is_none());
    }

    #[tokio::test]
    async fn test_activation_removes_old_version() {
        let (worker, storage) = worker(network());
        let old = storage.open("static-v1").await.unwrap();
        old.put(&request("https://app.example.com/"), &ResponseSnapshot::new(200, "old"))
            .await
            .unwrap();

        let (_, report) = worker.start().await.unwrap();

        assert_eq!(report.deleted, vec!["static-v1"]);
        assert_eq!(storage.keys().await.unwrap(), vec!["dynamic-v2", "static-v2"]);
    }

    #[tokio::test]
    async fn test_claim_controls_existing_clients() {
        let (worker, _) = worker(network());
        worker.register_client("tab-1").await;
        assert_eq!(worker.clients().controller("tab-1").await, None);

        worker.start().await.unwrap();
        assert_eq!(worker.clients().controller("tab-1").await.as_deref(), Some("static-v2+dynamic-v2"));

        worker.register_client("tab-2").await;
        assert_eq!(worker.clients().controller("tab-2").await.as_deref(), Some("static-v2+dynamic-v2"));
        assert_eq!(worker.clients().len().await, 2);
    }

    #[tokio::test]
    async fn test_registration_after_claim_is_controlled() {
        let clients = Clients::new();
        clients.register("early").await;
        assert_eq!(clients.claim("v2").await, 1);

        clients.register("late").await;

        assert_eq!(clients.controller("late").await.as_deref(), Some("v2"));
        assert_eq!(clients.controlled_by("v2").await, 2);
    }

    #[tokio::test]
    async fn test_controlled_count_excludes_unclaimed() {
        let clients = Clients::new();
        clients.register("a").await;
        clients.register("b").await;
        assert_eq!(clients.controlled_by("v1").await, 0);
        assert_eq!(clients.len().await, 2);
    }

    #[tokio::test]
    async fn test_same_origin_served_from_precache_offline() {
        let network = network();
        let (worker, _) = worker(network.clone());
        worker.start().await.unwrap();
        network.go_offline();
        let calls = network.calls();

        let fetched = worker.handle_fetch(request("https://app.example.com/index.html")).unwrap().await;

        assert_eq!(fetched.route, Route::cache_first(NamespaceKind::Static));
        assert_eq!(fetched.served, Served::Cache);
        assert_eq!(&fetched.response.body[..], b"index");
        assert_eq!(network.calls(), calls);
    }

    #[tokio::test]
    async fn test_unknown_same_origin_path_offline_gets_document() {
        let network = network();
        let (worker, _) = worker(network.clone());
        worker.start().await.unwrap();
        network.go_offline();

        let fetched = worker.handle_fetch(request("https://app.example.com/profile")).unwrap().await;

        assert_eq!(fetched.served, Served::Fallback);
        assert_eq!(&fetched.response.body[..], b"index");
    }

    #[tokio::test]
    async fn test_module_cdn_network_first_then_offline_cache() {
        let network = network();
        let (worker, storage) = worker(network.clone());
        worker.start().await.unwrap();

        let live = worker.handle_fetch(request("https://esm.sh/react")).unwrap().await;
        assert_eq!(live.route, Route::network_first(NamespaceKind::Dynamic));
        assert_eq!(live.served, Served::Network);

        let dynamic = storage.open("dynamic-v2").await.unwrap();
        assert!(dynamic.get(&request("https://esm.sh/react")).await.unwrap().is_some());

        network.go_offline();
        let cached = worker.handle_fetch(request("https://esm.sh/react")).unwrap().await;
        assert_eq!(cached.served, Served::Cache);
        assert_eq!(&cached.response.body[..], b"react");
    }

    #[tokio::test]
    async fn test_unknown_third_party_offline_is_empty_503() {
        let network = network();
        let (worker, _) = worker(network.clone());
        worker.start().await.unwrap();
        network.go_offline();

        let fetched = worker.handle_fetch(request("https://api.example.org/items")).unwrap().await;

        assert_eq!(fetched.route, Route::network_first(NamespaceKind::Dynamic));
        assert_eq!(fetched.response.status, 503);
        assert!(fetched.response.body.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_fetches_are_independent() {
        let network = network();
        network.set("https://images.unsplash.com/a", 200, "a");
        network.set("https://images.unsplash.com/b", 200, "b");
        let (worker, _) = worker(network.clone());
        worker.start().await.unwrap();

        let a = worker.handle_fetch(request("https://images.unsplash.com/a")).unwrap();
        let b = worker.handle_fetch(request("https://images.unsplash.com/b")).unwrap();
        let (a, b) = tokio::join!(tokio::spawn(a), tokio::spawn(b));

        assert_eq!(&a.unwrap().response.body[..], b"a");
        assert_eq!(&b.unwrap().response.body[..], b"b");
    }

    #[tokio::test]
    async fn test_state_subscription_sees_activation() {
        let (worker, _) = worker(network());
        let mut rx = worker.subscribe();
        let started = worker.clone();
        let handle = tokio::spawn(async move { started.start().await });
        rx.wait_for(|s| *s == WorkerState::Activated).await.unwrap();
        handle.await.unwrap().unwrap();
    }
}
