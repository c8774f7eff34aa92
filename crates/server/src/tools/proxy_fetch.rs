//! proxy_fetch tool implementation.
//!
//! Sends a request through the worker. Requests the worker does not
//! intercept go straight to the network, as if no proxy existed.

use std::collections::BTreeMap;

use harbor_client::{Network, Served, ServiceWorker, canonicalize};
use harbor_core::{Error, Request};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{ResponseView, json_result};

/// Input parameters for the proxy_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProxyFetchParams {
    /// Absolute URL to request.
    pub url: String,

    /// HTTP method (default: GET). Only GET responses are ever cached.
    #[serde(default = "default_method")]
    pub method: String,

    /// Request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Identifier of the calling client. Registered clients are claimed on activation.
    #[serde(default)]
    pub client_id: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for the proxy_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProxyFetchOutput {
    /// Route the request classified to, e.g. `cache-first+static` or `passthrough`.
    pub route: String,
    /// Whether the worker handled the request.
    pub intercepted: bool,
    /// Where an intercepted response came from: cache, network, fallback or offline.
    #[schemars(with = "Option<String>")]
    pub served: Option<Served>,
    pub response: ResponseView,
}

pub(crate) async fn proxy_fetch(
    worker: &ServiceWorker, network: &dyn Network, params: ProxyFetchParams,
) -> Result<ProxyFetchOutput, Error> {
    let url = canonicalize(&params.url)?;

    let request = params
        .headers
        .into_iter()
        .fold(Request::new(&params.method, url), |req, (name, value)| req.with_header(name, value));

    if let Some(id) = &params.client_id {
        worker.register_client(id).await;
    }

    let route = worker.route(&request);
    let (served, response) = match worker.handle_fetch(request.clone()) {
        Some(intercepted) => {
            let intercepted = intercepted.await;
            (Some(intercepted.served), intercepted.response)
        }
        None => (None, network.fetch(&request).await?),
    };

    Ok(ProxyFetchOutput {
        route: route.to_string(),
        intercepted: served.is_some(),
        served,
        response: ResponseView::from(&response),
    })
}

/// Implementation of the proxy_fetch tool.
pub async fn proxy_fetch_impl(
    worker: &ServiceWorker, network: &dyn Network, params: ProxyFetchParams,
) -> Result<CallToolResult, McpError> {
    let output = proxy_fetch(worker, network, params).await?;
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing;

    fn params(url: &str) -> ProxyFetchParams {
        ProxyFetchParams { url: url.into(), method: default_method(), headers: BTreeMap::new(), client_id: None }
    }

    #[tokio::test]
    async fn test_same_origin_served_from_cache() {
        let network = testing::network();
        let worker = testing::worker(network.clone()).await;
        network.go_offline();

        let output = proxy_fetch(&worker, network.as_ref(), params("https://app.example.com/index.html"))
            .await
            .unwrap();

        assert_eq!(output.route, "cache-first+static");
        assert!(output.intercepted);
        assert_eq!(output.served, Some(Served::Cache));
        assert_eq!(output.response.body, "<html>app</html>");
    }

    #[tokio::test]
    async fn test_offline_navigation_gets_document() {
        let network = testing::network();
        let worker = testing::worker(network.clone()).await;
        network.go_offline();

        let output = proxy_fetch(&worker, network.as_ref(), params("https://app.example.com/settings"))
            .await
            .unwrap();

        assert_eq!(output.served, Some(Served::Fallback));
        assert_eq!(output.response.body, "<html>app</html>");
    }

    #[tokio::test]
    async fn test_module_cdn_network_first() {
        let network = testing::network();
        let worker = testing::worker(network.clone()).await;

        let output = proxy_fetch(&worker, network.as_ref(), params("https://esm.sh/react")).await.unwrap();

        assert_eq!(output.route, "network-first+dynamic");
        assert_eq!(output.served, Some(Served::Network));
    }

    #[tokio::test]
    async fn test_non_http_passes_through_to_network() {
        let network = testing::network();
        let worker = testing::worker(network.clone()).await;

        let result = proxy_fetch(&worker, network.as_ref(), params("ftp://files.example.com/a")).await;

        assert!(matches!(result, Err(Error::FetchFailed(_))));
    }

    #[tokio::test]
    async fn test_client_id_registered_and_controlled() {
        let network = testing::network();
        let worker = testing::worker(network.clone()).await;
        let mut p = params("https://esm.sh/react");
        p.client_id = Some("tab-1".into());

        proxy_fetch(&worker, network.as_ref(), p).await.unwrap();

        assert_eq!(worker.clients().controller("tab-1").await.as_deref(), Some(worker.version()));
    }

    #[tokio::test]
    async fn test_rejects_bad_url() {
        let network = testing::network();
        let worker = testing::worker(network.clone()).await;

        assert!(matches!(
            proxy_fetch(&worker, network.as_ref(), params("")).await,
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            proxy_fetch(&worker, network.as_ref(), params("not a url")).await,
            Err(Error::InvalidUrl(_))
        ));
    }
}
