//! cache_match tool implementation.
//!
//! Looks up the stored snapshot for a request in one namespace.

use harbor_client::canonicalize;
use harbor_core::{CacheStorage, Error, Request};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::{ResponseView, json_result};

/// Parameters for the cache_match tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheMatchParams {
    /// Namespace to search.
    pub namespace: String,

    /// Request URL.
    pub url: String,

    /// Request method (default: GET).
    #[serde(default)]
    pub method: Option<String>,
}

/// Output from the cache_match tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheMatchOutput {
    pub namespace: String,
    /// Request identity the entry is stored under.
    pub key: String,
    pub response: ResponseView,
}

pub(crate) async fn lookup(storage: &CacheStorage, params: CacheMatchParams) -> Result<CacheMatchOutput, Error> {
    let url = canonicalize(&params.url)?;
    let request = Request::new(params.method.as_deref().unwrap_or("GET"), url);
    let key = storage.key_for(&request);

    if !storage.has(&params.namespace).await? {
        return Err(Error::CacheMiss(format!("no namespace named {}", params.namespace)));
    }

    let cache = storage.open(&params.namespace).await?;
    let response = cache
        .get(&request)
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{} {} in {}", request.method, request.url, params.namespace)))?;

    Ok(CacheMatchOutput { namespace: params.namespace, key, response: ResponseView::from(&response) })
}

/// Implementation of the cache_match tool.
pub async fn match_impl(storage: &CacheStorage, params: CacheMatchParams) -> Result<CallToolResult, McpError> {
    let output = lookup(storage, params).await?;
    json_result(&output)
}
