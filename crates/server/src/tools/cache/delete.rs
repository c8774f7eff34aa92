//! cache_delete tool implementation.
//!
//! Removes a namespace and every entry in it.

use harbor_core::{CacheStorage, Error};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheDeleteParams {
    /// Namespace to delete.
    pub namespace: String,
}

/// Output from the cache_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheDeleteOutput {
    pub namespace: String,
    /// False when the namespace did not exist.
    pub deleted: bool,
}

/// Implementation of the cache_delete tool.
pub async fn delete_impl(storage: &CacheStorage, params: CacheDeleteParams) -> Result<CallToolResult, McpError> {
    if params.namespace.trim().is_empty() {
        return Err(Error::InvalidInput("namespace cannot be empty".into()).into());
    }

    let deleted = storage.delete(&params.namespace).await?;
    if deleted {
        tracing::info!("deleted namespace {}", params.namespace);
    }

    json_result(&CacheDeleteOutput { namespace: params.namespace, deleted })
}
