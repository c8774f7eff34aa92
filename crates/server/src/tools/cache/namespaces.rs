//! cache_namespaces tool implementation.
//!
//! Lists every namespace in the store with its entry count.

use harbor_core::{CacheStorage, Error, Namespaces};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NamespaceInfo {
    pub name: String,
    pub entries: u64,
    /// Whether this is one of the worker's two current namespaces.
    pub current: bool,
}

/// Output from the cache_namespaces tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheNamespacesOutput {
    pub namespaces: Vec<NamespaceInfo>,
}

pub(crate) async fn list(storage: &CacheStorage, current: &Namespaces) -> Result<CacheNamespacesOutput, Error> {
    let mut namespaces = Vec::new();
    for name in storage.keys().await? {
        let entries = storage.backend().count_entries(&name).await?;
        let current = current.is_current(&name);
        namespaces.push(NamespaceInfo { name, entries, current });
    }
    Ok(CacheNamespacesOutput { namespaces })
}

/// Implementation of the cache_namespaces tool.
pub async fn namespaces_impl(storage: &CacheStorage, current: &Namespaces) -> Result<CallToolResult, McpError> {
    let output = list(storage, current).await?;
    json_result(&output)
}
