//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.

use std::sync::Arc;

use harbor_client::{Network, ServiceWorker};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

use crate::tools::cache::{CacheDeleteParams, CacheMatchParams, delete_impl, match_impl, namespaces_impl};
use crate::tools::{ProxyFetchParams, proxy_fetch_impl, worker_status_impl};

/// The main MCP server handler for harbor.
#[derive(Clone)]
pub struct HarborServer {
    worker: ServiceWorker,
    /// Used directly for requests the worker does not intercept.
    network: Arc<dyn Network>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl HarborServer {
    /// Create a new server handler around a started worker.
    pub fn new(worker: ServiceWorker, network: Arc<dyn Network>) -> Self {
        Self { worker, network, tool_router: Self::tool_router() }
    }

    /// Fetch a URL through the offline-caching proxy.
    #[tool(
        description = "Fetch a URL through the offline cache. Same-origin and known asset hosts are served cache-first, module CDN and other hosts network-first. Returns status, headers, body and where the response came from."
    )]
    async fn proxy_fetch(&self, params: Parameters<ProxyFetchParams>) -> Result<CallToolResult, McpError> {
        proxy_fetch_impl(&self.worker, self.network.as_ref(), params.0).await
    }

    /// Look up a stored response.
    #[tool(description = "Return the stored response for a URL in a cache namespace, or CACHE_MISS.")]
    async fn cache_match(&self, params: Parameters<CacheMatchParams>) -> Result<CallToolResult, McpError> {
        match_impl(self.worker.storage(), params.0).await
    }

    #[tool(description = "List cache namespaces with entry counts and whether each is current.")]
    async fn cache_namespaces(&self) -> Result<CallToolResult, McpError> {
        namespaces_impl(self.worker.storage(), self.worker.namespaces()).await
    }

    #[tool(description = "Delete a cache namespace and all of its entries.")]
    async fn cache_delete(&self, params: Parameters<CacheDeleteParams>) -> Result<CallToolResult, McpError> {
        delete_impl(self.worker.storage(), params.0).await
    }

    #[tool(description = "Report the worker lifecycle state, version, namespaces and client count.")]
    async fn worker_status(&self) -> Result<CallToolResult, McpError> {
        worker_status_impl(&self.worker).await
    }
}

impl ServerHandler for HarborServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "harbor".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Offline-caching proxy. Use proxy_fetch to request URLs; inspect the store with cache_namespaces and cache_match."
                    .into(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
