//! worker_status tool implementation.

use harbor_client::{ServiceWorker, WorkerState};
use harbor_core::Namespaces;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Output from the worker_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerStatusOutput {
    pub version: String,
    #[schemars(with = "String")]
    pub state: WorkerState,
    pub static_namespace: String,
    pub dynamic_namespace: String,
    /// Whether install asked to take over without waiting.
    pub skip_waiting: bool,
    /// Number of clients that have fetched through the worker.
    pub clients: usize,
    /// Number of those clients this worker version controls.
    pub controlled_clients: usize,
}

pub(crate) async fn status(worker: &ServiceWorker) -> WorkerStatusOutput {
    let Namespaces { static_ns, dynamic_ns } = worker.namespaces().clone();
    WorkerStatusOutput {
        version: worker.version().to_string(),
        state: worker.state(),
        static_namespace: static_ns,
        dynamic_namespace: dynamic_ns,
        skip_waiting: worker.skip_waiting_requested(),
        clients: worker.clients().len().await,
        controlled_clients: worker.clients().controlled_by(worker.version()).await,
    }
}

/// Implementation of the worker_status tool.
pub async fn worker_status_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    json_result(&status(worker).await)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use harbor_client::WorkerOptions;
    use harbor_core::{CacheStorage, MemoryStore};

    use super::*;
    use crate::tools::testing;

    #[tokio::test]
    async fn test_status_after_start() {
        let worker = testing::worker(testing::network()).await;
        worker.register_client("tab-1").await;

        let output = status(&worker).await;

        assert_eq!(output.state, WorkerState::Activated);
        assert_eq!(output.version, "static-v1+dynamic-v1");
        assert!(output.skip_waiting);
        assert_eq!(output.clients, 1);
        assert_eq!(output.controlled_clients, 1);
        assert!(worker_status_impl(&worker).await.is_ok());
    }

    #[tokio::test]
    async fn test_clients_seen_before_activation_are_not_controlled() {
        let storage = CacheStorage::new(Arc::new(MemoryStore::new()), Vec::new());
        let options = WorkerOptions::from_config(&testing::config()).unwrap();
        let worker = ServiceWorker::new(storage, testing::network(), options);
        worker.register_client("tab-1").await;
        worker.register_client("tab-2").await;

        let output = status(&worker).await;

        assert_eq!(output.state, WorkerState::Parsed);
        assert_eq!(output.clients, 2);
        assert_eq!(output.controlled_clients, 0);
    }
}
