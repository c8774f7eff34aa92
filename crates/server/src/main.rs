//! harbor MCP server entry point.
//!
//! Boots the worker (install, then activate) and serves the proxy tools on
//! stdio transport. Logging goes to stderr to avoid interfering with the
//! JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use harbor_client::{FetchClient, FetchConfig, Network, ServiceWorker, WorkerOptions};
use harbor_core::{AppConfig, CacheDb, CacheStorage};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        db = %config.db_path.display(),
        origin = %config.app_origin,
        "starting harbor server on stdio transport"
    );

    let db = CacheDb::open(&config.db_path).await?;
    let storage = CacheStorage::new(Arc::new(db), config.vary_headers.clone());

    let network: Arc<dyn Network> = Arc::new(FetchClient::new(FetchConfig::from_app_config(&config))?);
    let worker = ServiceWorker::new(storage, network.clone(), WorkerOptions::from_config(&config)?);

    let (installed, activated) = worker.start().await?;
    tracing::info!(
        static_cached = installed.static_cached,
        external_cached = installed.external_cached,
        deleted = activated.deleted.len(),
        version = worker.version(),
        "worker activated"
    );

    let handler = handler::HarborServer::new(worker, network);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
