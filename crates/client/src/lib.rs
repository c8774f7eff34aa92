//! Client code for harbor.
//!
//! This crate provides the network seam, the retrieval strategies, the
//! install/activate lifecycle and the service worker that wires them to
//! host events. It is shared by the MCP server and the CLI.

pub mod fetch;
pub mod lifecycle;
pub mod strategy;
pub mod worker;

pub use fetch::{FetchClient, FetchConfig, FetchError, Network, canonicalize};
pub use lifecycle::{ActivateReport, InstallAssets, InstallReport, activate, install};
pub use strategy::{OfflineFallback, Outcome, Served, cache_first, network_first, serve};
pub use worker::{Clients, Intercepted, ServiceWorker, WorkerOptions, WorkerState};
