//! Core types and shared functionality for harbor.
//!
//! This crate provides:
//! - Namespaced cache store with SQLite and in-memory backends
//! - Request/response data model and request identity
//! - Routing rule table
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod message;
pub mod routing;

pub use cache::{CacheDb, CacheStorage, CacheStore, MemoryStore, NamespaceHandle};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use message::{Request, ResponseSnapshot};
pub use routing::{NamespaceKind, Namespaces, Route, RouteTable, Strategy};
