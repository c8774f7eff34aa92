//! Namespaced cache of response snapshots.
//!
//! This module provides the store abstraction and its backends:
//!
//! - [`CacheStore`] trait with SQLite ([`CacheDb`]) and in-memory ([`MemoryStore`]) implementations
//! - Request identity hashing (method + canonical URL + vary headers)
//! - Automatic schema migrations and WAL mode for the SQLite backend
//! - Wholesale namespace deletion, the only eviction mechanism

pub mod connection;
pub mod entries;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use memory::MemoryStore;
pub use store::{CacheStorage, CacheStore, NamespaceHandle, StoredEntry};
