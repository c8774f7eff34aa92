//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting and pruning the namespaced store.

pub mod delete;
pub mod lookup;
pub mod namespaces;

pub use delete::{CacheDeleteParams, delete_impl};
pub use lookup::{CacheMatchParams, match_impl};
pub use namespaces::namespaces_impl;
