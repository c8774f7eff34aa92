//! Namespaced cache store abstraction.
//!
//! [`CacheStore`] is the seam every backend implements. [`CacheStorage`] is
//! the handle components receive: it pairs a backend with the request
//! identity rules and hands out [`NamespaceHandle`]s.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::hash::request_key;
use crate::{Error, Request, ResponseSnapshot};

/// One stored (request identity, response snapshot) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    /// Request identity hash.
    pub key: String,
    pub method: String,
    pub url: String,
    pub response: ResponseSnapshot,
}

/// Backend for a namespaced key-value store of response snapshots.
///
/// Missing keys and namespaces are never errors: lookups return `Ok(None)`
/// and deleting an absent namespace returns `Ok(false)`.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Create the namespace if it does not exist yet.
    async fn create_namespace(&self, namespace: &str) -> Result<(), Error>;

    /// All namespaces currently present, sorted by name.
    async fn list_namespaces(&self) -> Result<Vec<String>, Error>;

    /// Delete a namespace and every entry inside it.
    async fn delete_namespace(&self, namespace: &str) -> Result<bool, Error>;

    /// Look up an entry by identity key.
    async fn match_entry(&self, namespace: &str, key: &str) -> Result<Option<StoredEntry>, Error>;

    /// Insert or overwrite a single entry. Creates the namespace on demand.
    async fn put_entry(&self, namespace: &str, entry: StoredEntry) -> Result<(), Error>;

    /// Insert or overwrite a batch of entries; either all are written or none.
    async fn put_all(&self, namespace: &str, entries: Vec<StoredEntry>) -> Result<(), Error>;

    /// Number of entries held in the namespace.
    async fn count_entries(&self, namespace: &str) -> Result<u64, Error>;
}

/// Shared handle to a cache backend plus the identity rules.
#[derive(Clone)]
pub struct CacheStorage {
    backend: Arc<dyn CacheStore>,
    vary_headers: Arc<[String]>,
}

impl fmt::Debug for CacheStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStorage")
            .field("vary_headers", &self.vary_headers)
            .finish_non_exhaustive()
    }
}

impl CacheStorage {
    pub fn new(backend: Arc<dyn CacheStore>, vary_headers: Vec<String>) -> Self {
        Self { backend, vary_headers: vary_headers.into() }
    }

    /// Open (and implicitly create) a namespace.
    pub async fn open(&self, namespace: &str) -> Result<NamespaceHandle, Error> {
        self.backend.create_namespace(namespace).await?;
        Ok(NamespaceHandle { name: namespace.to_string(), storage: self.clone() })
    }

    /// All namespaces currently present.
    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        self.backend.list_namespaces().await
    }

    /// Delete a namespace wholesale. Returns whether it existed.
    pub async fn delete(&self, namespace: &str) -> Result<bool, Error> {
        self.backend.delete_namespace(namespace).await
    }

    /// Whether a namespace exists.
    pub async fn has(&self, namespace: &str) -> Result<bool, Error> {
        Ok(self.keys().await?.iter().any(|n| n == namespace))
    }

    /// Identity key of a request under this storage's rules.
    pub fn key_for(&self, request: &Request) -> String {
        request_key(request, &self.vary_headers)
    }

    pub fn backend(&self) -> &Arc<dyn CacheStore> {
        &self.backend
    }
}

/// An opened namespace.
#[derive(Debug, Clone)]
pub struct NamespaceHandle {
    name: String,
    storage: CacheStorage,
}

impl NamespaceHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn entry(&self, request: &Request, response: &ResponseSnapshot) -> StoredEntry {
        StoredEntry {
            key: self.storage.key_for(request),
            method: request.method.clone(),
            url: request.url.to_string(),
            response: response.clone(),
        }
    }

    /// Look up the snapshot stored for a request.
    pub async fn get(&self, request: &Request) -> Result<Option<ResponseSnapshot>, Error> {
        let key = self.storage.key_for(request);
        let entry = self.storage.backend.match_entry(&self.name, &key).await?;
        Ok(entry.map(|e| e.response))
    }

    /// Store a copy of the response under the request's identity.
    pub async fn put(&self, request: &Request, response: &ResponseSnapshot) -> Result<(), Error> {
        let entry = self.entry(request, response);
        self.storage.backend.put_entry(&self.name, entry).await
    }

    /// Store a batch atomically.
    pub async fn put_all(&self, pairs: &[(Request, ResponseSnapshot)]) -> Result<(), Error> {
        let entries = pairs.iter().map(|(req, res)| self.entry(req, res)).collect();
        self.storage.backend.put_all(&self.name, entries).await
    }

    /// Number of stored entries.
    pub async fn len(&self) -> Result<u64, Error> {
        self.storage.backend.count_entries(&self.name).await
    }

    pub async fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len().await? == 0)
    }
}
