//! In-memory cache backend.
//!
//! Used for tests and for runs that should leave nothing on disk.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{CacheStore, StoredEntry};
use crate::Error;

type Namespaces = BTreeMap<String, BTreeMap<String, StoredEntry>>;

#[derive(Debug, Default)]
pub struct MemoryStore {
    namespaces: RwLock<Namespaces>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn create_namespace(&self, namespace: &str) -> Result<(), Error> {
        let mut namespaces = self.namespaces.write().await;
        namespaces.entry(namespace.to_string()).or_default();
        Ok(())
    }

    async fn list_namespaces(&self) -> Result<Vec<String>, Error> {
        Ok(self.namespaces.read().await.keys().cloned().collect())
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<bool, Error> {
        Ok(self.namespaces.write().await.remove(namespace).is_some())
    }

    async fn match_entry(&self, namespace: &str, key: &str) -> Result<Option<StoredEntry>, Error> {
        let namespaces = self.namespaces.read().await;
        Ok(namespaces.get(namespace).and_then(|entries| entries.get(key)).cloned())
    }

    async fn put_entry(&self, namespace: &str, entry: StoredEntry) -> Result<(), Error> {
        let mut namespaces = self.namespaces.write().await;
        namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(entry.key.clone(), entry);
        Ok(())
    }

    async fn put_all(&self, namespace: &str, entries: Vec<StoredEntry>) -> Result<(), Error> {
        // A single write guard makes the batch atomic for readers.
        let mut namespaces = self.namespaces.write().await;
        let target = namespaces.entry(namespace.to_string()).or_default();
        for entry in entries {
            target.insert(entry.key.clone(), entry);
        }
        Ok(())
    }

    async fn count_entries(&self, namespace: &str) -> Result<u64, Error> {
        let namespaces = self.namespaces.read().await;
        Ok(namespaces.get(namespace).map_or(0, |entries| entries.len() as u64))
    }
}
