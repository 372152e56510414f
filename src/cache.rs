// src/cache.rs

//! Key-value memo of expensive query results.
//!
//! The cache never owns canonical data; everything in it can be rebuilt
//! from the report store. Entries have no TTL and are dropped only by the
//! explicit invalidation calls on the write paths that make them stale.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::Result;

/// Cache key builders.
///
/// Three entries are in use: the global URL list, the global median
/// snapshot, and one report list per URL partition.
pub mod keys {
    /// Global sorted list of all saved URLs.
    pub const ALL_URLS: &str = "urls";

    /// Global pooled median snapshot across all URLs.
    pub const MEDIANS: &str = "medians";

    /// Report list for one URL partition.
    pub fn report_list(site_id: &str) -> String {
        format!("reports:{site_id}")
    }
}

/// Trait for cache backends.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up a value, `None` on miss.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store a value under a key, overwriting any previous entry.
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Drop a key. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Process-wide in-memory cache backend.
#[derive(Clone, Default)]
pub struct InMemoryCache {
    entries: Arc<RwLock<HashMap<String, Value>>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
