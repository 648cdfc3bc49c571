//! Key-value cache handed to providers
//!
//! Backed by a single bounded `mini_moka` cache shared by the whole host.
//! Each provider sees a scoped view whose keys are prefixed with its id.

use anyhow::Result;
use chrono::{DateTime, Utc};
use mini_moka::sync::Cache;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: serde_json::Value,
    stored_at: DateTime<Utc>,
}

/// TTL cache handle
#[derive(Clone)]
pub struct ProviderCache {
    inner: Arc<Cache<String, CacheEntry>>,
    namespace: String,
}

impl ProviderCache {
    /// Create a root cache; `ttl` bounds the lifetime of every entry
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self {
            inner: Arc::new(inner),
            namespace: String::new(),
        }
    }

    /// View of the same storage scoped to one provider
    pub fn scoped(&self, provider_id: &str) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            namespace: format!("{provider_id}/"),
        }
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }

    /// Store a value
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let entry = CacheEntry {
            value: serde_json::to_value(value)?,
            stored_at: Utc::now(),
        };
        self.inner.insert(self.key(key), entry);
        Ok(())
    }

    /// Fetch a value, treating entries older than `max_age` as absent
    ///
    /// Entries that no longer deserialize as `T` are also treated as absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str, max_age: Option<Duration>) -> Option<T> {
        let entry = self.inner.get(&self.key(key))?;

        if let Some(max_age) = max_age {
            let age = Utc::now()
                .signed_duration_since(entry.stored_at)
                .to_std()
                .unwrap_or_default();
            if age > max_age {
                return None;
            }
        }

        serde_json::from_value(entry.value).ok()
    }

    /// When the entry was stored, if present
    pub fn stored_at(&self, key: &str) -> Option<DateTime<Utc>> {
        self.inner.get(&self.key(key)).map(|entry| entry.stored_at)
    }

    pub fn remove(&self, key: &str) {
        self.inner.invalidate(&self.key(key));
    }
}
