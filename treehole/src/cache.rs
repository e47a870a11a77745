// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key-value cache for aggregated views.
//!
//! The cache is never the source of truth: failing to write to it must not fail the operation
//! which triggered the write, callers log the error and carry on.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Interface of the external key-value cache.
pub trait Cache: Clone + Send + Sync + 'static {
    /// Stores a value under the key.
    ///
    /// A `ttl` of zero keeps the value until it gets overwritten, otherwise it expires after the
    /// given duration.
    fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), CacheError>> + Send;

    /// Returns the value stored under the key if it did not expire yet.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>, CacheError>> + Send;
}

/// Serializes a value as JSON and stores it in the cache.
pub async fn set_json<C, T>(cache: &C, key: &str, value: &T, ttl: Duration) -> Result<(), CacheError>
where
    C: Cache,
    T: Serialize,
{
    let bytes = serde_json::to_vec(value).map_err(CacheError::Encode)?;
    cache.set(key, bytes, ttl).await
}

/// Reads a JSON value from the cache.
pub async fn get_json<C, T>(cache: &C, key: &str) -> Result<Option<T>, CacheError>
where
    C: Cache,
    T: DeserializeOwned,
{
    match cache.get(key).await? {
        Some(bytes) => Ok(Some(
            serde_json::from_slice(&bytes).map_err(CacheError::Decode)?,
        )),
        None => Ok(None),
    }
}

#[derive(Debug)]
struct CacheEntry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// In-process cache, used when no external cache is deployed and in tests.
#[derive(Clone, Debug, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes all expired entries and returns how many were removed.
    pub async fn remove_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }
}

impl Cache for MemoryCache {
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = (!ttl.is_zero()).then(|| Instant::now() + ttl);
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), CacheEntry { value, expires_at });
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| !entry.is_expired(Instant::now()))
            .map(|entry| entry.value.clone()))
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("could not encode cache value: {0}")]
    Encode(serde_json::Error),

    #[error("could not decode cache value: {0}")]
    Decode(serde_json::Error),

    /// The cache backend could not be reached.
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{Cache, MemoryCache, get_json, set_json};

    #[tokio::test]
    async fn set_and_get() {
        let cache = MemoryCache::new();

        cache.set("a", b"1".to_vec(), Duration::ZERO).await.unwrap();
        assert_eq!(cache.get("a").await.unwrap(), Some(b"1".to_vec()));
        assert_eq!(cache.get("b").await.unwrap(), None);

        // Overwrites replace the previous value.
        cache.set("a", b"2".to_vec(), Duration::ZERO).await.unwrap();
        assert_eq!(cache.get("a").await.unwrap(), Some(b"2".to_vec()));
    }

    #[tokio::test]
    async fn entries_expire() {
        let cache = MemoryCache::new();

        cache
            .set("short", b"x".to_vec(), Duration::from_millis(10))
            .await
            .unwrap();
        cache.set("forever", b"y".to_vec(), Duration::ZERO).await.unwrap();
        assert!(cache.get("short").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(cache.get("short").await.unwrap(), None);
        assert!(cache.get("forever").await.unwrap().is_some());
        assert_eq!(cache.remove_expired().await, 1);
    }

    #[tokio::test]
    async fn json_values() {
        let cache = MemoryCache::new();

        set_json(&cache, "numbers", &vec![1, 2, 3], Duration::ZERO)
            .await
            .unwrap();
        let numbers: Option<Vec<u32>> = get_json(&cache, "numbers").await.unwrap();
        assert_eq!(numbers, Some(vec![1, 2, 3]));

        cache.set("broken", b"{".to_vec(), Duration::ZERO).await.unwrap();
        assert!(get_json::<_, Vec<u32>>(&cache, "broken").await.is_err());
    }
}
