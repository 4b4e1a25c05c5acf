use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;

use crate::http::Response;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("invalid cache name '{0}'")]
    InvalidName(String),
    #[error("cache storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache entry corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("cache entry has invalid url: {0}")]
    Url(#[from] url::ParseError),
}

/// Named cache generations, each mapping a request identity to a stored response.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Names of every generation currently stored.
    async fn keys(&self) -> Result<Vec<String>, CacheError>;
    async fn has(&self, cache: &str) -> Result<bool, CacheError>;
    /// Returns whether the generation existed.
    async fn delete(&self, cache: &str) -> Result<bool, CacheError>;
    async fn lookup(&self, cache: &str, key: &str) -> Result<Option<Response>, CacheError>;
    /// Stores a response, creating the generation when missing.
    async fn put(&self, cache: &str, key: &str, response: &Response) -> Result<(), CacheError>;
    /// Request identities stored in a generation.
    async fn entries(&self, cache: &str) -> Result<Vec<String>, CacheError>;

    async fn put_all(&self, cache: &str, entries: &[(String, Response)]) -> Result<(), CacheError> {
        for (key, response) in entries {
            self.put(cache, key, response).await?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    caches: Mutex<BTreeMap<String, BTreeMap<String, Response>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.caches.lock().keys().cloned().collect())
    }

    async fn has(&self, cache: &str) -> Result<bool, CacheError> {
        Ok(self.caches.lock().contains_key(cache))
    }

    async fn delete(&self, cache: &str) -> Result<bool, CacheError> {
        Ok(self.caches.lock().remove(cache).is_some())
    }

    async fn lookup(&self, cache: &str, key: &str) -> Result<Option<Response>, CacheError> {
        Ok(self
            .caches
            .lock()
            .get(cache)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    async fn put(&self, cache: &str, key: &str, response: &Response) -> Result<(), CacheError> {
        self.caches
            .lock()
            .entry(cache.to_string())
            .or_default()
            .insert(key.to_string(), response.clone());
        Ok(())
    }

    async fn entries(&self, cache: &str) -> Result<Vec<String>, CacheError> {
        Ok(self
            .caches
            .lock()
            .get(cache)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn put_all(&self, cache: &str, entries: &[(String, Response)]) -> Result<(), CacheError> {
        let mut caches = self.caches.lock();
        let generation = caches.entry(cache.to_string()).or_default();
        for (key, response) in entries {
            generation.insert(key.clone(), response.clone());
        }
        Ok(())
    }
}
