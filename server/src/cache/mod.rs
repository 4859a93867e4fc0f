//! Key-value cache for normalized weather records.
//!
//! [`CacheStore`] is fail-open: implementations absorb their own connectivity
//! errors, so reads degrade to a miss and writes to a no-op. Callers only ever
//! see presence or absence.

pub mod keys;
mod memory_cache;
mod redis_cache;

pub use keys::CacheKey;
pub use memory_cache::MemoryCacheStore;
pub use redis_cache::RedisCacheStore;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::{CacheBackend, Config};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),
    #[error("Redis command failed: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("Redis operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("Invalid cache configuration: {0}")]
    Configuration(String),
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Raw stored text, or `None` when absent, expired or unreachable.
    async fn get_raw(&self, key: &str) -> Option<String>;

    /// Store `value` for `ttl`, or for the store's default TTL when `None`.
    /// Returns whether the write happened.
    async fn set_raw(&self, key: &str, value: &str, ttl: Option<Duration>) -> bool;

    /// Number of keys removed (0 or 1).
    async fn delete(&self, key: &str) -> u64;

    async fn exists(&self, key: &str) -> bool;

    /// Every key containing `pattern` (matched as `*{pattern}*`), in no
    /// particular order. Empty when the store is unreachable.
    async fn matching_keys(&self, pattern: &str) -> Vec<String>;

    /// Remove every key containing `pattern` (matched as `*{pattern}*`).
    /// Returns the number of keys removed.
    async fn clear_on_pattern(&self, pattern: &str) -> u64;

    /// Clear the active logical database.
    async fn flush_db(&self);

    /// Clear every database without waiting for completion.
    async fn flush_all(&self);

    /// Whether the store currently answers.
    async fn ping(&self) -> bool;
}

/// Typed JSON helpers on top of any [`CacheStore`].
#[async_trait]
pub trait CacheExt: CacheStore {
    async fn get_json<T: DeserializeOwned + Send>(&self, key: &str) -> Option<T> {
        let raw = self.get_raw(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Discarding undecodable cache entry '{}': {}", key, e);
                None
            }
        }
    }

    async fn set_json<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> bool {
        match serde_json::to_string(value) {
            Ok(json) => self.set_raw(key, &json, ttl).await,
            Err(e) => {
                tracing::warn!("Failed to serialize cache entry '{}': {}", key, e);
                false
            }
        }
    }
}

impl<T: CacheStore + ?Sized> CacheExt for T {}

/// Wildcard-wrap a substring for a pattern sweep.
pub(crate) fn wrap_pattern(pattern: &str) -> String {
    format!("*{}*", pattern)
}

/// Construct the store selected by configuration.
pub fn build_store(config: &Config) -> Result<Arc<dyn CacheStore>, CacheError> {
    match config.cache_backend {
        CacheBackend::Redis => {
            tracing::info!("Using Redis cache at {}", config.redis_url());
            Ok(Arc::new(RedisCacheStore::from_config(config)?))
        }
        CacheBackend::Memory => {
            tracing::info!("Using in-memory cache");
            Ok(Arc::new(MemoryCacheStore::new(config.default_ttl())))
        }
    }
}
