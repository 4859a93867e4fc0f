//! Redis-backed cache store.

use super::{wrap_pattern, CacheError, CacheStore};
use crate::config::Config;
use async_trait::async_trait;
use deadpool_redis::{Config as PoolConfig, Connection, Pool, Runtime};
use redis::AsyncCommands;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Keys fetched per `SCAN` round trip during pattern sweeps.
const SCAN_BATCH_SIZE: usize = 100;

pub struct RedisCacheStore {
    pool: Pool,
    default_ttl: Duration,
    op_timeout: Duration,
}

impl RedisCacheStore {
    /// Build the pool. No connection is opened until the first command.
    pub fn from_config(config: &Config) -> Result<Self, CacheError> {
        let op_timeout = config.redis_socket_timeout();

        let pool = PoolConfig::from_url(config.redis_url())
            .builder()
            .map_err(|e| CacheError::Configuration(format!("Invalid Redis config: {}", e)))?
            .max_size(config.redis_pool_max_size)
            .wait_timeout(Some(op_timeout))
            .create_timeout(Some(op_timeout))
            .recycle_timeout(Some(op_timeout))
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| CacheError::Configuration(format!("Failed to create pool: {}", e)))?;

        info!(
            "Redis cache pool ready (max {} connections, {}s timeout)",
            config.redis_pool_max_size,
            op_timeout.as_secs()
        );

        Ok(Self {
            pool,
            default_ttl: config.default_ttl(),
            op_timeout,
        })
    }

    async fn get_conn(&self) -> Result<Connection, CacheError> {
        Ok(self.pool.get().await?)
    }

    /// Bound a whole operation, checkout included, by the socket timeout.
    async fn bounded<T, F>(&self, operation: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        tokio::time::timeout(self.op_timeout, operation)
            .await
            .map_err(|_| CacheError::Timeout(self.op_timeout))?
    }

    async fn try_get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.bounded(async {
            let mut conn = self.get_conn().await?;
            let value: Option<String> = conn.get(key).await?;
            Ok::<_, CacheError>(value)
        })
        .await
    }

    async fn try_set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let ttl_secs = ttl.as_secs().max(1);
        self.bounded(async {
            let mut conn = self.get_conn().await?;
            let _: () = conn.set_ex(key, value, ttl_secs).await?;
            Ok::<_, CacheError>(())
        })
        .await
    }

    async fn try_delete(&self, key: &str) -> Result<u64, CacheError> {
        self.bounded(async {
            let mut conn = self.get_conn().await?;
            let deleted: u64 = conn.del(key).await?;
            Ok::<_, CacheError>(deleted)
        })
        .await
    }

    async fn try_exists(&self, key: &str) -> Result<bool, CacheError> {
        self.bounded(async {
            let mut conn = self.get_conn().await?;
            let exists: bool = conn.exists(key).await?;
            Ok::<_, CacheError>(exists)
        })
        .await
    }

    /// One `SCAN` round trip: the next cursor and the keys it returned.
    async fn scan_step(
        &self,
        conn: &mut Connection,
        cursor: u64,
        pattern: &str,
    ) -> Result<(u64, Vec<String>), CacheError> {
        self.bounded(async {
            Ok::<_, CacheError>(
                redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(pattern)
                    .arg("COUNT")
                    .arg(SCAN_BATCH_SIZE)
                    .query_async(&mut **conn)
                    .await?,
            )
        })
        .await
    }

    async fn try_matching_keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.bounded(self.get_conn()).await?;
        let mut cursor: u64 = 0;
        let mut matching = Vec::new();

        loop {
            let (next_cursor, keys) = self.scan_step(&mut conn, cursor, pattern).await?;
            matching.extend(keys);

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        // SCAN may return a key more than once
        matching.sort();
        matching.dedup();
        Ok(matching)
    }

    /// Walk the keyspace with `SCAN`, unlinking each batch as it arrives.
    /// Each round trip is bounded separately so large keyspaces can finish.
    async fn try_clear_on_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let mut conn = self.bounded(self.get_conn()).await?;
        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;

        loop {
            let (next_cursor, keys) = self.scan_step(&mut conn, cursor, pattern).await?;

            if !keys.is_empty() {
                let unlinked: u64 = self
                    .bounded(async {
                        Ok::<_, CacheError>(
                            redis::cmd("UNLINK").arg(&keys).query_async(&mut *conn).await?,
                        )
                    })
                    .await?;
                removed += unlinked;
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        Ok(removed)
    }

    async fn try_flush(&self, command: &'static str, asynchronous: bool) -> Result<(), CacheError> {
        self.bounded(async {
            let mut conn = self.get_conn().await?;
            let mut cmd = redis::cmd(command);
            if asynchronous {
                cmd.arg("ASYNC");
            }
            let _: () = cmd.query_async(&mut *conn).await?;
            Ok::<_, CacheError>(())
        })
        .await
    }

    async fn try_ping(&self) -> Result<(), CacheError> {
        self.bounded(async {
            let mut conn = self.get_conn().await?;
            let _: String = redis::cmd("PING").query_async(&mut *conn).await?;
            Ok::<_, CacheError>(())
        })
        .await
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get_raw(&self, key: &str) -> Option<String> {
        match self.try_get(key).await {
            Ok(Some(value)) => {
                debug!("Cache hit for key '{}'", key);
                Some(value)
            }
            Ok(None) => {
                debug!("Cache miss for key '{}'", key);
                None
            }
            Err(e) => {
                warn!("Cache read for '{}' degraded to a miss: {}", key, e);
                None
            }
        }
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Option<Duration>) -> bool {
        let ttl = ttl.unwrap_or(self.default_ttl);
        match self.try_set(key, value, ttl).await {
            Ok(()) => {
                info!("Cached key '{}' with TTL {}s", key, ttl.as_secs().max(1));
                true
            }
            Err(e) => {
                warn!("Cache write for '{}' skipped: {}", key, e);
                false
            }
        }
    }

    async fn delete(&self, key: &str) -> u64 {
        self.try_delete(key).await.unwrap_or_else(|e| {
            warn!("Cache delete for '{}' skipped: {}", key, e);
            0
        })
    }

    async fn exists(&self, key: &str) -> bool {
        self.try_exists(key).await.unwrap_or_else(|e| {
            warn!("Cache exists check for '{}' degraded to false: {}", key, e);
            false
        })
    }

    async fn matching_keys(&self, pattern: &str) -> Vec<String> {
        let pattern = wrap_pattern(pattern);
        self.try_matching_keys(&pattern).await.unwrap_or_else(|e| {
            warn!("Cache key listing for '{}' degraded to empty: {}", pattern, e);
            Vec::new()
        })
    }

    async fn clear_on_pattern(&self, pattern: &str) -> u64 {
        let pattern = wrap_pattern(pattern);
        match self.try_clear_on_pattern(&pattern).await {
            Ok(removed) => {
                info!("Cleared {} cache keys matching '{}'", removed, pattern);
                removed
            }
            Err(e) => {
                warn!("Cache sweep for '{}' aborted: {}", pattern, e);
                0
            }
        }
    }

    async fn flush_db(&self) {
        match self.try_flush("FLUSHDB", false).await {
            Ok(()) => info!("Flushed current cache database"),
            Err(e) => warn!("Cache flush skipped: {}", e),
        }
    }

    async fn flush_all(&self) {
        match self.try_flush("FLUSHALL", true).await {
            Ok(()) => info!("Requested flush of all cache databases"),
            Err(e) => warn!("Cache flush-all skipped: {}", e),
        }
    }

    async fn ping(&self) -> bool {
        match self.try_ping().await {
            Ok(()) => true,
            Err(e) => {
                debug!("Cache ping failed: {}", e);
                false
            }
        }
    }
}
