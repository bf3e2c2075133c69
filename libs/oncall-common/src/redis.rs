//! Redis client module with connection pooling
//!
//! Provides a minimal async Redis client with only the commands the
//! alerting core actually uses: plain key/value with TTLs, atomic
//! set-if-absent for leases, and list push/blocking-pop for the queue.

use anyhow::{Context, Result};
use bb8::{Pool, PooledConnection};
use bb8_redis::RedisConnectionManager;
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::Duration;

/// Redis connection pool configuration
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis URL (e.g., "redis://localhost:6379")
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections
    pub min_idle: Option<u32>,
    /// Connection timeout in seconds
    pub connection_timeout: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            max_connections: 20,
            min_idle: Some(2),
            connection_timeout: 5,
        }
    }
}

impl RedisConfig {
    /// Create config from URL with default pool settings
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Redis asynchronous client with connection pooling
pub struct RedisClient {
    pool: Arc<Pool<RedisConnectionManager>>,
    url: String,
}

impl std::fmt::Debug for RedisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisClient")
            .field("url", &self.url)
            .field("pool_state", &self.pool.state())
            .finish()
    }
}

impl RedisClient {
    /// Create a new client with default configuration
    pub async fn new(url: &str) -> Result<Self> {
        Self::with_config(RedisConfig::from_url(url)).await
    }

    /// Create a new client with custom configuration
    pub async fn with_config(config: RedisConfig) -> Result<Self> {
        let manager = RedisConnectionManager::new(config.url.as_str())
            .context("Failed to create Redis connection manager")?;

        let mut pool_builder = Pool::builder()
            .max_size(config.max_connections)
            .connection_timeout(Duration::from_secs(config.connection_timeout));

        if let Some(min_idle) = config.min_idle {
            pool_builder = pool_builder.min_idle(Some(min_idle));
        }

        let pool = pool_builder
            .build(manager)
            .await
            .context("Failed to build Redis connection pool")?;

        let pool = Arc::new(pool);

        // Test the connection
        {
            let mut conn = pool
                .get()
                .await
                .context("Failed to get connection from pool for testing")?;
            let _: String = redis::cmd("PING")
                .query_async(&mut *conn)
                .await
                .context("Failed to ping Redis server")?;
        }

        Ok(Self {
            pool,
            url: config.url,
        })
    }

    /// Get a connection from the pool
    ///
    /// Useful for issuing Redis commands not covered by the client API.
    pub async fn get_connection(&self) -> Result<PooledConnection<'_, RedisConnectionManager>> {
        self.pool
            .get()
            .await
            .context("Failed to get connection from pool")
    }

    /// GET operation
    pub async fn get<T: redis::FromRedisValue>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.get_connection().await?;
        conn.get(key)
            .await
            .with_context(|| format!("Failed to GET key: {}", key))
    }

    /// SET with a TTL in seconds
    pub async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        let mut conn = self.get_connection().await?;
        conn.set_ex(key, value, ttl_seconds)
            .await
            .with_context(|| format!("Failed to SET EX key: {}", key))
    }

    /// SET NX with a TTL: returns true if the key was set (did not exist)
    pub async fn set_nx_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<bool> {
        let mut conn = self.get_connection().await?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut *conn)
            .await
            .with_context(|| format!("Failed to SET NX EX key: {}", key))?;
        Ok(reply.is_some())
    }

    /// DEL operation: returns true if a key was removed
    pub async fn del(&self, key: &str) -> Result<bool> {
        let mut conn = self.get_connection().await?;
        let removed: i32 = conn
            .del(key)
            .await
            .with_context(|| format!("Failed to DEL key: {}", key))?;
        Ok(removed > 0)
    }

    /// EXISTS operation
    pub async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.get_connection().await?;
        conn.exists(key)
            .await
            .with_context(|| format!("Failed to EXISTS key: {}", key))
    }

    /// RPUSH operation - add element to list tail
    pub async fn rpush(&self, key: &str, value: &str) -> Result<u32> {
        let mut conn = self.get_connection().await?;
        conn.rpush(key, value)
            .await
            .with_context(|| format!("Failed to RPUSH to key: {}", key))
    }

    /// BLPOP operation - blocking list pop
    ///
    /// Returns Some((key, value)) or None on timeout. A timeout of 0
    /// blocks indefinitely.
    pub async fn blpop(&self, keys: &[&str], timeout: usize) -> Result<Option<(String, String)>> {
        let mut conn = self.get_connection().await?;
        redis::cmd("BLPOP")
            .arg(keys)
            .arg(timeout)
            .query_async(&mut *conn)
            .await
            .with_context(|| format!("Failed to BLPOP from keys: {:?}", keys))
    }

    /// LLEN operation - list length
    pub async fn llen(&self, key: &str) -> Result<u64> {
        let mut conn = self.get_connection().await?;
        conn.llen(key)
            .await
            .with_context(|| format!("Failed to LLEN key: {}", key))
    }

    /// PING operation - test connection
    pub async fn ping(&self) -> Result<String> {
        let mut conn = self.get_connection().await?;
        redis::cmd("PING")
            .query_async(&mut *conn)
            .await
            .context("Failed to PING Redis server")
    }

    /// Redis URL this client was built with
    pub fn url(&self) -> &str {
        &self.url
    }
}
