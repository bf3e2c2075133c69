//! Redis implementation of the transient store

use anyhow::Result;
use async_trait::async_trait;
use oncall_common::RedisClient;
use std::sync::Arc;
use std::time::Duration;

use super::TransientStore;

/// Redis-backed transient store
pub struct RedisTransientStore {
    client: Arc<RedisClient>,
}

impl RedisTransientStore {
    /// Create a new store from an URL
    pub async fn new(url: &str) -> Result<Self> {
        Ok(Self {
            client: Arc::new(RedisClient::new(url).await?),
        })
    }

    /// Create from an existing client
    pub fn from_client(client: Arc<RedisClient>) -> Self {
        Self { client }
    }

    /// Reference to the underlying Redis client
    pub fn client(&self) -> &Arc<RedisClient> {
        &self.client
    }
}

/// TTLs are rounded up to whole seconds, the Redis granularity.
fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl TransientStore for RedisTransientStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.client.get(key).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.client.set_ex(key, value, ttl_seconds(ttl)).await
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        self.client.set_nx_ex(key, value, ttl_seconds(ttl)).await
    }

    async fn del(&self, key: &str) -> Result<bool> {
        self.client.del(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.client.exists(key).await
    }

    async fn rpush(&self, key: &str, value: &str) -> Result<()> {
        self.client.rpush(key, value).await?;
        Ok(())
    }

    async fn blpop(&self, key: &str, timeout: Duration) -> Result<Option<String>> {
        let timeout_secs = timeout.as_secs() as usize;
        let popped = self.client.blpop(&[key], timeout_secs).await?;
        Ok(popped.map(|(_, value)| value))
    }

    async fn llen(&self, key: &str) -> Result<u64> {
        self.client.llen(key).await
    }
}
