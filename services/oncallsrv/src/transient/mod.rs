//! Transient shared state: the alert queue and the lease registry keys
//!
//! Everything here is short-lived Redis data; nothing is relied on for
//! durability. The trait exists so the dispatcher and its tests can run
//! against an in-memory backend with the same TTL semantics.

pub mod memory_impl;
pub mod redis_impl;

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

pub use memory_impl::MemoryTransientStore;
pub use redis_impl::RedisTransientStore;

/// Key/value store with per-key TTLs plus a FIFO list, matching the
/// Redis commands the core uses.
///
/// Implementations:
/// - `RedisTransientStore`: production backend
/// - `MemoryTransientStore`: in-memory backend for tests
#[async_trait]
pub trait TransientStore: Send + Sync + 'static {
    /// Get value by key; expired keys read as absent
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set value with a TTL
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Atomic set-if-absent with a TTL; returns true when the key was set
    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool>;

    /// Delete key; returns true when a key was removed
    async fn del(&self, key: &str) -> Result<bool>;

    /// Check whether a key exists (and has not expired)
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Append to the tail of a list
    async fn rpush(&self, key: &str, value: &str) -> Result<()>;

    /// Blocking pop from the head of a list.
    ///
    /// `Duration::ZERO` blocks indefinitely; otherwise returns None on
    /// timeout.
    async fn blpop(&self, key: &str, timeout: Duration) -> Result<Option<String>>;

    /// List length
    async fn llen(&self, key: &str) -> Result<u64>;
}
