//! In-memory implementation of the transient store
//!
//! DashMap-backed, with real TTL behaviour (expired keys read as
//! absent). Used by tests and by single-node setups without Redis.

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::TransientStore;

#[derive(Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// In-memory transient store with TTL support
#[derive(Default)]
pub struct MemoryTransientStore {
    kv: DashMap<String, Entry>,
    lists: DashMap<String, Arc<Mutex<VecDeque<String>>>>,
}

/// Poll granularity of the in-memory blocking pop
const BLPOP_POLL: Duration = Duration::from_millis(20);

impl MemoryTransientStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn list(&self, key: &str) -> Arc<Mutex<VecDeque<String>>> {
        self.lists.entry(key.to_string()).or_default().clone()
    }

    /// Drop all data (test helper)
    pub fn clear(&self) {
        self.kv.clear();
        self.lists.clear();
    }
}

#[async_trait]
impl TransientStore for MemoryTransientStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        if let Some(entry) = self.kv.get(key) {
            if !entry.expired() {
                return Ok(Some(entry.value.clone()));
            }
        }
        // Lazy expiry
        self.kv.remove_if(key, |_, entry| entry.expired());
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.kv.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: Some(Instant::now() + ttl),
        };
        match self.kv.entry(key.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                if occupied.get().expired() {
                    occupied.insert(entry);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(entry);
                Ok(true)
            }
        }
    }

    async fn del(&self, key: &str) -> Result<bool> {
        Ok(self.kv.remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    async fn rpush(&self, key: &str, value: &str) -> Result<()> {
        self.list(key).lock().push_back(value.to_string());
        Ok(())
    }

    async fn blpop(&self, key: &str, timeout: Duration) -> Result<Option<String>> {
        let deadline = (!timeout.is_zero()).then(|| Instant::now() + timeout);

        loop {
            if let Some(value) = self.list(key).lock().pop_front() {
                return Ok(Some(value));
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Ok(None);
                }
            }
            tokio::time::sleep(BLPOP_POLL).await;
        }
    }

    async fn llen(&self, key: &str) -> Result<u64> {
        Ok(self.list(key).lock().len() as u64)
    }
}
