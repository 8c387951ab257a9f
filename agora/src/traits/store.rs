//! Durable local storage abstraction for checkpoints.

use crate::error::AgoraResult;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Opaque key/value storage.
///
/// Values are already-encoded bytes; the store never interprets them.
#[async_trait]
pub trait StateStore: Send + Sync + Clone {
    async fn get(&self, key: &str) -> AgoraResult<Option<Vec<u8>>>;

    async fn put(&self, key: &str, value: Vec<u8>) -> AgoraResult<()>;

    async fn delete(&self, key: &str) -> AgoraResult<()>;

    /// Flush and release any underlying resources.
    async fn close(&self) -> AgoraResult<()> {
        Ok(())
    }
}

/// Process-local store. Contents vanish with the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, key: &str) -> AgoraResult<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> AgoraResult<()> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> AgoraResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}
