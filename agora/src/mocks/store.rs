//! Mock state store with failure injection.

use crate::error::{AgoraError, AgoraResult};
use crate::traits::{MemoryStore, StateStore};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct MockStore {
    inner: MemoryStore,
    fail: Arc<AtomicBool>,
    writes: Arc<AtomicU64>,
    closed: Arc<AtomicBool>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail until reset.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Successful `put` calls so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn check(&self) -> AgoraResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AgoraError::Storage("simulated storage failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl StateStore for MockStore {
    async fn get(&self, key: &str) -> AgoraResult<Option<Vec<u8>>> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> AgoraResult<()> {
        self.check()?;
        self.inner.put(key, value).await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, key: &str) -> AgoraResult<()> {
        self.check()?;
        self.inner.delete(key).await
    }

    async fn close(&self) -> AgoraResult<()> {
        self.check()?;
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
