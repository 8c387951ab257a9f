//! Mock time provider for testing.

use crate::traits::TimeProvider;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Mock time provider with a controllable millisecond clock.
#[derive(Debug, Clone)]
pub struct MockTime {
    current_time: Arc<AtomicU64>,
}

impl MockTime {
    pub fn new(initial_millis: u64) -> Self {
        Self {
            current_time: Arc::new(AtomicU64::new(initial_millis)),
        }
    }

    /// Start at 2024-01-01 00:00:00 UTC.
    pub fn default_time() -> Self {
        Self::new(1_704_067_200_000)
    }

    pub fn set(&self, millis: u64) {
        self.current_time.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: u64) {
        self.current_time.fetch_add(millis, Ordering::SeqCst);
    }

    pub fn get(&self) -> u64 {
        self.current_time.load(Ordering::SeqCst)
    }
}

impl Default for MockTime {
    fn default() -> Self {
        Self::default_time()
    }
}

impl TimeProvider for MockTime {
    fn now_millis(&self) -> u64 {
        self.current_time.load(Ordering::SeqCst)
    }
}
