//! In-memory queue store for testing.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::queue::{QueueError, QueueState, QueueStore, StoredQueue};

/// Queue store that keeps the snapshot in memory.
///
/// Provides controllable behavior for testing:
/// - Seed the snapshot returned by `load`
/// - Inspect the last saved snapshot and count saves
/// - Make saves fail
#[derive(Debug, Default)]
pub struct MemoryQueueStore {
    stored: Mutex<StoredQueue>,
    saved: Mutex<Option<QueueState>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
}

impl MemoryQueueStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose first `load` returns `stored`.
    pub fn with_stored(stored: StoredQueue) -> Self {
        Self {
            stored: Mutex::new(stored),
            ..Self::default()
        }
    }

    /// The most recently saved snapshot.
    pub fn saved(&self) -> Option<QueueState> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make every subsequent save fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

impl QueueStore for MemoryQueueStore {
    fn load(&self) -> Result<StoredQueue, QueueError> {
        if let Some(state) = self.saved() {
            return Ok(StoredQueue {
                tickets: Some(state.tickets),
                counters: Some(state.counters),
                stats: Some(state.stats),
                sequencer: Some(state.sequencer),
            });
        }
        Ok(self
            .stored
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, state: &QueueState) -> Result<(), QueueError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(QueueError::Storage("simulated save failure".to_string()));
        }
        *self.saved.lock().unwrap_or_else(PoisonError::into_inner) = Some(state.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
