//! In-process snapshot store.
//!
//! Keeps the snapshot as serialized JSON so reads and writes exercise the
//! same encoding as durable backends. Supports injected save failures.

use super::{ReminderStore, StoreError, StoreResult};
use crate::model::day::DayData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: Mutex<Option<String>>,
    failing_saves: AtomicUsize,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `data`.
    pub fn with_data(data: &DayData) -> StoreResult<Self> {
        let store = Self::new();
        store.save(data)?;
        store.saves.store(0, Ordering::SeqCst);
        Ok(store)
    }

    /// Makes the next `count` saves fail with `StoreError::Unavailable`.
    pub fn fail_next_saves(&self, count: usize) {
        self.failing_saves.store(count, Ordering::SeqCst);
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn take_injected_failure(&self) -> bool {
        self.failing_saves
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok()
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, Option<String>>> {
        self.snapshot
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl ReminderStore for MemoryStore {
    fn load(&self) -> StoreResult<Option<DayData>> {
        let guard = self.lock()?;
        guard
            .as_deref()
            .map(|json| {
                serde_json::from_str(json).map_err(|err| StoreError::Corrupt(err.to_string()))
            })
            .transpose()
    }

    fn save(&self, data: &DayData) -> StoreResult<()> {
        if self.take_injected_failure() {
            return Err(StoreError::Unavailable("injected save failure".to_string()));
        }
        let json = serde_json::to_string(data)?;
        *self.lock()? = Some(json);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
