//! Per-URL write locks
//!
//! Upserts for one URL are serialized while upserts for different URLs run
//! side by side. A slot exists only while some caller holds or waits on it.

use dashmap::DashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Mutual exclusion keyed by URL
#[derive(Debug, Default)]
pub struct KeyedLocks {
    slots: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` while holding the lock for `key`
    pub fn with_lock<T>(&self, key: &str, f: impl FnOnce() -> T) -> T {
        let slot = Arc::clone(self.slots.entry(key.to_string()).or_default().value());

        let result = {
            // A panic inside `f` poisons only this slot's unit value
            let _held = slot.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };

        // Two references left means the map and this caller: nobody is waiting
        self.slots
            .remove_if(key, |_, slot| Arc::strong_count(slot) == 2);
        drop(slot);

        result
    }

    /// Returns true if some caller currently holds `key`
    pub fn is_locked(&self, key: &str) -> bool {
        self.slots
            .get(key)
            .map_or(false, |slot| slot.try_lock().is_err())
    }

    /// Number of keys held or waited on
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
