//! Per-identifier exclusive access.
//!
//! Every read-modify-write of one assignment record goes through
//! [`KeyedLocks::lock`], so concurrent submissions, reminder clearances and
//! administrative edits of the same identifier are applied one after another.
//! Different identifiers never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Clone, Default)]
pub struct KeyedLocks {
    inner: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until `key` is free and returns a guard holding it.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            // Idle entries are only referenced by the map itself.
            map.retain(|_, slot| Arc::strong_count(slot) > 1);
            map.entry(key.to_string()).or_default().clone()
        };
        slot.lock_owned().await
    }

    /// Number of identifiers currently held or awaited.
    pub fn active(&self) -> usize {
        let map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.values().filter(|slot| Arc::strong_count(slot) > 1).count()
    }
}
