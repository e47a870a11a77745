// SPDX-License-Identifier: MIT OR Apache-2.0

//! Async locks by key.
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async lock per key, created on first use.
///
/// Locks of different keys never contend with each other. Locks nobody holds or waits for are
/// removed again the next time any key gets locked.
#[derive(Debug)]
pub struct KeyedLocks<K> {
    entries: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K: Eq + Hash> KeyedLocks<K> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Waits until the lock of `key` is free and returns its guard.
    ///
    /// The lock is released when the guard is dropped.
    pub async fn lock(&self, key: K) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

            // The map holds one reference, every holder and waiter another one.
            entries.retain(|_, mutex| Arc::strong_count(mutex) > 1);
            entries.entry(key).or_default().clone()
        };

        mutex.lock_owned().await
    }

    /// Number of locks currently known.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}
