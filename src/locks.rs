//! Per-fingerprint mutual exclusion, lazily allocated, reference-stable.
//! Built on an async mutex so a blocked acquirer suspends its task instead
//! of pinning a worker thread.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::fingerprint::Fingerprint;

/// Lazily-grown mapping from fingerprint to a reentrant-free mutual
/// exclusion token. Entries persist for the lifetime of the store, trading
/// unbounded growth for O(1) lookup.
#[derive(Default)]
pub struct LockTable {
    entries: StdMutex<HashMap<Fingerprint, Arc<AsyncMutex<()>>>>,
}

/// Holds the per-key critical section open for as long as it's alive.
pub type LockGuard = OwnedMutexGuard<()>;

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `fp`, suspending the calling task (not a
    /// platform thread) if another operation on the same key is in
    /// progress. FIFO-ish fairness and starvation freedom come from
    /// `tokio::sync::Mutex`'s internal queueing; reentrancy is not
    /// supported — a lock holder must never re-enter.
    pub async fn acquire(&self, fp: Fingerprint) -> LockGuard {
        let entry = self.entry_for(fp);
        entry.lock_owned().await
    }

    /// First access for a fingerprint creates the token under a short,
    /// synchronous critical section; subsequent accesses only need a
    /// read-then-clone of the `Arc`.
    fn entry_for(&self, fp: Fingerprint) -> Arc<AsyncMutex<()>> {
        let mut entries = self.entries.lock().expect("lock table poisoned");
        entries
            .entry(fp)
            .or_insert_with(|| {
                tracing::trace!(%fp, "lock table: first access, allocating entry");
                Arc::new(AsyncMutex::new(()))
            })
            .clone()
    }

    /// Number of fingerprints that have ever been locked. Exposed for
    /// testing/observability only.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().expect("lock table poisoned").len()
    }
}
