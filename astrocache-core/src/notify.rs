//! Insert/erase/clear event callbacks.
//!
//! Each cache holds at most one callback per event kind; assigning a new one
//! replaces the previous. Callbacks are dispatched **after** the cache lock
//! is released — the cache clones the `Arc` it needs while locked and invokes
//! it once unlocked, so a callback can call back into the cache without
//! deadlocking. A panicking callback is caught, logged at debug level, and
//! discarded; it never poisons cache state or reaches the caller.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::debug;

/// Callback invoked after an entry is inserted or updated.
pub type InsertFn<K, V> = Arc<dyn Fn(&K, &V) + Send + Sync>;

/// Callback invoked after an entry is erased, evicted, or expires out.
pub type EraseFn<K> = Arc<dyn Fn(&K) + Send + Sync>;

/// Callback invoked after the cache is cleared.
pub type ClearFn = Arc<dyn Fn() + Send + Sync>;

/// Holder for the three event callbacks of a cache.
pub struct CacheEvents<K, V> {
    insert: Option<InsertFn<K, V>>,
    erase: Option<EraseFn<K>>,
    clear: Option<ClearFn>,
}

impl<K, V> Default for CacheEvents<K, V> {
    fn default() -> Self {
        CacheEvents {
            insert: None,
            erase: None,
            clear: None,
        }
    }
}

impl<K, V> CacheEvents<K, V> {
    /// Installs the insert callback, replacing any previous one.
    pub fn set_insert(&mut self, callback: InsertFn<K, V>) {
        self.insert = Some(callback);
    }

    /// Installs the erase callback, replacing any previous one.
    pub fn set_erase(&mut self, callback: EraseFn<K>) {
        self.erase = Some(callback);
    }

    /// Installs the clear callback, replacing any previous one.
    pub fn set_clear(&mut self, callback: ClearFn) {
        self.clear = Some(callback);
    }

    /// Clone of the installed insert callback, if any.
    pub fn insert_fn(&self) -> Option<InsertFn<K, V>> {
        self.insert.clone()
    }

    /// Clone of the installed erase callback, if any.
    pub fn erase_fn(&self) -> Option<EraseFn<K>> {
        self.erase.clone()
    }

    /// Clone of the installed clear callback, if any.
    pub fn clear_fn(&self) -> Option<ClearFn> {
        self.clear.clone()
    }
}

/// Runs an insert callback, swallowing panics.
pub fn notify_insert<K, V>(callback: &InsertFn<K, V>, key: &K, value: &V) {
    if catch_unwind(AssertUnwindSafe(|| callback(key, value))).is_err() {
        debug!("insert callback panicked; discarding");
    }
}

/// Runs an erase callback, swallowing panics.
pub fn notify_erase<K>(callback: &EraseFn<K>, key: &K) {
    if catch_unwind(AssertUnwindSafe(|| callback(key))).is_err() {
        debug!("erase callback panicked; discarding");
    }
}

/// Runs a clear callback, swallowing panics.
pub fn notify_clear(callback: &ClearFn) {
    if catch_unwind(AssertUnwindSafe(|| callback())).is_err() {
        debug!("clear callback panicked; discarding");
    }
}
