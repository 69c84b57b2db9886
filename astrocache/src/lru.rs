//! Recency-ordered bounded cache with per-entry TTL.

use std::hash::Hash;
use std::path::Path;
use std::time::{Duration, Instant};

use lru::LruCache as RawLru;
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;

use astrocache_core::notify::{notify_clear, notify_erase, notify_insert};
use astrocache_core::{CacheEvents, CacheStats, CacheValue};

use crate::error::CacheError;
use crate::persist::{binary, codec};

struct LruInner<K: Hash + Eq, V> {
    entries: RawLru<K, CacheValue<V>>,
    max_size: usize,
    events: CacheEvents<K, V>,
}

/// A thread-safe cache holding at most `max_size` entries in recency order.
///
/// `get` and `put` move the touched entry to the most-recently-used position;
/// inserting past capacity evicts the least-recently-used entry. Entries may
/// carry a TTL, checked only on `get` — there is no background sweeping (see
/// [`TtlCache`](crate::TtlCache) for that).
///
/// The whole structure sits behind one reader-writer lock. `get` mutates the
/// recency order, so it takes the lock exclusively — with a *try* acquire: a
/// contended `get` returns `None` without recording a miss rather than
/// blocking. Callbacks always run after the lock is released.
///
/// # Example
///
/// ```
/// use astrocache::LruCache;
///
/// let cache: LruCache<u32, String> = LruCache::new(2);
/// cache.put(1, "first".to_string(), None);
/// cache.put(2, "second".to_string(), None);
/// cache.put(3, "third".to_string(), None); // evicts key 1
///
/// assert_eq!(cache.get(&1), None);
/// assert_eq!(cache.get(&3), Some("third".to_string()));
/// assert_eq!(cache.size(), 2);
/// ```
pub struct LruCache<K: Hash + Eq, V> {
    inner: RwLock<LruInner<K, V>>,
    stats: CacheStats,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Creates a cache bounded to `max_size` entries (minimum one).
    pub fn new(max_size: usize) -> Self {
        LruCache {
            inner: RwLock::new(LruInner {
                entries: RawLru::unbounded(),
                max_size: max_size.max(1),
                events: CacheEvents::default(),
            }),
            stats: CacheStats::new(),
        }
    }

    /// Returns a clone of the value and promotes the entry to most-recent.
    ///
    /// An expired entry is removed (firing the erase callback) and counts as
    /// a miss. If the lock is contended the call returns `None` immediately
    /// without touching the counters.
    pub fn get(&self, key: &K) -> Option<V> {
        let Some(mut inner) = self.inner.try_write() else {
            return None;
        };
        let now = Instant::now();
        match inner.entries.get(key) {
            None => {
                self.stats.miss();
                return None;
            }
            Some(entry) if !entry.is_expired(now) => {
                self.stats.hit();
                return Some(entry.data().clone());
            }
            Some(_) => {}
        }
        // Present but past its deadline: remove it on the way out.
        self.stats.miss();
        inner.entries.pop(key);
        let erase = inner.events.erase_fn();
        drop(inner);
        if let Some(callback) = erase {
            notify_erase(&callback, key);
        }
        None
    }

    /// Inserts or updates an entry, promoting it to most-recent.
    ///
    /// `ttl` of `None` means the entry never expires. Growing past capacity
    /// evicts the least-recently-used entry (erase callback); the insert
    /// callback fires for every put.
    pub fn put(&self, key: K, value: V, ttl: Option<Duration>) {
        let mut inner = self.inner.write();
        let insert = inner.events.insert_fn();
        let erase = inner.events.erase_fn();
        let notify_value = insert.as_ref().map(|_| value.clone());
        let was_update = inner
            .entries
            .put(key.clone(), CacheValue::new(value, ttl))
            .is_some();
        let mut evicted = None;
        if !was_update && inner.entries.len() > inner.max_size {
            evicted = inner.entries.pop_lru().map(|(k, _)| k);
        }
        drop(inner);
        if let (Some(callback), Some(evicted_key)) = (&erase, &evicted) {
            notify_erase(callback, evicted_key);
        }
        if let (Some(callback), Some(value)) = (&insert, &notify_value) {
            notify_insert(callback, &key, value);
        }
    }

    /// Removes an entry if present, firing the erase callback.
    pub fn erase(&self, key: &K) {
        let mut inner = self.inner.write();
        let removed = inner.entries.pop(key).is_some();
        let erase = inner.events.erase_fn();
        drop(inner);
        if removed && let Some(callback) = erase {
            notify_erase(&callback, key);
        }
    }

    /// Drops every entry and fires the clear callback. Hit/miss counters are
    /// preserved.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.entries.clear();
        let clear = inner.events.clear_fn();
        drop(inner);
        if let Some(callback) = clear {
            notify_clear(&callback);
        }
    }

    /// Snapshot of the keys, most-recently-used first.
    pub fn keys(&self) -> Vec<K> {
        let inner = self.inner.read();
        inner.entries.iter().map(|(key, _)| key.clone()).collect()
    }

    /// Removes and returns the least-recently-used entry. No callback fires.
    pub fn pop_lru(&self) -> Option<(K, V)> {
        let mut inner = self.inner.write();
        inner
            .entries
            .pop_lru()
            .map(|(key, entry)| (key, entry.into_inner()))
    }

    /// Changes the capacity. Shrinking evicts from the LRU end (erase
    /// callback per eviction) until the cache fits; a capacity of zero evicts
    /// everything and then behaves as capacity one.
    pub fn resize(&self, new_max_size: usize) {
        let mut inner = self.inner.write();
        let mut evicted = Vec::new();
        while inner.entries.len() > new_max_size {
            match inner.entries.pop_lru() {
                Some((key, _)) => evicted.push(key),
                None => break,
            }
        }
        inner.max_size = new_max_size.max(1);
        let erase = inner.events.erase_fn();
        drop(inner);
        if let Some(callback) = erase {
            for key in &evicted {
                notify_erase(&callback, key);
            }
        }
    }

    /// Number of entries currently held.
    pub fn size(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// True when the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    /// Ratio of current size to capacity.
    pub fn load_factor(&self) -> f32 {
        let inner = self.inner.read();
        inner.entries.len() as f32 / inner.max_size as f32
    }

    /// Ratio of hits to total accesses; `0.0` before the first access.
    pub fn hit_rate(&self) -> f32 {
        self.stats.hit_rate() as f32
    }

    /// Installs the insert callback, replacing any previous one.
    pub fn set_insert_callback(&self, callback: impl Fn(&K, &V) + Send + Sync + 'static) {
        self.inner
            .write()
            .events
            .set_insert(std::sync::Arc::new(callback));
    }

    /// Installs the erase callback, replacing any previous one.
    pub fn set_erase_callback(&self, callback: impl Fn(&K) + Send + Sync + 'static) {
        self.inner
            .write()
            .events
            .set_erase(std::sync::Arc::new(callback));
    }

    /// Installs the clear callback, replacing any previous one.
    pub fn set_clear_callback(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.inner
            .write()
            .events
            .set_clear(std::sync::Arc::new(callback));
    }
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone + Serialize + DeserializeOwned,
    V: Clone + Serialize + DeserializeOwned,
{
    /// Writes a binary snapshot, most-recently-used first.
    ///
    /// Uses a try-lock: if the cache is in use the call fails with
    /// [`CacheError::Busy`] instead of risking a deadlock. Expiration
    /// deadlines are not persisted.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), CacheError> {
        let records = {
            let inner = self.inner.try_write().ok_or(CacheError::Busy)?;
            let mut records = Vec::with_capacity(inner.entries.len());
            for (key, entry) in inner.entries.iter() {
                records.push((codec::encode(key)?, codec::encode(entry.data())?));
            }
            records
        };
        binary::write_snapshot(path.as_ref(), &records)
    }

    /// Replaces the cache contents with a snapshot written by
    /// [`save_to_file`](LruCache::save_to_file), restoring the recency order.
    ///
    /// Loaded entries never expire. On any decode failure the cache is left
    /// exactly as it was; no callbacks fire for loaded entries.
    pub fn load_from_file(&self, path: impl AsRef<Path>) -> Result<(), CacheError> {
        let records = binary::read_snapshot(path.as_ref())?;
        let mut decoded = Vec::with_capacity(records.len());
        for (key_bytes, value_bytes) in &records {
            decoded.push((codec::decode::<K>(key_bytes)?, codec::decode::<V>(value_bytes)?));
        }
        let mut inner = self.inner.try_write().ok_or(CacheError::Busy)?;
        inner.entries.clear();
        // The snapshot is MRU-first; replaying from the LRU end restores it.
        for (key, value) in decoded.into_iter().rev() {
            inner.entries.put(key, CacheValue::new(value, None));
        }
        Ok(())
    }
}
