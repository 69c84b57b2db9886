//! String-keyed bounded cache with asynchronous variants and persistence.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use astrocache_async::{Future, TaskError};
use astrocache_core::notify::{notify_clear, notify_erase, notify_insert};
use astrocache_core::{CacheEvents, CacheStats, CacheValue, Expiry, epoch_ms_for, expiry_from_epoch_ms};

use crate::error::CacheError;
use crate::persist::{binary, json};

const DEFAULT_MAX_SIZE: usize = 1024;

struct ResourceEntry<V> {
    value: CacheValue<V>,
    seq: u64,
}

struct ResourceInner<V> {
    entries: HashMap<String, ResourceEntry<V>>,
    /// Insertion sequence → key; the eviction order.
    order: BTreeMap<u64, String>,
    /// Latest TTL handed to `set_expiration_time`, per key; consulted by
    /// `async_load` ahead of the cache-wide default.
    ttl_overrides: HashMap<String, Duration>,
    next_seq: u64,
    max_size: usize,
    events: CacheEvents<String, V>,
}

impl<V> ResourceInner<V> {
    fn store(&mut self, key: String, value: CacheValue<V>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        if let Some(old) = self.entries.insert(key.clone(), ResourceEntry { value, seq }) {
            self.order.remove(&old.seq);
        }
        self.order.insert(seq, key);
    }

    fn remove(&mut self, key: &str) -> Option<ResourceEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.order.remove(&entry.seq);
        Some(entry)
    }

    /// Removes the entry with the earliest insertion sequence; returns its key.
    fn pop_oldest(&mut self) -> Option<String> {
        let key = match self.order.first_key_value() {
            Some((_, key)) => key.clone(),
            None => return None,
        };
        self.remove(&key);
        Some(key)
    }
}

/// Configuration for a [`ResourceCache`].
///
/// ```
/// use astrocache::ResourceCacheBuilder;
/// use std::time::Duration;
///
/// let cache = ResourceCacheBuilder::new()
///     .max_size(500)
///     .default_ttl(Duration::from_secs(300))
///     .build::<String>();
/// assert!(cache.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct ResourceCacheBuilder {
    max_size: usize,
    default_ttl: Option<Duration>,
}

impl ResourceCacheBuilder {
    /// Starts from the defaults: 1024 entries, no default TTL.
    pub fn new() -> Self {
        ResourceCacheBuilder {
            max_size: DEFAULT_MAX_SIZE,
            default_ttl: None,
        }
    }

    /// Caps the number of entries (minimum one).
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size.max(1);
        self
    }

    /// TTL applied by `async_load` when no per-key override exists.
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Builds the cache.
    pub fn build<V>(self) -> ResourceCache<V> {
        ResourceCache {
            shared: Arc::new(ResourceShared {
                inner: RwLock::new(ResourceInner {
                    entries: HashMap::new(),
                    order: BTreeMap::new(),
                    ttl_overrides: HashMap::new(),
                    next_seq: 0,
                    max_size: self.max_size,
                    events: CacheEvents::default(),
                }),
                stats: CacheStats::new(),
                default_ttl: self.default_ttl,
            }),
        }
    }
}

impl Default for ResourceCacheBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct ResourceShared<V> {
    inner: RwLock<ResourceInner<V>>,
    stats: CacheStats,
    default_ttl: Option<Duration>,
}

/// A bounded, string-keyed cache with expiration deadlines.
///
/// Overflow evicts by **insertion order** — the entry inserted earliest goes
/// first, regardless of how recently it was read. Refreshing a deadline via
/// [`set_expiration_time`](ResourceCache::set_expiration_time) does not move
/// an entry out of eviction's way; re-inserting it does.
///
/// Handles are cheap clones sharing one state, which is what the
/// asynchronous variants hand to the worker pool. One reader-writer lock
/// guards the structure; callbacks run after it is released.
///
/// # Example
///
/// ```
/// use astrocache::ResourceCache;
/// use std::time::Duration;
///
/// let cache: ResourceCache<u32> = ResourceCache::new(10);
/// cache.insert("m31", 42, Some(Duration::from_secs(60)));
/// assert_eq!(cache.get("m31"), Some(42));
/// assert!(cache.contains("m31"));
/// ```
#[derive(Clone)]
pub struct ResourceCache<V> {
    shared: Arc<ResourceShared<V>>,
}

impl<V: Clone> ResourceCache<V> {
    /// Creates a cache bounded to `max_size` entries (minimum one).
    pub fn new(max_size: usize) -> Self {
        ResourceCacheBuilder::new().max_size(max_size).build()
    }

    /// Inserts or replaces an entry; `ttl` of `None` means it never expires.
    ///
    /// A new key at capacity evicts the oldest-inserted entry first (erase
    /// callback), then the insert callback fires for this key.
    pub fn insert(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let key = key.into();
        let mut inner = self.shared.inner.write();
        let insert = inner.events.insert_fn();
        let erase = inner.events.erase_fn();
        let notify_value = insert.as_ref().map(|_| value.clone());
        let mut evicted = None;
        if !inner.entries.contains_key(&key) && inner.entries.len() >= inner.max_size {
            evicted = inner.pop_oldest();
        }
        inner.store(key.clone(), CacheValue::new(value, ttl));
        drop(inner);
        if let (Some(callback), Some(evicted_key)) = (&erase, &evicted) {
            notify_erase(callback, evicted_key);
        }
        if let (Some(callback), Some(value)) = (&insert, &notify_value) {
            notify_insert(callback, &key, value);
        }
    }

    /// True if the key is present and unexpired. An expired entry is removed
    /// on the way out (erase callback).
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut inner = self.shared.inner.write();
        match inner.entries.get(key) {
            None => return false,
            Some(entry) if !entry.value.is_expired(now) => return true,
            Some(_) => {}
        }
        inner.remove(key);
        let erase = inner.events.erase_fn();
        drop(inner);
        if let Some(callback) = erase {
            notify_erase(&callback, &key.to_string());
        }
        false
    }

    /// Returns a clone of the value; an expired entry is removed (erase
    /// callback) and reported as absent. Hits and misses are counted.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut inner = self.shared.inner.write();
        match inner.entries.get(key) {
            None => {
                self.shared.stats.miss();
                return None;
            }
            Some(entry) if !entry.value.is_expired(now) => {
                self.shared.stats.hit();
                return Some(entry.value.data().clone());
            }
            Some(_) => {}
        }
        self.shared.stats.miss();
        inner.remove(key);
        let erase = inner.events.erase_fn();
        drop(inner);
        if let Some(callback) = erase {
            notify_erase(&callback, &key.to_string());
        }
        None
    }

    /// Removes an entry if present, firing the erase callback.
    pub fn remove(&self, key: &str) {
        let mut inner = self.shared.inner.write();
        let removed = inner.remove(key).is_some();
        let erase = inner.events.erase_fn();
        drop(inner);
        if removed && let Some(callback) = erase {
            notify_erase(&callback, &key.to_string());
        }
    }

    /// Drops every entry and fires the clear callback. Statistics are
    /// preserved.
    pub fn clear(&self) {
        let mut inner = self.shared.inner.write();
        inner.entries.clear();
        inner.order.clear();
        inner.ttl_overrides.clear();
        let clear = inner.events.clear_fn();
        drop(inner);
        if let Some(callback) = clear {
            notify_clear(&callback);
        }
    }

    /// Number of entries currently held, expired ones included until touched.
    pub fn size(&self) -> usize {
        self.shared.inner.read().entries.len()
    }

    /// True when the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.shared.inner.read().entries.is_empty()
    }

    /// Evicts the single entry with the earliest insertion time, if any.
    pub fn evict_oldest(&self) {
        let mut inner = self.shared.inner.write();
        let evicted = inner.pop_oldest();
        let erase = inner.events.erase_fn();
        drop(inner);
        if let (Some(callback), Some(key)) = (erase, evicted) {
            notify_erase(&callback, &key);
        }
    }

    /// True if the key is present but past its deadline. Absent keys are not
    /// expired.
    pub fn is_expired(&self, key: &str) -> bool {
        let now = Instant::now();
        let inner = self.shared.inner.read();
        inner
            .entries
            .get(key)
            .is_some_and(|entry| entry.value.is_expired(now))
    }

    /// Shrinks the capacity (minimum one), evicting oldest-inserted entries
    /// until the cache fits.
    pub fn set_max_size(&self, max_size: usize) {
        let mut inner = self.shared.inner.write();
        inner.max_size = max_size.max(1);
        let mut evicted = Vec::new();
        while inner.entries.len() > inner.max_size {
            match inner.pop_oldest() {
                Some(key) => evicted.push(key),
                None => break,
            }
        }
        let erase = inner.events.erase_fn();
        drop(inner);
        if let Some(callback) = erase {
            for key in &evicted {
                notify_erase(&callback, key);
            }
        }
    }

    /// Resets the entry's deadline to `now + ttl` and records the TTL as the
    /// key's override for future `async_load`s.
    pub fn set_expiration_time(&self, key: &str, ttl: Duration) {
        let mut inner = self.shared.inner.write();
        inner.ttl_overrides.insert(key.to_string(), ttl);
        if let Some(entry) = inner.entries.get_mut(key) {
            entry.value.set_expiry(Expiry::after(Some(ttl)));
        }
    }

    /// Sweeps out every expired entry, firing the erase callback per removal.
    pub fn remove_expired(&self) {
        let now = Instant::now();
        let mut inner = self.shared.inner.write();
        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.value.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            inner.remove(key);
        }
        let erase = inner.events.erase_fn();
        drop(inner);
        if let Some(callback) = erase {
            for key in &expired {
                notify_erase(&callback, key);
            }
        }
    }

    /// Inserts every item in one exclusive section; the insert callback
    /// fires once per item (after the lock is released).
    pub fn insert_batch(&self, items: Vec<(String, V)>, ttl: Option<Duration>) {
        let mut inner = self.shared.inner.write();
        let insert = inner.events.insert_fn();
        let erase = inner.events.erase_fn();
        let mut evicted = Vec::new();
        let mut inserted = Vec::new();
        for (key, value) in items {
            if !inner.entries.contains_key(&key) && inner.entries.len() >= inner.max_size {
                if let Some(old) = inner.pop_oldest() {
                    evicted.push(old);
                }
            }
            if insert.is_some() {
                inserted.push((key.clone(), value.clone()));
            }
            inner.store(key, CacheValue::new(value, ttl));
        }
        drop(inner);
        if let Some(callback) = &erase {
            for key in &evicted {
                notify_erase(callback, key);
            }
        }
        if let Some(callback) = &insert {
            for (key, value) in &inserted {
                notify_insert(callback, key, value);
            }
        }
    }

    /// Removes every listed key; absent keys are ignored. The erase callback
    /// fires once per entry actually removed.
    pub fn remove_batch(&self, keys: &[String]) {
        let mut inner = self.shared.inner.write();
        let mut removed = Vec::new();
        for key in keys {
            if inner.remove(key).is_some() {
                removed.push(key.clone());
            }
        }
        let erase = inner.events.erase_fn();
        drop(inner);
        if let Some(callback) = erase {
            for key in &removed {
                notify_erase(&callback, key);
            }
        }
    }

    /// Installs the insert callback, replacing any previous one.
    pub fn on_insert(&self, callback: impl Fn(&String, &V) + Send + Sync + 'static) {
        self.shared
            .inner
            .write()
            .events
            .set_insert(Arc::new(callback));
    }

    /// Installs the erase callback, replacing any previous one.
    pub fn on_remove(&self, callback: impl Fn(&String) + Send + Sync + 'static) {
        self.shared
            .inner
            .write()
            .events
            .set_erase(Arc::new(callback));
    }

    /// Installs the clear callback, replacing any previous one.
    pub fn on_clear(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.shared
            .inner
            .write()
            .events
            .set_clear(Arc::new(callback));
    }

    /// `(hits, misses)` recorded by `get` so far.
    pub fn statistics(&self) -> (u64, u64) {
        self.shared.stats.snapshot()
    }

    /// TTL that `async_load` applies for `key`: the key's override if one was
    /// recorded, else the cache-wide default, else none.
    fn load_ttl(&self, key: &str) -> Option<Duration> {
        let inner = self.shared.inner.read();
        inner
            .ttl_overrides
            .get(key)
            .copied()
            .or(self.shared.default_ttl)
    }

    /// Merges decoded snapshot entries under one exclusive try-lock,
    /// overwriting existing keys and applying overflow eviction.
    fn merge_entries(&self, entries: Vec<(String, V, Expiry)>) -> Result<(), CacheError> {
        let mut inner = self.shared.inner.try_write().ok_or(CacheError::Busy)?;
        let insert = inner.events.insert_fn();
        let erase = inner.events.erase_fn();
        let mut evicted = Vec::new();
        let mut inserted = Vec::new();
        for (key, value, expiry) in entries {
            if !inner.entries.contains_key(&key) && inner.entries.len() >= inner.max_size {
                if let Some(old) = inner.pop_oldest() {
                    evicted.push(old);
                }
            }
            if insert.is_some() {
                inserted.push((key.clone(), value.clone()));
            }
            inner.store(key, CacheValue::with_expiry(value, expiry));
        }
        drop(inner);
        if let Some(callback) = &erase {
            for key in &evicted {
                notify_erase(callback, key);
            }
        }
        if let Some(callback) = &insert {
            for (key, value) in &inserted {
                notify_insert(callback, key, value);
            }
        }
        Ok(())
    }
}

impl<V> ResourceCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// `get` scheduled on the shared worker pool.
    pub fn async_get(&self, key: impl Into<String>) -> Future<Option<V>> {
        let cache = self.clone();
        let key = key.into();
        astrocache_async::spawn(move || cache.get(&key))
    }

    /// `insert` scheduled on the shared worker pool; the future completes
    /// once the value is in place.
    pub fn async_insert(
        &self,
        key: impl Into<String>,
        value: V,
        ttl: Option<Duration>,
    ) -> Future<()> {
        let cache = self.clone();
        let key = key.into();
        astrocache_async::spawn(move || cache.insert(key, value, ttl))
    }

    /// Runs `loader` on the worker pool and inserts its value under `key`
    /// with the TTL resolved from the key's override, then the cache-wide
    /// default, then "never". A loader failure settles the future with the
    /// error and inserts nothing.
    pub fn async_load<E, F>(&self, key: impl Into<String>, loader: F) -> Future<()>
    where
        E: std::error::Error + Send + Sync + 'static,
        F: FnOnce() -> Result<V, E> + Send + 'static,
    {
        let cache = self.clone();
        let key = key.into();
        astrocache_async::try_spawn(move || {
            let value = loader().map_err(TaskError::failed)?;
            let ttl = cache.load_ttl(&key);
            cache.insert(key, value, ttl);
            Ok(())
        })
    }
}

impl<V: Clone> ResourceCache<V> {
    /// Writes a binary snapshot in insertion order: a point-in-time image
    /// taken under one exclusive try-lock ([`CacheError::Busy`] if
    /// contended). Expiration deadlines are not persisted.
    pub fn write_to_file<S, E>(&self, path: impl AsRef<Path>, serialize: S) -> Result<(), CacheError>
    where
        S: Fn(&V) -> Result<Vec<u8>, E>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let records = {
            let inner = self.shared.inner.try_write().ok_or(CacheError::Busy)?;
            let mut records = Vec::with_capacity(inner.entries.len());
            for key in inner.order.values() {
                if let Some(entry) = inner.entries.get(key) {
                    let bytes = serialize(entry.value.data())
                        .map_err(|error| CacheError::Serializer(Box::new(error)))?;
                    records.push((key.as_bytes().to_vec(), bytes));
                }
            }
            records
        };
        binary::write_snapshot(path.as_ref(), &records)
    }

    /// Reads a binary snapshot back, merging it into the cache (existing
    /// keys are overwritten). Loaded entries never expire. On any decode
    /// failure the cache is left unchanged.
    pub fn read_from_file<D, E>(
        &self,
        path: impl AsRef<Path>,
        deserialize: D,
    ) -> Result<(), CacheError>
    where
        D: Fn(&[u8]) -> Result<V, E>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let records = binary::read_snapshot(path.as_ref())?;
        let mut decoded = Vec::with_capacity(records.len());
        for (key_bytes, value_bytes) in &records {
            let key = String::from_utf8(key_bytes.clone())
                .map_err(|error| CacheError::Corrupt(format!("key is not valid UTF-8: {error}")))?;
            let value = deserialize(value_bytes)
                .map_err(|error| CacheError::Serializer(Box::new(error)))?;
            decoded.push((key, value, Expiry::Never));
        }
        self.merge_entries(decoded)
    }

    /// Writes a JSON snapshot: an object mapping each key to
    /// `{ "value": to_json(v), "expiry_ms": <i64> }` with `-1` for "never".
    pub fn write_to_json_file<S, E>(
        &self,
        path: impl AsRef<Path>,
        to_json: S,
    ) -> Result<(), CacheError>
    where
        S: Fn(&V) -> Result<serde_json::Value, E>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let entries = {
            let inner = self.shared.inner.try_write().ok_or(CacheError::Busy)?;
            let mut entries = Vec::with_capacity(inner.entries.len());
            for key in inner.order.values() {
                if let Some(entry) = inner.entries.get(key) {
                    let value = to_json(entry.value.data())
                        .map_err(|error| CacheError::Serializer(Box::new(error)))?;
                    entries.push((
                        key.clone(),
                        json::JsonEntry {
                            value,
                            expiry_ms: epoch_ms_for(entry.value.expiry()),
                        },
                    ));
                }
            }
            entries
        };
        json::write_snapshot(path.as_ref(), entries)
    }

    /// Reads a JSON snapshot back, merging it into the cache (existing keys
    /// are overwritten). Deadlines are restored; one already in the past
    /// loads as an expired entry.
    pub fn read_from_json_file<D, E>(
        &self,
        path: impl AsRef<Path>,
        from_json: D,
    ) -> Result<(), CacheError>
    where
        D: Fn(&serde_json::Value) -> Result<V, E>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let raw = json::read_snapshot(path.as_ref())?;
        let mut decoded = Vec::with_capacity(raw.len());
        for (key, entry) in raw {
            let value = from_json(&entry.value)
                .map_err(|error| CacheError::Serializer(Box::new(error)))?;
            decoded.push((key, value, expiry_from_epoch_ms(entry.expiry_ms)));
        }
        self.merge_entries(decoded)
    }
}
