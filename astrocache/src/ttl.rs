//! Fixed-TTL bounded cache with a background sweeper.

use std::hash::Hash;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use lru::LruCache as RawLru;
use parking_lot::{Condvar, Mutex, RwLock};
use tracing::warn;

use astrocache_core::{CacheStats, CacheValue};

struct TtlShared<K: Hash + Eq, V> {
    entries: RwLock<RawLru<K, CacheValue<V>>>,
    stats: CacheStats,
    ttl: Duration,
    max_capacity: usize,
    stop: Mutex<bool>,
    stop_signal: Condvar,
}

impl<K: Hash + Eq, V> TtlShared<K, V> {
    /// Pops expired entries off the LRU end, stopping at the first live one.
    fn sweep(&self) {
        let now = Instant::now();
        let mut entries = self.entries.write();
        loop {
            let tail_expired = match entries.peek_lru() {
                Some((_, entry)) => entry.is_expired(now),
                None => false,
            };
            if !tail_expired {
                break;
            }
            entries.pop_lru();
        }
    }
}

/// A bounded cache where every entry expires `ttl` after its last `put`.
///
/// Capacity overflow evicts the least-recently-used entry; a `get` hit
/// promotes the entry to most-recent. A dedicated sweeper thread wakes every
/// `ttl` and removes expired entries from the LRU end. Dropping the cache
/// signals the sweeper, wakes it, and joins it before the state is freed.
///
/// A `ttl` of zero means every entry is born expired: `get` after `put`
/// always misses, though `size()` may transiently report the entry until the
/// next sweep. A capacity of zero makes `put` a no-op.
///
/// # Example
///
/// ```
/// use astrocache::TtlCache;
/// use std::time::Duration;
///
/// let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(5), 2);
/// cache.put("alioth".to_string(), 1);
/// assert_eq!(cache.get(&"alioth".to_string()), Some(1));
/// assert_eq!(cache.hit_rate(), 1.0);
/// ```
pub struct TtlCache<K: Hash + Eq, V> {
    shared: Arc<TtlShared<K, V>>,
    sweeper: Option<JoinHandle<()>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Creates the cache and starts its sweeper thread.
    pub fn new(ttl: Duration, max_capacity: usize) -> Self {
        let shared = Arc::new(TtlShared {
            entries: RwLock::new(RawLru::unbounded()),
            stats: CacheStats::new(),
            ttl,
            max_capacity,
            stop: Mutex::new(false),
            stop_signal: Condvar::new(),
        });
        // A zero TTL must not spin the sweeper.
        let period = ttl.max(Duration::from_millis(1));
        let sweeper_shared = Arc::clone(&shared);
        let sweeper = thread::Builder::new()
            .name("astrocache-ttl-sweeper".to_string())
            .spawn(move || {
                loop {
                    {
                        let mut stopped = sweeper_shared.stop.lock();
                        if *stopped {
                            break;
                        }
                        let _ = sweeper_shared.stop_signal.wait_for(&mut stopped, period);
                        if *stopped {
                            break;
                        }
                    }
                    sweeper_shared.sweep();
                }
            });
        let sweeper = match sweeper {
            Ok(handle) => Some(handle),
            Err(error) => {
                warn!(%error, "ttl sweeper thread failed to start; relying on manual cleanup");
                None
            }
        };
        TtlCache { shared, sweeper }
    }

    /// Inserts or replaces an entry with a fresh `now + ttl` deadline.
    ///
    /// A new key at capacity evicts the least-recently-used entry first.
    pub fn put(&self, key: K, value: V) {
        if self.shared.max_capacity == 0 {
            return;
        }
        let mut entries = self.shared.entries.write();
        let is_new = entries.peek(&key).is_none();
        if is_new && entries.len() >= self.shared.max_capacity {
            entries.pop_lru();
        }
        entries.put(key, CacheValue::new(value, Some(self.shared.ttl)));
    }

    /// Returns a clone of the value if present and unexpired, promoting the
    /// entry to most-recent and counting a hit; otherwise counts a miss.
    /// Expired entries are left for the sweeper.
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let now = Instant::now();
        let mut entries = self.shared.entries.write();
        let live = matches!(entries.peek(key), Some(entry) if !entry.is_expired(now));
        if !live {
            self.shared.stats.miss();
            return None;
        }
        self.shared.stats.hit();
        entries.get(key).map(|entry| entry.data().clone())
    }

    /// Removes expired entries now instead of waiting for the sweeper.
    /// Idempotent: a second call without intervening puts changes nothing.
    pub fn cleanup(&self) {
        self.shared.sweep();
    }

    /// Ratio of hits to total accesses; `0.0` before the first access.
    pub fn hit_rate(&self) -> f64 {
        self.shared.stats.hit_rate()
    }

    /// Number of entries currently held, expired ones included until swept.
    pub fn size(&self) -> usize {
        self.shared.entries.read().len()
    }

    /// True when the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.shared.entries.read().is_empty()
    }

    /// Drops every entry and resets the hit/miss counters.
    pub fn clear(&self) {
        self.shared.entries.write().clear();
        self.shared.stats.reset();
    }
}

impl<K: Hash + Eq, V> Drop for TtlCache<K, V> {
    fn drop(&mut self) {
        *self.shared.stop.lock() = true;
        self.shared.stop_signal.notify_all();
        if let Some(handle) = self.sweeper.take()
            && handle.join().is_err()
        {
            warn!("ttl sweeper thread terminated abnormally");
        }
    }
}
