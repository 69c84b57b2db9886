//! Lock-free hit/miss accounting shared by all caches.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic hit/miss counters.
///
/// Counters are updated with relaxed atomics so the caches can record
/// accesses from shared-lock sections. The hit rate is defined as
/// `hits / (hits + misses)` and is `0.0` before the first access.
///
/// # Example
///
/// ```
/// use astrocache_core::CacheStats;
///
/// let stats = CacheStats::new();
/// assert_eq!(stats.hit_rate(), 0.0);
/// stats.hit();
/// stats.miss();
/// assert_eq!(stats.snapshot(), (1, 1));
/// assert_eq!(stats.hit_rate(), 0.5);
/// ```
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a cache hit.
    #[inline]
    pub fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a cache miss.
    #[inline]
    pub fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns `(hits, misses)` at this moment.
    pub fn snapshot(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    /// Ratio of hits to total accesses; `0.0` with no accesses recorded.
    pub fn hit_rate(&self) -> f64 {
        let (hits, misses) = self.snapshot();
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Resets both counters to zero.
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_counts_both_kinds() {
        let stats = CacheStats::new();
        stats.hit();
        stats.hit();
        stats.miss();
        assert_eq!(stats.snapshot(), (2, 1));
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn reset_zeroes_counters() {
        let stats = CacheStats::new();
        stats.hit();
        stats.miss();
        stats.reset();
        assert_eq!(stats.snapshot(), (0, 0));
        assert_eq!(stats.hit_rate(), 0.0);
    }
}
