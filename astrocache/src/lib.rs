#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Error types for cache operations.
///
/// Defines [`CacheError`], which covers lock contention on the non-blocking
/// persistence paths, I/O and snapshot-format failures, user serializer
/// failures (passed through unchanged), and async-layer errors.
pub mod error;

/// Recency-ordered bounded cache: [`LruCache`].
pub mod lru;

/// Snapshot formats: the length-prefixed binary framing, the JSON mapping,
/// and the bincode convenience codec.
pub mod persist;

/// String-keyed bounded cache with async variants: [`ResourceCache`].
pub mod resource;

/// Fixed-TTL bounded cache with a background sweeper: [`TtlCache`].
pub mod ttl;

pub use error::CacheError;
pub use lru::LruCache;
pub use resource::{ResourceCache, ResourceCacheBuilder};
pub use ttl::TtlCache;

pub use astrocache_async::{Future, PackagedTask, Promise, TaskError};
pub use astrocache_core::{CacheStats, CacheValue, Expiry};

/// The `astrocache` prelude.
///
/// ```rust
/// use astrocache::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{CacheError, LruCache, ResourceCache, TtlCache};
}
