//! Cached value types with expiration metadata.
//!
//! Every cache in the family stores its payloads wrapped in a [`CacheValue`],
//! which pairs the data with an [`Expiry`] deadline on the monotonic clock.
//! Deadlines are evaluated lazily: a value past its deadline stays in place
//! until an access or a sweep observes it.

use std::time::{Duration, Instant};

/// Monotonic expiration deadline of a cache entry.
///
/// `Never` marks an entry that stays valid until it is evicted or erased.
/// Deadlines are compared against [`Instant`]s taken at access time, so an
/// entry created with a zero TTL is expired from birth.
///
/// # Example
///
/// ```
/// use astrocache_core::Expiry;
/// use std::time::{Duration, Instant};
///
/// let expiry = Expiry::after(Some(Duration::from_secs(60)));
/// assert!(!expiry.is_expired(Instant::now()));
///
/// let born_dead = Expiry::after(Some(Duration::ZERO));
/// assert!(born_dead.is_expired(Instant::now()));
///
/// assert!(!Expiry::Never.is_expired(Instant::now()));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// The entry never expires.
    Never,
    /// The entry is invalid at and after this instant.
    At(Instant),
}

impl Expiry {
    /// Deadline `ttl` from now; `None` means the entry never expires.
    pub fn after(ttl: Option<Duration>) -> Self {
        match ttl {
            Some(ttl) => Expiry::At(Instant::now() + ttl),
            None => Expiry::Never,
        }
    }

    /// Returns true if the deadline has been reached at `now`.
    pub fn is_expired(&self, now: Instant) -> bool {
        match self {
            Expiry::Never => false,
            Expiry::At(deadline) => *deadline <= now,
        }
    }

    /// Time left until the deadline, or `None` for `Never` and for deadlines
    /// already in the past.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        match self {
            Expiry::Never => None,
            Expiry::At(deadline) => deadline.checked_duration_since(now),
        }
    }
}

/// A cached payload together with its expiration deadline.
///
/// # Example
///
/// ```
/// use astrocache_core::CacheValue;
/// use std::time::{Duration, Instant};
///
/// let value = CacheValue::new("m31", Some(Duration::from_secs(30)));
/// assert_eq!(value.data(), &"m31");
/// assert!(!value.is_expired(Instant::now()));
/// assert_eq!(value.into_inner(), "m31");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheValue<T> {
    data: T,
    expiry: Expiry,
}

impl<T> CacheValue<T> {
    /// Wraps `data` with a deadline `ttl` from now (`None` = never expires).
    pub fn new(data: T, ttl: Option<Duration>) -> Self {
        CacheValue {
            data,
            expiry: Expiry::after(ttl),
        }
    }

    /// Wraps `data` with an explicit deadline.
    pub fn with_expiry(data: T, expiry: Expiry) -> Self {
        CacheValue { data, expiry }
    }

    /// Returns a reference to the cached data.
    #[inline]
    pub fn data(&self) -> &T {
        &self.data
    }

    /// Returns the expiration deadline.
    #[inline]
    pub fn expiry(&self) -> Expiry {
        self.expiry
    }

    /// Replaces the expiration deadline in place.
    pub fn set_expiry(&mut self, expiry: Expiry) {
        self.expiry = expiry;
    }

    /// Returns true if the deadline has been reached at `now`.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expiry.is_expired(now)
    }

    /// Consumes the wrapper and returns the inner data.
    pub fn into_inner(self) -> T {
        self.data
    }
}
