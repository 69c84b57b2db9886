#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod clock;
pub mod notify;
pub mod stats;
pub mod value;

pub use clock::{NEVER_EXPIRES_MS, epoch_ms_for, expiry_from_epoch_ms};
pub use notify::{CacheEvents, ClearFn, EraseFn, InsertFn};
pub use stats::CacheStats;
pub use value::{CacheValue, Expiry};
