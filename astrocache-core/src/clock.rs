//! Conversion between monotonic deadlines and wall-clock timestamps.
//!
//! In-memory expiration runs on [`Instant`]s, which cannot be serialized.
//! Structured snapshots instead persist deadlines as milliseconds since the
//! Unix epoch, with `-1` encoding "never expires". The conversion is anchored
//! at call time: the distance between the deadline and the monotonic now is
//! applied to the wall clock, and vice versa on load. A persisted deadline
//! that already lies in the past loads as an entry that is expired from the
//! moment it is restored.

use std::time::Instant;

use chrono::Utc;

use crate::value::Expiry;

/// Sentinel for "never expires" in persisted snapshots.
pub const NEVER_EXPIRES_MS: i64 = -1;

/// Maps an expiration deadline to wall-clock milliseconds since the epoch.
pub fn epoch_ms_for(expiry: Expiry) -> i64 {
    match expiry {
        Expiry::Never => NEVER_EXPIRES_MS,
        Expiry::At(deadline) => {
            let now = Instant::now();
            let now_ms = Utc::now().timestamp_millis();
            match deadline.checked_duration_since(now) {
                Some(remaining) => now_ms.saturating_add(remaining.as_millis() as i64),
                // Deadline already passed; pin it to the current wall clock so
                // it stays expired on load.
                None => now_ms,
            }
        }
    }
}

/// Restores an expiration deadline from persisted epoch milliseconds.
pub fn expiry_from_epoch_ms(ms: i64) -> Expiry {
    if ms < 0 {
        return Expiry::Never;
    }
    let now = Instant::now();
    let now_ms = Utc::now().timestamp_millis();
    match u64::try_from(ms.saturating_sub(now_ms)) {
        Ok(remaining_ms) if remaining_ms > 0 => {
            Expiry::At(now + std::time::Duration::from_millis(remaining_ms))
        }
        // At or before the current wall clock: already expired.
        _ => Expiry::At(now),
    }
}
