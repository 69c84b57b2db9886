//! Snapshot formats shared by the caches.
//!
//! Two on-disk representations exist:
//!
//! - **Binary** ([`binary`]) — a length-prefixed record stream: a `u64`
//!   little-endian entry count, then per entry a `u64` LE key length, the key
//!   bytes, a `u64` LE value length, and the value bytes. Entry order is
//!   meaningful (recency order for `LruCache`, insertion order for
//!   `ResourceCache`). Expiration deadlines are **not** persisted; entries
//!   loaded from a binary snapshot never expire.
//! - **JSON** ([`json`]) — an object mapping each key to
//!   `{ "value": <serializer output>, "expiry_ms": <i64> }`, where
//!   `expiry_ms` is wall-clock milliseconds since the Unix epoch and `-1`
//!   means the entry never expires. Deadlines are restored on load; one
//!   already in the past loads as an expired entry.
//!
//! [`codec`] provides ready-made bincode serializers for value types that
//! implement serde's traits.

pub mod binary;
pub mod codec;
pub mod json;
