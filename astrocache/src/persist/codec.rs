//! Bincode value codec for serde-compatible keys and values.
//!
//! `LruCache` persistence uses these directly; `ResourceCache` callers can
//! hand them in as ready-made serializer closures:
//!
//! ```ignore
//! cache.write_to_file("values.bin", |value| codec::encode(value))?;
//! cache.read_from_file("values.bin", |bytes| codec::decode(bytes))?;
//! ```

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CacheError;

/// Encodes `value` with bincode's standard configuration.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CacheError> {
    bincode::serde::encode_to_vec(value, bincode::config::standard())
        .map_err(|error| CacheError::Serializer(Box::new(error)))
}

/// Decodes a value previously produced by [`encode`].
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CacheError> {
    let (value, consumed) =
        bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|error| CacheError::Serializer(Box::new(error)))?;
    if consumed != bytes.len() {
        return Err(CacheError::Corrupt(format!(
            "{} trailing bytes after value",
            bytes.len() - consumed
        )));
    }
    Ok(value)
}
