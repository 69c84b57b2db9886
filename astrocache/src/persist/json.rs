//! JSON snapshot encoding for `ResourceCache`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// One persisted entry: the serializer's output plus the expiration deadline
/// as epoch milliseconds (`-1` = never expires).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonEntry {
    /// Serialized value, as produced by the caller's `to_json`.
    pub value: serde_json::Value,
    /// Wall-clock deadline in milliseconds since the Unix epoch, `-1` for
    /// "never".
    pub expiry_ms: i64,
}

/// Writes the entries as a single JSON object keyed by cache key.
pub fn write_snapshot(path: &Path, entries: Vec<(String, JsonEntry)>) -> Result<(), CacheError> {
    let mut object = serde_json::Map::with_capacity(entries.len());
    for (key, entry) in entries {
        let value = serde_json::to_value(entry)
            .map_err(|error| CacheError::Serializer(Box::new(error)))?;
        object.insert(key, value);
    }
    let text = serde_json::to_string_pretty(&object)
        .map_err(|error| CacheError::Serializer(Box::new(error)))?;
    fs::write(path, text)?;
    Ok(())
}

/// Reads a JSON snapshot back into `(key, entry)` pairs.
pub fn read_snapshot(path: &Path) -> Result<Vec<(String, JsonEntry)>, CacheError> {
    let text = fs::read_to_string(path)?;
    let object: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&text).map_err(|error| CacheError::Corrupt(error.to_string()))?;
    object
        .into_iter()
        .map(|(key, value)| {
            serde_json::from_value::<JsonEntry>(value)
                .map(|entry| (key, entry))
                .map_err(|error| CacheError::Corrupt(error.to_string()))
        })
        .collect()
}
