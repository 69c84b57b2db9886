//! Length-prefixed binary snapshot encoding.

use std::fs;
use std::path::Path;

use crate::error::CacheError;

/// One serialized entry: `(key bytes, value bytes)`.
pub type Record = (Vec<u8>, Vec<u8>);

/// Writes `records` to `path` in snapshot framing, replacing any existing
/// file.
pub fn write_snapshot(path: &Path, records: &[Record]) -> Result<(), CacheError> {
    let payload: usize = records.iter().map(|(k, v)| 16 + k.len() + v.len()).sum();
    let mut buffer = Vec::with_capacity(8 + payload);
    buffer.extend_from_slice(&(records.len() as u64).to_le_bytes());
    for (key, value) in records {
        buffer.extend_from_slice(&(key.len() as u64).to_le_bytes());
        buffer.extend_from_slice(key);
        buffer.extend_from_slice(&(value.len() as u64).to_le_bytes());
        buffer.extend_from_slice(value);
    }
    fs::write(path, buffer)?;
    Ok(())
}

/// Reads a snapshot back; every length field is validated against the
/// remaining input before it is trusted.
pub fn read_snapshot(path: &Path) -> Result<Vec<Record>, CacheError> {
    let data = fs::read(path)?;
    let mut cursor = 0usize;
    let count = read_length(&data, &mut cursor)?;
    let mut records = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        let key = read_chunk(&data, &mut cursor)?;
        let value = read_chunk(&data, &mut cursor)?;
        records.push((key, value));
    }
    if cursor != data.len() {
        return Err(CacheError::Corrupt(format!(
            "{} trailing bytes after final entry",
            data.len() - cursor
        )));
    }
    Ok(records)
}

fn read_length(data: &[u8], cursor: &mut usize) -> Result<usize, CacheError> {
    let end = cursor
        .checked_add(8)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| CacheError::Corrupt("truncated length field".to_string()))?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&data[*cursor..end]);
    *cursor = end;
    usize::try_from(u64::from_le_bytes(raw))
        .map_err(|_| CacheError::Corrupt("length field exceeds address space".to_string()))
}

fn read_chunk(data: &[u8], cursor: &mut usize) -> Result<Vec<u8>, CacheError> {
    let length = read_length(data, cursor)?;
    let end = cursor
        .checked_add(length)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| CacheError::Corrupt("chunk length exceeds input".to_string()))?;
    let chunk = data[*cursor..end].to_vec();
    *cursor = end;
    Ok(chunk)
}
