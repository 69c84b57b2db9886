//! Error types for cache operations.

use astrocache_async::TaskError;
use thiserror::Error;

/// Error type for cache operations.
///
/// Structural invariants hold under every error path: an operation either
/// completes atomically or leaves the cache unchanged. In particular,
/// persistence failures never mutate cache contents.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A non-blocking lock acquisition failed; the operation was not
    /// performed. Persistence uses try-locks so it cannot deadlock against
    /// in-flight cache operations.
    #[error("cache lock is held by another operation")]
    Busy,

    /// Underlying file operation failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A user-provided (de)serializer failed; the inner error is passed
    /// through unchanged.
    #[error("serializer failed: {0}")]
    Serializer(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A snapshot file is structurally malformed.
    #[error("malformed snapshot: {0}")]
    Corrupt(String),

    /// An asynchronous operation failed at the future layer.
    #[error(transparent)]
    Task(#[from] TaskError),
}
