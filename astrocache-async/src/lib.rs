#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Combinators over groups of futures.
///
/// [`when_all`] collects a vector of homogeneous futures in input order;
/// [`join`], [`join3`], and [`join4`] produce tuple-valued futures over
/// heterogeneous inputs. All of them fail fast with the first error
/// encountered.
pub mod combine;

/// Error outcomes ([`TaskError`]) and panic capture.
pub mod error;

/// The consumer handle: [`Future`], plus [`ready`], [`spawn`], and
/// [`try_spawn`] constructors.
pub mod future;

/// The shared worker pool behind continuations and offloaded operations.
pub mod pool;

/// The producer handle: [`Promise`].
pub mod promise;

/// A callable bundled with its promise: [`PackagedTask`].
pub mod task;

mod state;

pub use combine::{join, join3, join4, when_all, when_all_timeout};
pub use error::TaskError;
pub use future::{Future, ready, spawn, try_spawn};
pub use promise::Promise;
pub use task::PackagedTask;
