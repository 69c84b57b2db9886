//! The producer side of a shared state.

use std::sync::Arc;

use crate::error::TaskError;
use crate::future::Future;
use crate::state::SharedState;

/// Single-assignment producer handle.
///
/// A promise transitions from pending to settled exactly once, via
/// [`set_value`](Promise::set_value) or [`set_error`](Promise::set_error).
/// Any number of [`Future`] handles can be taken before or after settlement.
/// Cancelling the promise blocks further transitions: a subsequent set
/// returns [`TaskError::PromiseCancelled`] and waiters observe the cancelled
/// outcome.
///
/// # Example
///
/// ```
/// use astrocache_async::{Promise, TaskError};
///
/// let promise = Promise::new();
/// let future = promise.future();
/// promise.set_value(5).unwrap();
/// assert_eq!(future.wait().unwrap(), 5);
///
/// let cancelled = Promise::new();
/// cancelled.cancel();
/// assert!(matches!(
///     cancelled.set_value(1),
///     Err(TaskError::PromiseCancelled)
/// ));
/// ```
pub struct Promise<T> {
    state: Arc<SharedState<T>>,
}

impl<T: Clone + Send + 'static> Promise<T> {
    /// Creates a pending promise.
    pub fn new() -> Self {
        Promise {
            state: SharedState::new(),
        }
    }

    /// Returns a consumer handle to this promise's shared state.
    pub fn future(&self) -> Future<T> {
        Future::from_state(Arc::clone(&self.state))
    }

    /// Stores the value, wakes waiters, and runs completion callbacks in
    /// registration order. Fails with [`TaskError::PromiseCancelled`] after
    /// cancellation and [`TaskError::InvalidState`] after a prior set.
    pub fn set_value(&self, value: T) -> Result<(), TaskError> {
        self.state.complete(Ok(value))
    }

    /// Stores an error outcome; same transition rules as
    /// [`set_value`](Promise::set_value).
    pub fn set_error(&self, error: TaskError) -> Result<(), TaskError> {
        self.state.complete(Err(error))
    }

    /// Registers a completion callback; fires immediately if already settled
    /// with a value.
    pub fn on_complete<F>(&self, callback: F)
    where
        F: FnOnce(&T) + Send + 'static,
    {
        self.state.on_outcome(Box::new(move |outcome| {
            if let Ok(value) = outcome {
                callback(value);
            }
        }));
    }

    /// Prevents any further value or error from being set.
    pub fn cancel(&self) {
        self.state.cancel();
    }

    /// True if this promise has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }
}

impl<T: Clone + Send + 'static> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        // A promise dropped while pending would strand its waiters.
        self.state.abandon();
    }
}
