//! The consumer side of a shared state.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{TaskError, run_catching};
use crate::pool;
use crate::state::SharedState;

/// A shareable, blocking handle to a value produced elsewhere.
///
/// Cloning a `Future` yields another handle to the same shared state; reads
/// do not consume the value, so every waiter receives its own clone. This is
/// a thread-world primitive — [`wait`](Future::wait) parks the calling thread
/// on a condition variable — and is unrelated to the `std::future::Future`
/// trait.
///
/// Chaining with [`then`](Future::then) registers a continuation: the
/// callable runs on the shared worker pool once this future settles, and its
/// result settles the returned future. Cancellation and errors short-circuit
/// the chain without invoking the callable.
///
/// # Example
///
/// ```
/// use astrocache_async::Promise;
///
/// let promise = Promise::new();
/// let future = promise.future();
/// let doubled = future.then(|x: i32| x * 2);
/// promise.set_value(21).unwrap();
/// assert_eq!(doubled.wait().unwrap(), 42);
/// assert_eq!(future.wait().unwrap(), 21);
/// ```
///
/// A future of `()` is the "void" shape used by fire-and-forget operations;
/// completion itself is the signal.
pub struct Future<T> {
    pub(crate) state: Arc<SharedState<T>>,
}

impl<T> Clone for Future<T> {
    fn clone(&self) -> Self {
        Future {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> Future<T> {
    pub(crate) fn from_state(state: Arc<SharedState<T>>) -> Self {
        Future { state }
    }

    /// True once a value or an error has been stored, or after cancellation.
    pub fn is_done(&self) -> bool {
        self.state.is_done()
    }

    /// Alias of [`is_done`](Future::is_done).
    pub fn is_ready(&self) -> bool {
        self.state.is_done()
    }

    /// True if this future has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }

    /// Cancels the future: waiters return [`TaskError::Cancelled`], pending
    /// continuations settle downstream states as cancelled, and callbacks
    /// registered afterwards never run with a value. A continuation already
    /// running is not interrupted; its result is discarded.
    pub fn cancel(&self) {
        self.state.cancel();
    }
}

impl<T: Clone + Send + 'static> Future<T> {
    /// Blocks until the future settles and returns the outcome.
    pub fn wait(&self) -> Result<T, TaskError> {
        self.state.wait()
    }

    /// Blocks up to `timeout`. On timeout the future is cancelled as a side
    /// effect and `None` is returned; a cancelled or failed future also
    /// yields `None`.
    pub fn wait_for(&self, timeout: Duration) -> Option<T> {
        match self.state.wait_deadline(timeout) {
            Ok(value) => Some(value),
            Err(TaskError::Timeout) => {
                self.cancel();
                None
            }
            Err(_) => None,
        }
    }

    /// Non-blocking peek at the settled outcome.
    pub fn try_result(&self) -> Option<Result<T, TaskError>> {
        self.state.peek()
    }

    /// The stored error, if the future settled with one.
    pub fn error(&self) -> Option<TaskError> {
        match self.state.peek() {
            Some(Err(error)) => Some(error),
            _ => None,
        }
    }

    /// Registers a completion callback invoked with a reference to the value.
    ///
    /// Callbacks run in registration order; one registered after settlement
    /// fires immediately on the calling thread. Error and cancelled outcomes
    /// do not invoke it.
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

    /// Chains `operation` to run on the worker pool after this future
    /// settles with a value. Errors and cancellation bypass `operation` and
    /// settle the returned future with the same outcome.
    pub fn then<U, F>(&self, operation: F) -> Future<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let downstream = SharedState::new();
        let target = Arc::clone(&downstream);
        self.state.on_outcome(Box::new(move |outcome| match outcome {
            Ok(value) => {
                let value = value.clone();
                pool::execute(move || {
                    let result = run_catching(move || operation(value));
                    let _ = target.complete(result);
                });
            }
            Err(error) => {
                let _ = target.complete(Err(error.clone()));
            }
        }));
        Future::from_state(downstream)
    }

    /// Maps the error outcome through `handler`; value outcomes pass through
    /// untouched. The handler runs on the worker pool.
    pub fn catching<F>(&self, handler: F) -> Future<T>
    where
        F: FnOnce(TaskError) -> T + Send + 'static,
    {
        let downstream = SharedState::new();
        let target = Arc::clone(&downstream);
        self.state.on_outcome(Box::new(move |outcome| match outcome {
            Ok(value) => {
                let _ = target.complete(Ok(value.clone()));
            }
            Err(error) => {
                let error = error.clone();
                pool::execute(move || {
                    let result = run_catching(move || handler(error));
                    let _ = target.complete(result);
                });
            }
        }));
        Future::from_state(downstream)
    }

    /// Runs `operation` on the value once this future settles, retrying on
    /// failure up to `max_attempts` times; only the final failure is
    /// propagated. Upstream errors and cancellation bypass `operation`.
    pub fn retry<U, E, F>(&self, operation: F, max_attempts: usize) -> Future<U>
    where
        U: Clone + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
        F: Fn(T) -> Result<U, E> + Send + 'static,
    {
        let downstream = SharedState::new();
        let target = Arc::clone(&downstream);
        self.state.on_outcome(Box::new(move |outcome| match outcome {
            Ok(value) => {
                let value = value.clone();
                pool::execute(move || {
                    let attempts = max_attempts.max(1);
                    let mut last_error = TaskError::InvalidState;
                    for _ in 0..attempts {
                        match run_catching(|| operation(value.clone())) {
                            Ok(Ok(result)) => {
                                let _ = target.complete(Ok(result));
                                return;
                            }
                            Ok(Err(error)) => last_error = TaskError::failed(error),
                            Err(panicked) => last_error = panicked,
                        }
                    }
                    let _ = target.complete(Err(last_error));
                });
            }
            Err(error) => {
                let _ = target.complete(Err(error.clone()));
            }
        }));
        Future::from_state(downstream)
    }
}

/// An already-settled future holding `value`.
pub fn ready<T: Clone + Send + 'static>(value: T) -> Future<T> {
    Future::from_state(SharedState::settled(Ok(value)))
}

/// Runs `operation` on the shared worker pool and returns a future for its
/// result. A panic inside `operation` settles the future with
/// [`TaskError::Panicked`].
pub fn spawn<T, F>(operation: F) -> Future<T>
where
    T: Clone + Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    try_spawn(move || Ok(operation()))
}

/// Fallible variant of [`spawn`]: the operation's `Err` settles the future
/// directly.
pub fn try_spawn<T, F>(operation: F) -> Future<T>
where
    T: Clone + Send + 'static,
    F: FnOnce() -> Result<T, TaskError> + Send + 'static,
{
    let state = SharedState::new();
    let target = Arc::clone(&state);
    pool::execute(move || {
        let result = match run_catching(operation) {
            Ok(result) => result,
            Err(panicked) => Err(panicked),
        };
        let _ = target.complete(result);
    });
    Future::from_state(state)
}
