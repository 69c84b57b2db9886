//! A callable bundled with the promise it settles.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{TaskError, run_catching};
use crate::future::Future;
use crate::state::SharedState;

type Callable<R, A> = Box<dyn FnOnce(A) -> R + Send>;

/// A one-shot callable whose invocation settles an internal promise.
///
/// [`invoke`](PackagedTask::invoke) runs the callable with the given
/// argument: a return value settles the future, a panic settles it with
/// [`TaskError::Panicked`], and a task cancelled beforehand short-circuits
/// with [`TaskError::Cancelled`]. The callable is consumed on first
/// invocation; a second invocation fails with [`TaskError::InvalidState`].
///
/// The argument type defaults to `()` for argumentless tasks.
///
/// # Example
///
/// ```
/// use astrocache_async::PackagedTask;
///
/// let task: PackagedTask<i32, i32> = PackagedTask::new(|x| x * 2);
/// let future = task.future();
/// task.invoke(5).unwrap();
/// assert_eq!(future.wait().unwrap(), 10);
/// ```
pub struct PackagedTask<R, A = ()> {
    callable: Mutex<Option<Callable<R, A>>>,
    state: Arc<SharedState<R>>,
}

impl<R, A> PackagedTask<R, A>
where
    R: Clone + Send + 'static,
{
    /// Wraps `callable` together with a fresh promise.
    pub fn new<F>(callable: F) -> Self
    where
        F: FnOnce(A) -> R + Send + 'static,
    {
        PackagedTask {
            callable: Mutex::new(Some(Box::new(callable))),
            state: SharedState::new(),
        }
    }

    /// Returns a consumer handle to the task's outcome.
    pub fn future(&self) -> Future<R> {
        Future::from_state(Arc::clone(&self.state))
    }

    /// Runs the callable and settles the future with its outcome.
    pub fn invoke(&self, args: A) -> Result<(), TaskError> {
        if self.state.is_cancelled() {
            return Err(TaskError::Cancelled);
        }
        let callable = self
            .callable
            .lock()
            .take()
            .ok_or(TaskError::InvalidState)?;
        let outcome = run_catching(move || callable(args));
        self.state.complete(outcome)
    }

    /// Registers a completion callback invoked with the produced value.
    pub fn on_complete<F>(&self, callback: F)
    where
        F: FnOnce(&R) + Send + 'static,
    {
        self.state.on_outcome(Box::new(move |outcome| {
            if let Ok(value) = outcome {
                callback(value);
            }
        }));
    }

    /// Marks the task cancelled; subsequent invocations short-circuit and
    /// waiters observe the cancelled outcome.
    pub fn cancel(&self) {
        self.state.cancel();
    }

    /// True if this task has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }
}

impl<R, A> Drop for PackagedTask<R, A> {
    fn drop(&mut self) {
        // A task dropped without being invoked would strand its waiters.
        self.state.abandon();
    }
}
