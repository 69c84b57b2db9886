//! Error outcomes of futures, promises, and packaged tasks.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use thiserror::Error;

/// Failure outcome carried by a shared state.
///
/// The value channel is result-typed internally; waiters receive one of these
/// instead of a language-level exception. Errors are cloned to every waiter,
/// so user failures are wrapped in an [`Arc`].
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    /// The future was cancelled before or while waiting.
    #[error("future was cancelled")]
    Cancelled,

    /// A value or error was set after the promise was cancelled.
    #[error("promise was cancelled")]
    PromiseCancelled,

    /// The shared state was never populated or was already consumed,
    /// e.g. a packaged task invoked twice.
    #[error("shared state is uninitialized or already consumed")]
    InvalidState,

    /// A timed wait elapsed before completion.
    #[error("timed out waiting for completion")]
    Timeout,

    /// A loader or continuation returned an error.
    #[error("task failed: {0}")]
    Failed(Arc<dyn std::error::Error + Send + Sync>),

    /// A continuation panicked; the payload message is preserved.
    #[error("task panicked: {0}")]
    Panicked(String),
}

impl TaskError {
    /// Wraps a user error as a shareable failure outcome.
    pub fn failed<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        TaskError::Failed(Arc::new(error))
    }
}

/// Runs `f`, converting a panic into [`TaskError::Panicked`].
pub(crate) fn run_catching<R>(f: impl FnOnce() -> R) -> Result<R, TaskError> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        TaskError::Panicked(message)
    })
}
