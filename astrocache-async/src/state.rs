//! The shared state behind a promise/future pair.
//!
//! One allocation holds the outcome slot, the cancelled flag, and the FIFO
//! continuation list; the producing `Promise` and every consuming `Future`
//! clone hold an `Arc` to it. There is no back-reference in either direction,
//! so the state is freed as soon as the last handle drops.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::TaskError;

/// Continuation invoked exactly once with the settled outcome.
pub(crate) type Continuation<T> = Box<dyn FnOnce(&Result<T, TaskError>) + Send>;

struct StateInner<T> {
    outcome: Option<Result<T, TaskError>>,
    cancelled: bool,
    continuations: Vec<Continuation<T>>,
}

pub(crate) struct SharedState<T> {
    inner: Mutex<StateInner<T>>,
    ready: Condvar,
}

impl<T> SharedState<T> {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(SharedState {
            inner: Mutex::new(StateInner {
                outcome: None,
                cancelled: false,
                continuations: Vec::new(),
            }),
            ready: Condvar::new(),
        })
    }

    pub(crate) fn is_done(&self) -> bool {
        let inner = self.inner.lock();
        inner.outcome.is_some() || inner.cancelled
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.inner.lock().cancelled
    }

    /// Marks the state cancelled, wakes all waiters, and drains pending
    /// continuations with a `Cancelled` outcome so downstream states settle.
    pub(crate) fn cancel(&self) {
        let drained = {
            let mut inner = self.inner.lock();
            if inner.cancelled {
                return;
            }
            inner.cancelled = true;
            self.ready.notify_all();
            std::mem::take(&mut inner.continuations)
        };
        let outcome = Err(TaskError::Cancelled);
        for continuation in drained {
            continuation(&outcome);
        }
    }

    /// Settles a still-pending state with `InvalidState` — the producer was
    /// dropped without ever populating it. Waiters must not hang forever on
    /// an abandoned promise.
    pub(crate) fn abandon(&self) {
        let drained = {
            let mut inner = self.inner.lock();
            if inner.outcome.is_some() || inner.cancelled {
                return;
            }
            inner.outcome = Some(Err(TaskError::InvalidState));
            self.ready.notify_all();
            std::mem::take(&mut inner.continuations)
        };
        let outcome = Err(TaskError::InvalidState);
        for continuation in drained {
            continuation(&outcome);
        }
    }
}

impl<T: Clone> SharedState<T> {
    /// State that is already settled, for `ready()` and empty combinators.
    pub(crate) fn settled(outcome: Result<T, TaskError>) -> Arc<Self> {
        Arc::new(SharedState {
            inner: Mutex::new(StateInner {
                outcome: Some(outcome),
                cancelled: false,
                continuations: Vec::new(),
            }),
            ready: Condvar::new(),
        })
    }

    /// Stores the outcome if the state is still pending, then wakes waiters
    /// and runs the registered continuations in FIFO order outside the lock.
    pub(crate) fn complete(&self, outcome: Result<T, TaskError>) -> Result<(), TaskError> {
        let (snapshot, drained) = {
            let mut inner = self.inner.lock();
            if inner.cancelled {
                return Err(TaskError::PromiseCancelled);
            }
            if inner.outcome.is_some() {
                return Err(TaskError::InvalidState);
            }
            let snapshot = outcome.clone();
            inner.outcome = Some(outcome);
            self.ready.notify_all();
            (snapshot, std::mem::take(&mut inner.continuations))
        };
        for continuation in drained {
            continuation(&snapshot);
        }
        Ok(())
    }

    /// Registers a continuation; fires it immediately when the state has
    /// already settled or been cancelled.
    pub(crate) fn on_outcome(&self, continuation: Continuation<T>) {
        let settled = {
            let mut inner = self.inner.lock();
            if inner.cancelled {
                Some(Err(TaskError::Cancelled))
            } else if let Some(outcome) = &inner.outcome {
                Some(outcome.clone())
            } else {
                inner.continuations.push(continuation);
                return;
            }
        };
        if let Some(outcome) = settled {
            continuation(&outcome);
        }
    }

    pub(crate) fn wait(&self) -> Result<T, TaskError> {
        let mut inner = self.inner.lock();
        loop {
            if inner.cancelled {
                return Err(TaskError::Cancelled);
            }
            if let Some(outcome) = &inner.outcome {
                return outcome.clone();
            }
            self.ready.wait(&mut inner);
        }
    }

    pub(crate) fn wait_deadline(&self, timeout: Duration) -> Result<T, TaskError> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        loop {
            if inner.cancelled {
                return Err(TaskError::Cancelled);
            }
            if let Some(outcome) = &inner.outcome {
                return outcome.clone();
            }
            if self.ready.wait_until(&mut inner, deadline).timed_out() {
                return Err(TaskError::Timeout);
            }
        }
    }

    pub(crate) fn peek(&self) -> Option<Result<T, TaskError>> {
        self.inner.lock().outcome.clone()
    }
}
