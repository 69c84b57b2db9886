//! Combinators over groups of futures.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::TaskError;
use crate::future::Future;
use crate::state::SharedState;

struct Gather<T> {
    slots: Vec<Option<T>>,
    remaining: usize,
    finished: bool,
}

/// Resolves once every input future has a value, collecting the values in
/// input order. The first error encountered settles the combined future with
/// that error; remaining inputs are left untouched. An empty input resolves
/// immediately with an empty vector.
pub fn when_all<T>(futures: Vec<Future<T>>) -> Future<Vec<T>>
where
    T: Clone + Send + 'static,
{
    let count = futures.len();
    if count == 0 {
        return Future::from_state(SharedState::settled(Ok(Vec::new())));
    }
    let state = SharedState::new();
    let gather = Arc::new(Mutex::new(Gather {
        slots: (0..count).map(|_| None).collect(),
        remaining: count,
        finished: false,
    }));
    for (index, future) in futures.iter().enumerate() {
        let gather = Arc::clone(&gather);
        let state = Arc::clone(&state);
        future.state.on_outcome(Box::new(move |outcome| {
            let mut inner = gather.lock();
            if inner.finished {
                return;
            }
            match outcome {
                Ok(value) => {
                    inner.slots[index] = Some(value.clone());
                    inner.remaining -= 1;
                    if inner.remaining == 0 {
                        inner.finished = true;
                        let mut values = Vec::with_capacity(inner.slots.len());
                        for slot in inner.slots.iter_mut() {
                            if let Some(value) = slot.take() {
                                values.push(value);
                            }
                        }
                        drop(inner);
                        let _ = state.complete(Ok(values));
                    }
                }
                Err(error) => {
                    inner.finished = true;
                    let error = error.clone();
                    drop(inner);
                    let _ = state.complete(Err(error));
                }
            }
        }));
    }
    Future::from_state(state)
}

/// Like [`when_all`], but each input is waited on with `timeout`; an input
/// that fails to settle in time settles the combined future with
/// [`TaskError::Timeout`]. The inputs themselves are not cancelled.
pub fn when_all_timeout<T>(futures: Vec<Future<T>>, timeout: Duration) -> Future<Vec<T>>
where
    T: Clone + Send + 'static,
{
    let state = SharedState::new();
    let result = Future::from_state(Arc::clone(&state));
    let target = Arc::clone(&state);
    let spawned = thread::Builder::new()
        .name("astrocache-when-all".to_string())
        .spawn(move || {
            let mut values = Vec::with_capacity(futures.len());
            for future in &futures {
                match future.state.wait_deadline(timeout) {
                    Ok(value) => values.push(value),
                    Err(error) => {
                        let _ = target.complete(Err(error));
                        return;
                    }
                }
            }
            let _ = target.complete(Ok(values));
        });
    if let Err(error) = spawned {
        let _ = state.complete(Err(TaskError::failed(error)));
    }
    result
}

struct Pair<A, B> {
    left: Option<A>,
    right: Option<B>,
    finished: bool,
}

/// Resolves once both inputs have values; the first error encountered wins.
pub fn join<A, B>(left: &Future<A>, right: &Future<B>) -> Future<(A, B)>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
{
    let state = SharedState::new();
    let pair = Arc::new(Mutex::new(Pair {
        left: None,
        right: None,
        finished: false,
    }));

    {
        let pair = Arc::clone(&pair);
        let state = Arc::clone(&state);
        left.state.on_outcome(Box::new(move |outcome| match outcome {
            Ok(value) => {
                let mut inner = pair.lock();
                if inner.finished {
                    return;
                }
                inner.left = Some(value.clone());
                settle_pair(inner, &state);
            }
            Err(error) => fail_pair(&pair, &state, error),
        }));
    }
    {
        let pair = Arc::clone(&pair);
        let state = Arc::clone(&state);
        right.state.on_outcome(Box::new(move |outcome| match outcome {
            Ok(value) => {
                let mut inner = pair.lock();
                if inner.finished {
                    return;
                }
                inner.right = Some(value.clone());
                settle_pair(inner, &state);
            }
            Err(error) => fail_pair(&pair, &state, error),
        }));
    }
    Future::from_state(state)
}

fn settle_pair<A, B>(
    mut inner: parking_lot::MutexGuard<'_, Pair<A, B>>,
    state: &Arc<SharedState<(A, B)>>,
) where
    A: Clone,
    B: Clone,
{
    if inner.left.is_some() && inner.right.is_some() {
        inner.finished = true;
        let left = inner.left.take();
        let right = inner.right.take();
        drop(inner);
        if let (Some(a), Some(b)) = (left, right) {
            let _ = state.complete(Ok((a, b)));
        }
    }
}

fn fail_pair<A, B>(pair: &Mutex<Pair<A, B>>, state: &Arc<SharedState<(A, B)>>, error: &TaskError)
where
    A: Clone,
    B: Clone,
{
    let mut inner = pair.lock();
    if inner.finished {
        return;
    }
    inner.finished = true;
    drop(inner);
    let _ = state.complete(Err(error.clone()));
}

/// Three-way [`join`].
pub fn join3<A, B, C>(a: &Future<A>, b: &Future<B>, c: &Future<C>) -> Future<(A, B, C)>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
    C: Clone + Send + 'static,
{
    join(&join(a, b), c).then(|((a, b), c)| (a, b, c))
}

/// Four-way [`join`].
pub fn join4<A, B, C, D>(
    a: &Future<A>,
    b: &Future<B>,
    c: &Future<C>,
    d: &Future<D>,
) -> Future<(A, B, C, D)>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
    C: Clone + Send + 'static,
    D: Clone + Send + 'static,
{
    join(&join(a, b), &join(c, d)).then(|((a, b), (c, d))| (a, b, c, d))
}
