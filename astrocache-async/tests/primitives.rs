use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use astrocache_async::{
    PackagedTask, Promise, TaskError, join, join3, ready, spawn, try_spawn, when_all,
    when_all_timeout,
};

#[derive(Debug, thiserror::Error)]
#[error("load failed")]
struct LoadFailed;

#[test]
fn fresh_future_is_neither_done_nor_cancelled() {
    let promise: Promise<i32> = Promise::new();
    let future = promise.future();
    assert!(!future.is_done());
    assert!(!future.is_cancelled());
}

#[test]
fn then_chains_a_computation() {
    let promise = Promise::new();
    let future = promise.future();
    let chained = future.then(|value: i32| value + 1);

    promise.set_value(41).unwrap();
    assert_eq!(chained.wait().unwrap(), 42);
    assert_eq!(future.wait().unwrap(), 41);
    assert!(future.is_done());
    assert!(chained.is_done());
}

#[test]
fn wait_for_returns_value_set_by_another_thread() {
    let promise = Promise::new();
    let future = promise.future();

    thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        let _ = promise.set_value(42);
    });

    assert_eq!(future.wait_for(Duration::from_secs(2)), Some(42));
}

#[test]
fn wait_for_timeout_cancels_the_future() {
    let promise: Promise<i32> = Promise::new();
    let future = promise.future();

    assert_eq!(future.wait_for(Duration::from_millis(50)), None);
    assert!(future.is_cancelled());
    assert!(matches!(
        promise.set_value(1),
        Err(TaskError::PromiseCancelled)
    ));
}

#[test]
fn is_done_flips_on_set_value() {
    let promise = Promise::new();
    let future = promise.future();
    assert!(!future.is_done());
    promise.set_value(42).unwrap();
    assert!(future.is_done());
    assert!(future.is_ready());
}

#[test]
fn on_complete_fires_with_the_value() {
    let promise = Promise::new();
    let future = promise.future();
    let called = Arc::new(AtomicBool::new(false));

    let observed = called.clone();
    future.on_complete(move |value: &i32| {
        assert_eq!(*value, 42);
        observed.store(true, Ordering::SeqCst);
    });

    promise.set_value(42).unwrap();
    assert!(called.load(Ordering::SeqCst));
}

#[test]
fn on_complete_after_settlement_fires_immediately() {
    let future = ready(7);
    let called = Arc::new(AtomicBool::new(false));
    let observed = called.clone();
    future.on_complete(move |_| observed.store(true, Ordering::SeqCst));
    assert!(called.load(Ordering::SeqCst));
}

#[test]
fn callbacks_fire_in_registration_order() {
    let promise = Promise::new();
    let future = promise.future();
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

    for label in 0..3 {
        let order = order.clone();
        future.on_complete(move |_: &i32| order.lock().push(label));
    }

    promise.set_value(1).unwrap();
    assert_eq!(*order.lock(), vec![0, 1, 2]);
}

#[test]
fn error_outcome_is_observable() {
    let promise: Promise<i32> = Promise::new();
    let future = promise.future();
    promise.set_error(TaskError::failed(LoadFailed)).unwrap();

    assert!(future.error().is_some());
    assert!(matches!(future.wait(), Err(TaskError::Failed(_))));
}

#[test]
fn catching_maps_the_error_outcome() {
    let promise: Promise<i32> = Promise::new();
    let recovered = promise.future().catching(|_| -1);
    promise.set_error(TaskError::failed(LoadFailed)).unwrap();
    assert_eq!(recovered.wait().unwrap(), -1);
}

#[test]
fn catching_forwards_the_value_outcome() {
    let promise = Promise::new();
    let recovered = promise.future().catching(|_| -1);
    promise.set_value(9).unwrap();
    assert_eq!(recovered.wait().unwrap(), 9);
}

#[test]
fn retry_succeeds_after_transient_failures() {
    let promise = Promise::new();
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let retried = promise.future().retry(
        move |value: i32| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(LoadFailed)
            } else {
                Ok(value + 1)
            }
        },
        5,
    );
    promise.set_value(42).unwrap();
    assert_eq!(retried.wait().unwrap(), 43);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[test]
fn retry_propagates_only_the_final_failure() {
    let promise = Promise::new();
    let retried = promise
        .future()
        .retry(|_: i32| -> Result<i32, LoadFailed> { Err(LoadFailed) }, 3);
    promise.set_value(1).unwrap();
    assert!(matches!(retried.wait(), Err(TaskError::Failed(_))));
}

#[test]
fn spawn_runs_on_the_pool() {
    let future = spawn(|| 42);
    assert_eq!(future.wait().unwrap(), 42);
}

#[test]
fn spawned_panic_settles_as_panicked() {
    let future: astrocache_async::Future<i32> = spawn(|| panic!("exploded"));
    assert!(matches!(future.wait(), Err(TaskError::Panicked(_))));
}

#[test]
fn try_spawn_propagates_the_error() {
    let future: astrocache_async::Future<i32> =
        try_spawn(|| Err(TaskError::failed(LoadFailed)));
    assert!(matches!(future.wait(), Err(TaskError::Failed(_))));
}

#[test]
fn when_all_collects_in_input_order() {
    let futures = vec![ready(1), ready(2), ready(3)];
    assert_eq!(when_all(futures).wait().unwrap(), vec![1, 2, 3]);
}

#[test]
fn when_all_over_spawned_work_preserves_order() {
    let futures: Vec<_> = (0..5)
        .map(|i| {
            spawn(move || {
                thread::sleep(Duration::from_millis(10 * (5 - i as u64)));
                i
            })
        })
        .collect();
    assert_eq!(when_all(futures).wait().unwrap(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn when_all_fails_with_the_first_error() {
    let failing: Promise<i32> = Promise::new();
    let futures = vec![ready(1), failing.future(), ready(3)];
    let combined = when_all(futures);
    failing.set_error(TaskError::failed(LoadFailed)).unwrap();
    assert!(matches!(combined.wait(), Err(TaskError::Failed(_))));
}

#[test]
fn when_all_of_nothing_resolves_immediately() {
    let combined = when_all(Vec::<astrocache_async::Future<i32>>::new());
    assert_eq!(combined.wait().unwrap(), Vec::<i32>::new());
}

#[test]
fn when_all_timeout_fails_on_a_stuck_input() {
    let stuck: Promise<i32> = Promise::new();
    let combined = when_all_timeout(
        vec![ready(1), stuck.future()],
        Duration::from_millis(50),
    );
    assert!(matches!(combined.wait(), Err(TaskError::Timeout)));
}

#[test]
fn join_produces_a_tuple() {
    let left = Promise::new();
    let right = Promise::new();
    let combined = join(&left.future(), &right.future());
    left.set_value(1).unwrap();
    right.set_value("two".to_string()).unwrap();
    assert_eq!(combined.wait().unwrap(), (1, "two".to_string()));
}

#[test]
fn join3_flattens_the_tuple() {
    let combined = join3(&ready(1), &ready(2), &ready(3));
    assert_eq!(combined.wait().unwrap(), (1, 2, 3));
}

#[test]
fn cancelled_future_rejects_the_promise() {
    let promise: Promise<i32> = Promise::new();
    let future = promise.future();
    future.cancel();

    assert!(matches!(
        promise.set_value(7),
        Err(TaskError::PromiseCancelled)
    ));
    assert!(matches!(future.wait(), Err(TaskError::Cancelled)));
    assert!(future.is_cancelled());
}

#[test]
fn cancellation_short_circuits_then() {
    let promise: Promise<i32> = Promise::new();
    let future = promise.future();
    let chained = future.then(|value| value + 1);
    future.cancel();
    assert!(matches!(chained.wait(), Err(TaskError::Cancelled)));
}

#[test]
fn dropping_a_pending_promise_does_not_strand_waiters() {
    let promise: Promise<i32> = Promise::new();
    let future = promise.future();
    drop(promise);
    assert!(matches!(future.wait(), Err(TaskError::InvalidState)));
}

#[test]
fn promise_set_value_twice_is_invalid() {
    let promise = Promise::new();
    promise.set_value(1).unwrap();
    assert!(matches!(
        promise.set_value(2),
        Err(TaskError::InvalidState)
    ));
}

#[test]
fn void_promise_signals_completion() {
    let promise: Promise<()> = Promise::new();
    let future = promise.future();
    let called = Arc::new(AtomicBool::new(false));
    let observed = called.clone();
    promise.on_complete(move |_| observed.store(true, Ordering::SeqCst));

    promise.set_value(()).unwrap();
    future.wait().unwrap();
    assert!(called.load(Ordering::SeqCst));
}

#[test]
fn cancelled_void_promise_rejects_set_value() {
    let promise: Promise<()> = Promise::new();
    promise.cancel();
    assert!(promise.is_cancelled());
    assert!(matches!(
        promise.set_value(()),
        Err(TaskError::PromiseCancelled)
    ));
}

#[test]
fn packaged_task_starts_pending() {
    let task: PackagedTask<i32, i32> = PackagedTask::new(|x| x * 2);
    assert!(!task.future().is_ready());
}

#[test]
fn packaged_task_produces_its_result() {
    let task: PackagedTask<i32, i32> = PackagedTask::new(|x| x * 2);
    let future = task.future();
    task.invoke(5).unwrap();
    assert_eq!(future.wait().unwrap(), 10);
}

#[test]
fn packaged_task_without_arguments() {
    let executed = Arc::new(AtomicBool::new(false));
    let flag = executed.clone();
    let task: PackagedTask<()> = PackagedTask::new(move |_| {
        flag.store(true, Ordering::SeqCst);
    });
    let future = task.future();
    task.invoke(()).unwrap();
    future.wait().unwrap();
    assert!(executed.load(Ordering::SeqCst));
}

#[test]
fn packaged_task_callback_receives_the_result() {
    let task: PackagedTask<i32, i32> = PackagedTask::new(|x| x * 2);
    let called = Arc::new(AtomicBool::new(false));
    let observed = called.clone();
    task.on_complete(move |result| {
        assert_eq!(*result, 10);
        observed.store(true, Ordering::SeqCst);
    });
    task.invoke(5).unwrap();
    assert!(called.load(Ordering::SeqCst));
}

#[test]
fn cancelled_task_short_circuits_invocation() {
    let task: PackagedTask<i32, i32> = PackagedTask::new(|x| x * 2);
    task.cancel();
    let future = task.future();
    assert!(matches!(task.invoke(5), Err(TaskError::Cancelled)));
    assert!(matches!(future.wait(), Err(TaskError::Cancelled)));
    assert!(task.is_cancelled());
}

#[test]
fn second_invocation_is_invalid() {
    let task: PackagedTask<i32, i32> = PackagedTask::new(|x| x);
    task.invoke(1).unwrap();
    assert!(matches!(task.invoke(2), Err(TaskError::InvalidState)));
}

#[test]
fn panicking_task_settles_as_panicked() {
    let task: PackagedTask<i32, i32> = PackagedTask::new(|_| panic!("error"));
    let future = task.future();
    task.invoke(5).unwrap();
    assert!(matches!(future.wait(), Err(TaskError::Panicked(_))));
}
