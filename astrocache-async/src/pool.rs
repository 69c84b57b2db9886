//! The worker pool that runs continuations and offloaded operations.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::OnceLock;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::debug;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-size pool of worker threads draining a shared job queue.
///
/// Dropping the pool closes the queue and joins every worker; jobs already
/// queued are drained first. A panicking job is caught and logged so it
/// cannot take a worker down with it.
pub struct WorkerPool {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Starts a pool with `threads` workers (minimum one).
    pub fn new(threads: usize) -> Self {
        let (sender, receiver) = unbounded::<Job>();
        let workers = (0..threads.max(1))
            .map(|index| {
                let receiver: Receiver<Job> = receiver.clone();
                thread::Builder::new()
                    .name(format!("astrocache-worker-{index}"))
                    .spawn(move || {
                        while let Ok(job) = receiver.recv() {
                            if catch_unwind(AssertUnwindSafe(job)).is_err() {
                                debug!("worker job panicked; discarding");
                            }
                        }
                    })
                    .expect("worker thread spawn failed")
            })
            .collect();
        WorkerPool {
            sender: Some(sender),
            workers,
        }
    }

    /// Queues a job for execution on some worker.
    pub fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Some(sender) = &self.sender {
            let _ = sender.send(Box::new(job));
        }
    }

    /// Number of worker threads.
    pub fn thread_count(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the channel lets workers drain the queue and exit.
        self.sender.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                debug!("worker thread terminated abnormally");
            }
        }
    }
}

static SHARED: OnceLock<WorkerPool> = OnceLock::new();

/// The process-wide pool backing `then`, `spawn`, and the caches'
/// asynchronous operations. Started lazily, sized by available parallelism,
/// and alive for the life of the process.
pub fn shared() -> &'static WorkerPool {
    SHARED.get_or_init(|| WorkerPool::new(default_threads()))
}

/// Queues a job on the shared pool.
pub fn execute<F>(job: F)
where
    F: FnOnce() + Send + 'static,
{
    shared().spawn(job);
}

fn default_threads() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .max(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn drop_drains_queued_jobs() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pool = WorkerPool::new(2);
        for _ in 0..16 {
            let counter = counter.clone();
            pool.spawn(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        drop(pool);
        assert_eq!(counter.load(Ordering::SeqCst), 16);
    }

    #[test]
    fn panicking_job_does_not_kill_the_worker() {
        let pool = WorkerPool::new(1);
        pool.spawn(|| panic!("boom"));
        let counter = Arc::new(AtomicUsize::new(0));
        let probe = counter.clone();
        pool.spawn(move || {
            probe.fetch_add(1, Ordering::SeqCst);
        });
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
