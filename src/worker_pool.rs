//! Fixed pool of worker threads consuming a FIFO of type-erased jobs,
//! each returning a future fulfilled on completion.

use futures::channel::oneshot;
use std::thread::JoinHandle;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A fixed-size thread pool with a single global FIFO job queue.
///
/// Workers block on the channel; `stop` closes it so every blocked
/// `recv` wakes with a disconnect error and each worker thread exits its
/// loop and can be joined.
pub struct WorkerPool {
    sender: flume::Sender<Job>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `num_threads` workers (falls back to 1 if 0 is passed, since
    /// a pool with no workers can never make progress).
    #[must_use]
    pub fn new(num_threads: usize) -> Self {
        let num_threads = num_threads.max(1);
        let (sender, receiver) = flume::unbounded::<Job>();

        let workers = (0..num_threads)
            .map(|idx| {
                let receiver = receiver.clone();
                std::thread::Builder::new()
                    .name(format!("weave-worker-{idx}"))
                    .spawn(move || {
                        while let Ok(job) = receiver.recv() {
                            job();
                        }
                    })
                    .expect("failed to spawn worker thread")
            })
            .collect();

        Self { sender, workers }
    }

    /// Spawns a pool sized to the available hardware concurrency, or to
    /// `min_threads` if that's configured and larger.
    #[must_use]
    pub fn with_hardware_concurrency(min_threads: Option<usize>) -> Self {
        let hw = std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(4);
        Self::new(min_threads.map_or(hw, |min| hw.max(min)))
    }

    /// Wraps `job` into a packaged task, pushes it onto the FIFO, and
    /// returns a future resolved with the job's return value once a
    /// worker has run it.
    ///
    /// `job` runs inside [`std::panic::catch_unwind`]: a panic is logged
    /// and the returned future resolves to `Canceled` rather than
    /// unwinding through the worker thread's dispatch loop. A panicking
    /// job never kills its worker — the thread goes straight back to
    /// waiting for the next job.
    ///
    /// Enqueueing after [`WorkerPool::stop`] silently drops the job; the
    /// returned future never resolves. Callers are expected to honor the
    /// pool's lifecycle, per the contract this type was modeled on.
    pub fn enqueue<F, R>(&self, job: F) -> oneshot::Receiver<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let wrapped: Job = Box::new(move || {
            match std::panic::catch_unwind(std::panic::AssertUnwindSafe(job)) {
                Ok(result) => {
                    let _ = tx.send(result);
                }
                Err(payload) => {
                    log::error!("worker pool job panicked: {}", panic_message(&payload));
                    // Dropping `tx` without sending resolves the
                    // receiver to `Canceled`; the worker thread is
                    // unaffected and moves on to its next job.
                }
            }
        });
        if self.sender.send(wrapped).is_err() {
            log::warn!("WorkerPool::enqueue called after stop; job dropped");
        }
        rx
    }

    /// Blocks the calling thread until `future` resolves, using a tiny
    /// inline executor (this pool makes no assumption about an ambient
    /// async runtime being present).
    pub fn block_on<F: std::future::Future>(future: F) -> F::Output {
        pollster::block_on(future)
    }

    /// Sets the pool to stop accepting work, wakes every worker, and
    /// joins all worker threads. Idempotent only in the sense that
    /// calling it twice on an already-stopped pool is a programmer
    /// error (the second call operates on an empty worker list).
    pub fn stop(&mut self) {
        // Dropping every sender clone causes `recv` to return `Err` in
        // each worker, unwinding their loops; we only hold one sender, so
        // replacing it with a disconnected channel achieves the same.
        let (disconnected_tx, _disconnected_rx) = flume::bounded::<Job>(0);
        self.sender = disconnected_tx;
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

/// Best-effort extraction of a human-readable message from a
/// `catch_unwind` payload — panics carry either a `&str` or a `String`
/// in the overwhelming majority of cases (`panic!`, `assert!`, `.expect`).
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;

    #[test]
    fn enqueue_runs_job_and_resolves_future() {
        let pool = WorkerPool::new(2);
        let rx = pool.enqueue(|| 2 + 2);
        let result = WorkerPool::block_on(rx).unwrap();
        assert_eq!(result, 4);
    }

    #[test]
    fn concurrent_jobs_all_complete() {
        let pool = WorkerPool::new(4);
        let counter = Arc::new(AtomicI32::new(0));
        let receivers: Vec<_> = (0..100)
            .map(|_| {
                let counter = counter.clone();
                pool.enqueue(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();
        for rx in receivers {
            WorkerPool::block_on(rx).unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 100);
    }

    #[test]
    fn a_panicking_job_does_not_kill_its_worker() {
        let pool = WorkerPool::new(1);
        let rx = pool.enqueue(|| -> i32 { panic!("boom") });
        assert!(WorkerPool::block_on(rx).is_err());

        // Same single-worker pool: if the panic had killed the worker
        // thread, this job would never run and `block_on` would hang
        // forever instead of returning.
        let rx = pool.enqueue(|| 2 + 2);
        assert_eq!(WorkerPool::block_on(rx).unwrap(), 4);
    }

    #[test]
    fn stop_joins_all_workers() {
        let mut pool = WorkerPool::new(3);
        assert_eq!(pool.workers.len(), 3);
        pool.stop();
        assert!(pool.workers.is_empty());
    }
}
