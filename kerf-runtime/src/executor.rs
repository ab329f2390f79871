//! Worker launch strategies.
//!
//! A worker may run on whatever concurrency primitive the host provides;
//! [`Executor`] is the seam. The default [`ThreadExecutor`] dedicates one
//! named OS thread per drain period, which keeps idle actors free of any
//! execution context. [`PoolExecutor`] instead routes drain tasks through a
//! fixed pool of threads fed by a shared injector queue — observable only in
//! throughput, since tasks are created under the same lifecycle rules either
//! way.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_deque::{Injector, Steal};

use crate::error::{Error, Result};

/// A unit of worker execution: one full drain period for one inbox.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Strategy for binding an execution context to a drain task.
pub trait Executor: Send + Sync + 'static {
    /// Runs `task` on an execution context of the executor's choosing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerSpawn`] when the host refuses to provide an
    /// execution context.
    fn execute(&self, task: Task) -> Result<()>;
}

/// Maximum number of pool worker threads.
pub const MAX_WORKERS: usize = 256;

/// Park timeout — pool workers recheck the queue and the shutdown flag at
/// this interval.
const PARK_TIMEOUT: Duration = Duration::from_millis(10);

/// Process-global executor, installed once and never replaced.
static EXECUTOR: OnceLock<Box<dyn Executor>> = OnceLock::new();

/// Installs the process-global executor.
///
/// Must be called before the first send; afterwards (or on a second call)
/// the installation fails. When never called, the runtime lazily defaults
/// to a [`ThreadExecutor`].
///
/// # Errors
///
/// Returns [`Error::ExecutorInstalled`] if an executor is already in place.
pub fn install_executor<E: Executor>(executor: E) -> Result<()> {
    EXECUTOR
        .set(Box::new(executor))
        .map_err(|_| Error::ExecutorInstalled)
}

/// The installed executor, defaulting to a [`ThreadExecutor`].
pub(crate) fn global() -> &'static dyn Executor {
    EXECUTOR
        .get_or_init(|| Box::new(ThreadExecutor::new()))
        .as_ref()
}

// ── Thread-per-drain executor ───────────────────────────────────────────

/// One named OS thread per drain period.
///
/// The simplest strategy, and the one that most literally matches the
/// worker lifecycle: a worker exists exactly while its inbox is non-empty.
#[derive(Debug, Default)]
pub struct ThreadExecutor(());

impl ThreadExecutor {
    /// Creates the thread-per-drain executor.
    #[must_use]
    pub fn new() -> Self {
        Self(())
    }
}

impl Executor for ThreadExecutor {
    fn execute(&self, task: Task) -> Result<()> {
        static WORKER_SERIAL: AtomicU64 = AtomicU64::new(0);
        let serial = WORKER_SERIAL.fetch_add(1, Ordering::Relaxed);
        thread::Builder::new()
            .name(format!("kerf-worker-{serial}"))
            .spawn(task)?;
        Ok(())
    }
}

// ── Pooled executor ─────────────────────────────────────────────────────

/// Shared state between the pool handle and its worker threads.
struct PoolShared {
    /// Drain tasks awaiting a thread.
    injector: Injector<Task>,
    /// Set once; workers observe it and exit.
    shutdown: AtomicBool,
    /// Per-worker parking primitives, one per thread to avoid contending on
    /// a single lock.
    parkers: Vec<Parker>,
    /// Round-robin wake distribution across workers.
    wake_counter: AtomicU64,
}

/// Per-worker parking primitive.
struct Parker {
    mutex: Mutex<()>,
    cond: Condvar,
}

/// Fixed pool of worker threads over a shared injector queue.
///
/// Sized from the `KERF_WORKERS` environment variable when set, otherwise
/// from the machine's available parallelism. Dropping the pool signals
/// shutdown and joins every thread; a task still running keeps its thread
/// until it finishes.
///
/// Drain tasks have no thread affinity, so the pool needs no per-worker
/// deques or stealing — the injector alone distributes work.
pub struct PoolExecutor {
    shared: Arc<PoolShared>,
    handles: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for PoolExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolExecutor")
            .field("workers", &self.handles.len())
            .finish_non_exhaustive()
    }
}

impl Default for PoolExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolExecutor {
    /// Creates a pool sized from `KERF_WORKERS` or the machine's available
    /// parallelism.
    #[must_use]
    pub fn new() -> Self {
        Self::with_workers(worker_count_from_env())
    }

    /// Creates a pool with an explicit worker count, clamped to
    /// `1..=`[`MAX_WORKERS`].
    #[must_use]
    pub fn with_workers(count: usize) -> Self {
        let count = count.clamp(1, MAX_WORKERS);

        let shared = Arc::new(PoolShared {
            injector: Injector::new(),
            shutdown: AtomicBool::new(false),
            parkers: (0..count)
                .map(|_| Parker {
                    mutex: Mutex::new(()),
                    cond: Condvar::new(),
                })
                .collect(),
            wake_counter: AtomicU64::new(0),
        });

        let mut handles = Vec::with_capacity(count);
        for id in 0..count {
            let shared = Arc::clone(&shared);
            let Ok(handle) = thread::Builder::new()
                .name(format!("kerf-pool-{id}"))
                .spawn(move || pool_loop(id, &shared))
            else {
                continue;
            };
            handles.push(handle);
        }

        Self { shared, handles }
    }

    /// Signals shutdown, wakes all parked workers, and joins every thread.
    pub fn shutdown(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        for parker in &self.shared.parkers {
            parker.cond.notify_one();
        }
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for PoolExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Executor for PoolExecutor {
    fn execute(&self, task: Task) -> Result<()> {
        if self.shared.shutdown.load(Ordering::Acquire) {
            return Err(Error::WorkerSpawn(std::io::Error::other(
                "pool executor is shut down",
            )));
        }
        self.shared.injector.push(task);

        // Wake one worker, round-robin so the same thread is not always
        // the one woken.
        #[expect(
            clippy::cast_possible_truncation,
            reason = "modulo by the worker count keeps the index within usize range"
        )]
        let idx = (self.shared.wake_counter.fetch_add(1, Ordering::Relaxed)
            % self.shared.parkers.len() as u64) as usize;
        self.shared.parkers[idx].cond.notify_one();
        Ok(())
    }
}

/// Main loop executed by each pool worker thread.
fn pool_loop(id: usize, shared: &PoolShared) {
    while !shared.shutdown.load(Ordering::Acquire) {
        if let Some(task) = steal_task(&shared.injector) {
            task();
            continue;
        }

        // Park until notified or timeout, then recheck.
        let parker = &shared.parkers[id];
        let guard = match parker.mutex.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        };
        if shared.shutdown.load(Ordering::Acquire) {
            break;
        }
        let _ = parker.cond.wait_timeout(guard, PARK_TIMEOUT);
    }
}

/// Takes one task from the injector, retrying on contention.
fn steal_task(injector: &Injector<Task>) -> Option<Task> {
    loop {
        match injector.steal() {
            Steal::Success(task) => return Some(task),
            Steal::Empty => return None,
            Steal::Retry => {}
        }
    }
}

/// Worker count from `KERF_WORKERS`, validated and clamped.
fn worker_count_from_env() -> usize {
    let default_count = thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(4);

    match std::env::var("KERF_WORKERS") {
        Ok(val) => match val.parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => {
                tracing::warn!(value = %val, "invalid KERF_WORKERS, using default");
                default_count
            }
        },
        Err(_) => default_count,
    }
    .clamp(1, MAX_WORKERS)
}
