// Worker pool for asynchronous searches.
//
// A `WorkerPool` wraps a `rayon::ThreadPool`. Hosts either build their own
// and hand it to `PathfinderBuilder::with_pool`, or rely on the process-wide
// pool returned by `global()`.
//
// Process-wide lifecycle:
// - `initialize(threads)` installs the global pool exactly once. A second
//   call (or a call after `global()` already created the default pool)
//   fails with `AlreadyInitialized`.
// - `global()` returns the installed pool, creating one with rayon's default
//   thread count on first use if nobody called `initialize`.
// - Dropping the last handle to a pool lets its threads exit once queued
//   jobs finish. The global pool lives until process exit.
//
// Jobs must not panic: rayon aborts the process on an uncaught panic in a
// spawned job, so callers catch unwinds at the job boundary (see
// `search.rs`).

use crate::error::{PathfindingError, Result};
use once_cell::sync::OnceCell;
use std::sync::Arc;

static GLOBAL: OnceCell<Arc<WorkerPool>> = OnceCell::new();

#[derive(Debug)]
pub struct WorkerPool {
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    /// Build a pool with `threads` workers. 0 picks rayon's default (one per
    /// logical CPU).
    pub fn new(threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("tickpath-worker-{i}"))
            .build()
            .map_err(|e| PathfindingError::PoolBuild(e.to_string()))?;
        tracing::info!(threads = pool.current_num_threads(), "worker pool started");
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Queue a job. Returns immediately.
    pub fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.spawn(job);
    }

    /// Release this handle. Queued jobs still run; threads exit once the
    /// last handle is gone and the queue drains.
    pub fn shutdown(self) {
        tracing::info!(threads = self.threads(), "worker pool shutting down");
    }
}

/// Install the process-wide pool.
pub fn initialize(threads: usize) -> Result<Arc<WorkerPool>> {
    if GLOBAL.get().is_some() {
        return Err(PathfindingError::AlreadyInitialized);
    }
    let pool = Arc::new(WorkerPool::new(threads)?);
    GLOBAL
        .set(Arc::clone(&pool))
        .map_err(|_| PathfindingError::AlreadyInitialized)?;
    Ok(pool)
}

/// The process-wide pool, created with default settings on first use.
pub fn global() -> Result<Arc<WorkerPool>> {
    GLOBAL
        .get_or_try_init(|| WorkerPool::new(0).map(Arc::new))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn spawned_jobs_run() {
        let pool = WorkerPool::new(2).unwrap();
        assert_eq!(pool.threads(), 2);
        let (tx, rx) = mpsc::channel();
        for i in 0..8 {
            let tx = tx.clone();
            pool.spawn(move || tx.send(i).unwrap());
        }
        drop(tx);
        let mut seen: Vec<i32> = rx.iter().collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn shutdown_lets_queued_jobs_finish() {
        let pool = WorkerPool::new(1).unwrap();
        let (tx, rx) = mpsc::channel();
        pool.spawn(move || tx.send(42).unwrap());
        pool.shutdown();
        assert_eq!(rx.recv_timeout(std::time::Duration::from_secs(10)), Ok(42));
    }

    #[test]
    fn second_initialize_fails() {
        // Whichever of these runs first wins; every later call must fail.
        let _ = global().unwrap();
        assert!(matches!(
            initialize(1),
            Err(PathfindingError::AlreadyInitialized)
        ));
        assert!(Arc::ptr_eq(&global().unwrap(), &global().unwrap()));
    }
}
