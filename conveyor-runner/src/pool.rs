//! Bounded pool of worker threads
//!
//! `process` locks the item through a [`ProcessableManager`], hands it to the
//! first idle worker and releases the lock once the worker is done with it.
//! When every worker is busy the item is released at once and refused.

use std::collections::HashSet;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use conveyor_core::domain::job::Job;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::feeder::{FeederListener, FeederPool};
use crate::worker::{ProcessFn, Submission, Worker};

#[derive(Debug, Error)]
#[error("{0}")]
pub struct LockError(pub String);

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("locking failed: {0}")]
    LockFailed(#[from] LockError),

    #[error("pool busy")]
    Busy,

    #[error("pool is not running")]
    NotRunning,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Guards items against being processed twice
pub trait ProcessableManager<P>: Send + Sync {
    fn lock(&self, item: P) -> Result<P, LockError>;

    fn release(&self, item: P) -> Result<P, LockError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolStatus {
    Accepting,
    Full,
}

impl std::fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolStatus::Accepting => write!(f, "ACCEPTING"),
            PoolStatus::Full => write!(f, "FULL"),
        }
    }
}

pub trait PoolStatusListener: Send + Sync {
    fn status_changed(&self, status: PoolStatus);
}

/// Counts busy workers and reports the FULL / ACCEPTING edges
struct BusyCounter {
    busy: AtomicUsize,
    size: usize,
    listeners: Mutex<Vec<Arc<dyn PoolStatusListener>>>,
}

impl BusyCounter {
    fn status(&self) -> PoolStatus {
        if self.busy.load(Ordering::SeqCst) >= self.size {
            PoolStatus::Full
        } else {
            PoolStatus::Accepting
        }
    }

    fn broadcast(&self, status: PoolStatus) {
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener.status_changed(status))).is_err() {
                error!("Pool status listener panicked on {}", status);
            }
        }
    }
}

impl FeederListener for BusyCounter {
    fn became_busy(&self) {
        if self.busy.fetch_add(1, Ordering::SeqCst) + 1 == self.size {
            self.broadcast(PoolStatus::Full);
        }
    }

    fn became_idle(&self) {
        if self.busy.fetch_sub(1, Ordering::SeqCst) == self.size {
            self.broadcast(PoolStatus::Accepting);
        }
    }
}

pub struct WorkerProcessingPool<P> {
    name: String,
    feeders: FeederPool<Submission<P>>,
    workers: Vec<Arc<Worker<P>>>,
    manager: Arc<dyn ProcessableManager<P>>,
    counter: Arc<BusyCounter>,
    running: AtomicBool,
    stopped: AtomicBool,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl<P> WorkerProcessingPool<P>
where
    P: Clone + Send + 'static,
{
    /// Creates a pool of `size` workers
    ///
    /// Workers wait at most `wait_timeout` between two checks for a stop
    /// request. Nothing runs until `start`.
    pub fn new(
        name: impl Into<String>,
        size: usize,
        manager: Arc<dyn ProcessableManager<P>>,
        process: ProcessFn<P>,
        wait_timeout: Duration,
    ) -> Self {
        let name = name.into();
        let counter = Arc::new(BusyCounter {
            busy: AtomicUsize::new(0),
            size,
            listeners: Mutex::new(Vec::new()),
        });

        let releasing = releasing(Arc::clone(&manager), process);
        let feeders = FeederPool::new(size);
        let workers = feeders
            .feeders()
            .iter()
            .enumerate()
            .map(|(i, feeder)| {
                feeder.add_listener(Arc::clone(&counter) as Arc<dyn FeederListener>);
                Arc::new(Worker::new(
                    format!("{}-{}", name, i),
                    feeder.clone(),
                    Arc::clone(&releasing),
                    wait_timeout,
                ))
            })
            .collect();

        Self {
            name,
            feeders,
            workers,
            manager,
            counter,
            running: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            handles: Mutex::new(Vec::new()),
        }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn status(&self) -> PoolStatus {
        self.counter.status()
    }

    pub fn has_idle_worker(&self) -> bool {
        self.feeders.is_idle()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn add_listener(&self, listener: Arc<dyn PoolStatusListener>) {
        self.counter
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Locks `item` and hands it to the first idle worker
    pub fn process(&self, item: P, reason: &str) -> Result<(), PoolError> {
        if !self.is_running() {
            return Err(PoolError::NotRunning);
        }

        let mut item = self.manager.lock(item)?;

        for worker in &self.workers {
            match worker.submit(item, reason) {
                Ok(()) => {
                    debug!("Submitted to {} ({})", worker.name(), reason);
                    return Ok(());
                }
                Err(refused) => item = refused,
            }
        }

        if let Err(e) = self.manager.release(item) {
            error!("Pool {} busy and failed to release lock: {}", self.name, e);
        }
        Err(PoolError::Busy)
    }

    /// Spawns one thread per worker; a no-op once started
    pub fn start(&self) -> Result<(), PoolError> {
        if self.stopped.load(Ordering::SeqCst) {
            warn!("Pool {} was stopped and cannot be restarted", self.name);
            return Err(PoolError::NotRunning);
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let mut handles = self.handles();
        for worker in &self.workers {
            let worker = Arc::clone(worker);
            let handle = thread::Builder::new()
                .name(worker.name().to_string())
                .spawn(move || worker.run())?;
            handles.push(handle);
        }

        info!("Pool {} started with {} worker(s)", self.name, self.size());
        Ok(())
    }

    /// Stops every worker and waits up to `timeout` for their threads
    ///
    /// Workers finish the item they hold. Threads still running at the
    /// deadline are detached. Returns whether every thread ended in time.
    pub fn stop(&self, timeout: Duration) -> bool {
        if !self.running.swap(false, Ordering::SeqCst) {
            return true;
        }
        self.stopped.store(true, Ordering::SeqCst);

        for worker in &self.workers {
            worker.stop();
        }

        let deadline = Instant::now() + timeout;
        let mut pending = std::mem::take(&mut *self.handles());

        loop {
            let (finished, busy): (Vec<_>, Vec<_>) =
                pending.into_iter().partition(|h| h.is_finished());
            for handle in finished {
                if handle.join().is_err() {
                    error!("A worker thread of pool {} panicked", self.name);
                }
            }
            pending = busy;

            if pending.is_empty() || Instant::now() >= deadline {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }

        if pending.is_empty() {
            info!("Pool {} stopped", self.name);
            true
        } else {
            warn!(
                "Pool {}: {} worker(s) still busy after {:?}, detaching",
                self.name,
                pending.len(),
                timeout
            );
            false
        }
    }

    fn handles(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Wraps `process` so the item lock is released once processing returns
fn releasing<P>(manager: Arc<dyn ProcessableManager<P>>, process: ProcessFn<P>) -> ProcessFn<P>
where
    P: Clone + Send + 'static,
{
    Arc::new(move |item: P, reason: &str| {
        let key = item.clone();
        let outcome = catch_unwind(AssertUnwindSafe(|| process(item, reason)));
        if let Err(e) = manager.release(key) {
            error!("Failed to release lock after processing: {}", e);
        }
        match outcome {
            Ok(result) => result,
            Err(_) => anyhow::bail!("processing panicked"),
        }
    })
}

// =============================================================================
// Local job locks
// =============================================================================

/// In-process lock set keyed by job id
#[derive(Default)]
pub struct LocalJobLocks {
    locked: Mutex<HashSet<String>>,
}

impl LocalJobLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_locked(&self, id: &str) -> bool {
        self.locked().contains(id)
    }

    fn locked(&self) -> MutexGuard<'_, HashSet<String>> {
        self.locked.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ProcessableManager<Job> for LocalJobLocks {
    fn lock(&self, job: Job) -> Result<Job, LockError> {
        if !self.locked().insert(job.id.clone()) {
            return Err(LockError(format!("job {} is already locked", job.id)));
        }
        Ok(job)
    }

    fn release(&self, job: Job) -> Result<Job, LockError> {
        if !self.locked().remove(&job.id) {
            return Err(LockError(format!("job {} was not locked", job.id)));
        }
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conveyor_core::domain::job::JobValue;
    use std::sync::mpsc;

    /// Lock manager over plain numbers
    #[derive(Default)]
    struct NumberLocks {
        locked: Mutex<HashSet<u32>>,
        fail_release: AtomicBool,
    }

    impl ProcessableManager<u32> for NumberLocks {
        fn lock(&self, item: u32) -> Result<u32, LockError> {
            if !self.locked.lock().unwrap().insert(item) {
                return Err(LockError(format!("{} already locked", item)));
            }
            Ok(item)
        }

        fn release(&self, item: u32) -> Result<u32, LockError> {
            self.locked.lock().unwrap().remove(&item);
            if self.fail_release.load(Ordering::SeqCst) {
                return Err(LockError("release failed".to_string()));
            }
            Ok(item)
        }
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<PoolStatus>>,
    }

    impl PoolStatusListener for Recorder {
        fn status_changed(&self, status: PoolStatus) {
            self.seen.lock().unwrap().push(status);
        }
    }

    /// Pool whose workers block until the test releases them
    struct Gated {
        pool: WorkerProcessingPool<u32>,
        locks: Arc<NumberLocks>,
        started: mpsc::Receiver<u32>,
        gate: mpsc::Sender<()>,
    }

    fn gated_pool(size: usize) -> Gated {
        let locks = Arc::new(NumberLocks::default());
        let (started_tx, started) = mpsc::channel();
        let (gate, gate_rx) = mpsc::channel::<()>();
        let started_tx = Mutex::new(started_tx);
        let gate_rx = Mutex::new(gate_rx);

        let pool = WorkerProcessingPool::new(
            "test",
            size,
            Arc::clone(&locks) as Arc<dyn ProcessableManager<u32>>,
            Arc::new(move |item: u32, _: &str| {
                started_tx.lock().unwrap().send(item).unwrap();
                gate_rx
                    .lock()
                    .unwrap()
                    .recv_timeout(Duration::from_secs(5))
                    .unwrap();
                Ok(())
            }),
            Duration::from_millis(10),
        );
        pool.start().unwrap();

        Gated {
            pool,
            locks,
            started,
            gate,
        }
    }

    fn wait_until(condition: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !condition() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_full_pool_refuses_and_releases() {
        let gated = gated_pool(2);
        let recorder = Arc::new(Recorder::default());
        gated
            .pool
            .add_listener(Arc::clone(&recorder) as Arc<dyn PoolStatusListener>);

        gated.pool.process(1, "first").unwrap();
        assert_eq!(gated.pool.status(), PoolStatus::Accepting);
        gated.pool.process(2, "second").unwrap();
        assert_eq!(gated.pool.status(), PoolStatus::Full);
        assert!(!gated.pool.has_idle_worker());

        assert!(matches!(
            gated.pool.process(3, "third"),
            Err(PoolError::Busy)
        ));
        assert!(!gated.locks.locked.lock().unwrap().contains(&3));

        gated.started.recv_timeout(Duration::from_secs(2)).unwrap();
        gated.gate.send(()).unwrap();
        wait_until(|| gated.pool.status() == PoolStatus::Accepting);
        assert!(gated.pool.has_idle_worker());

        gated.gate.send(()).unwrap();
        wait_until(|| gated.locks.locked.lock().unwrap().is_empty());
        wait_until(|| recorder.seen.lock().unwrap().len() == 2);
        assert_eq!(
            *recorder.seen.lock().unwrap(),
            vec![PoolStatus::Full, PoolStatus::Accepting]
        );

        assert!(gated.pool.stop(Duration::from_secs(2)));
    }

    #[test]
    fn test_locked_item_is_refused() {
        let gated = gated_pool(2);
        gated.pool.process(5, "first").unwrap();

        assert!(matches!(
            gated.pool.process(5, "again"),
            Err(PoolError::LockFailed(_))
        ));

        gated.gate.send(()).unwrap();
        assert!(gated.pool.stop(Duration::from_secs(2)));
    }

    #[test]
    fn test_failed_release_still_reports_busy() {
        let gated = gated_pool(1);
        gated.pool.process(1, "only").unwrap();
        gated.locks.fail_release.store(true, Ordering::SeqCst);

        assert!(matches!(gated.pool.process(2, "extra"), Err(PoolError::Busy)));

        gated.gate.send(()).unwrap();
        assert!(gated.pool.stop(Duration::from_secs(2)));
    }

    #[test]
    fn test_start_and_stop_are_idempotent() {
        let gated = gated_pool(1);
        gated.pool.start().unwrap();

        assert!(gated.pool.stop(Duration::from_secs(2)));
        assert!(gated.pool.stop(Duration::from_secs(2)));
        assert!(matches!(
            gated.pool.process(1, "late"),
            Err(PoolError::NotRunning)
        ));
        assert!(gated.pool.start().is_err());
    }

    #[test]
    fn test_stop_detaches_stuck_workers() {
        let gated = gated_pool(1);
        gated.pool.process(1, "stuck").unwrap();
        gated.started.recv_timeout(Duration::from_secs(2)).unwrap();

        assert!(!gated.pool.stop(Duration::from_millis(30)));
        gated.gate.send(()).unwrap();
    }

    #[test]
    fn test_local_job_locks() {
        let locks = LocalJobLocks::new();
        let job = Job::new("j1", 1, JobValue::default());

        let job = locks.lock(job).unwrap();
        assert!(locks.is_locked("j1"));
        assert!(locks.lock(job.clone()).is_err());

        locks.release(job.clone()).unwrap();
        assert!(!locks.is_locked("j1"));
        assert!(locks.release(job).is_err());
    }
}
