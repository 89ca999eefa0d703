//! Job poller
//!
//! Polls the registry for pending jobs while the pool has spare workers.
//! Each reserved job is handed to the pool; the worker that takes it
//! processes and reports it. The poller stops on shutdown, or fails as soon
//! as any job report turns fatal. Reports still in flight when it stops can
//! turn fatal later; `late_fatal` collects those once the pool has drained.

use std::sync::Arc;

use anyhow::Result;
use conveyor_core::domain::job::Job;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Duration};
use tracing::{debug, info, warn};

use super::failed;
use crate::manager::{FatalError, JobManager};
use crate::pool::WorkerProcessingPool;

pub struct JobPoller {
    manager: Arc<JobManager>,
    pool: Arc<WorkerProcessingPool<Job>>,
    poll_interval: Duration,
    fatal: mpsc::UnboundedReceiver<FatalError>,
}

impl JobPoller {
    pub fn new(
        manager: Arc<JobManager>,
        pool: Arc<WorkerProcessingPool<Job>>,
        poll_interval: Duration,
        fatal: mpsc::UnboundedReceiver<FatalError>,
    ) -> Self {
        Self {
            manager,
            pool,
            poll_interval,
            fatal,
        }
    }

    /// Runs the polling loop until `shutdown` flips to true
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!("Starting job poller (interval: {:?})", self.poll_interval);

        let mut interval = time::interval(self.poll_interval);

        loop {
            tokio::select! {
                biased;

                Some(fatal) = self.fatal.recv() => {
                    return Err(diverged(fatal));
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Job poller stopping");
                        return Ok(());
                    }
                }
                _ = interval.tick() => {
                    debug!("Polling for pending jobs");
                    let dispatched = self.poll_once().await.map_err(diverged)?;
                    if dispatched > 0 {
                        info!("Dispatched {} job(s) this cycle", dispatched);
                    }
                }
            }
        }
    }

    /// Fails with the first fatal report raised after `run` returned
    pub fn late_fatal(&mut self) -> Result<()> {
        match self.fatal.try_recv() {
            Ok(fatal) => Err(diverged(fatal)),
            Err(_) => Ok(()),
        }
    }

    /// Performs a single poll cycle
    ///
    /// # Returns
    /// How many jobs were handed to the pool
    pub async fn poll_once(&self) -> Result<usize, FatalError> {
        let mut dispatched = 0;

        while dispatched < self.pool.size() && self.pool.has_idle_worker() {
            let job = match self.manager.next_job().await {
                Ok(Some(job)) => job,
                Ok(None) => {
                    debug!("No jobs available");
                    break;
                }
                Err(e) => {
                    warn!("Failed to fetch pending jobs: {}", e);
                    break;
                }
            };

            match self.pool.process(job.clone(), "reserved") {
                Ok(()) => dispatched += 1,
                Err(e) => {
                    warn!("Pool refused job {}: {}", job.id, e);
                    let refused = failed(&job, format!("refused by runner: {}", e));
                    self.manager.update(&refused).await?;
                    break;
                }
            }
        }

        Ok(dispatched)
    }
}

fn diverged(fatal: FatalError) -> anyhow::Error {
    anyhow::Error::new(fatal).context("Runner stopped: job state diverged from the registry")
}
