//! Repository cleaner
//!
//! Background sweep that disconnects runners which stopped pinging and purges
//! finished jobs and disconnected runners once their retention has elapsed.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use conveyor_core::domain::job::RunStatus;
use conveyor_core::domain::runner::RunnerStatus;
use conveyor_core::query::{Filter, job, runner};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::repository::{JobRepository, RunnerRepository};
use crate::service::runner_service;

/// Outcome of one cleanup pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub disconnected: usize,
    pub purged_jobs: u64,
    pub purged_runners: u64,
}

pub struct Cleaner {
    jobs: Arc<JobRepository>,
    runners: Arc<RunnerRepository>,
    interval: Duration,
    job_retention: Duration,
    runner_retention: Duration,
}

impl Cleaner {
    pub fn new(config: &Config, jobs: Arc<JobRepository>, runners: Arc<RunnerRepository>) -> Self {
        Self {
            jobs,
            runners,
            interval: config.cleanup_interval,
            job_retention: config.job_retention,
            runner_retention: config.runner_retention,
        }
    }

    /// Starts the periodic sweep
    ///
    /// The task ends once `shutdown` flips to true or its sender is dropped; a
    /// pass already in progress completes first.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = time::interval(self.interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = self.run_once(Utc::now()).await;
                        if report != CleanupReport::default() {
                            info!(
                                "Cleanup: {} runner(s) disconnected, {} job(s) and {} runner(s) purged",
                                report.disconnected, report.purged_jobs, report.purged_runners
                            );
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            debug!("Cleaner stopped");
                            break;
                        }
                    }
                }
            }
        })
    }

    /// Runs one pass as of `now`
    ///
    /// Each step is independent; a failing step is logged and retried on the
    /// next pass.
    pub async fn run_once(&self, now: DateTime<Utc>) -> CleanupReport {
        let mut report = CleanupReport::default();

        match runner_service::mark_stale_runners_disconnected(self.runners.as_ref(), now).await {
            Ok(marked) => report.disconnected = marked,
            Err(e) => warn!("Failed to mark stale runners: {}", e),
        }

        let finished_jobs = Filter::and(vec![
            Filter::eq(job::RUN_STATUS, RunStatus::Done.to_string()),
            Filter::before(job::FINISHED, cutoff(now, self.job_retention)),
        ]);
        match self.jobs.delete_from(&finished_jobs).await {
            Ok(purged) => report.purged_jobs = purged,
            Err(e) => warn!("Failed to purge finished jobs: {}", e),
        }

        let gone_runners = Filter::and(vec![
            Filter::eq(
                runner::RUNTIME_STATUS,
                RunnerStatus::Disconnected.to_string(),
            ),
            Filter::before(runner::LAST_PING, cutoff(now, self.runner_retention)),
        ]);
        match self.runners.delete_from(&gone_runners).await {
            Ok(purged) => report.purged_runners = purged,
            Err(e) => warn!("Failed to purge disconnected runners: {}", e),
        }

        report
    }
}

/// `now - retention`, saturating at the earliest representable instant
fn cutoff(now: DateTime<Utc>, retention: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(retention)
        .ok()
        .and_then(|retention| now.checked_sub_signed(retention))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
