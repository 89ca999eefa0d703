//! Job acquisition and reporting
//!
//! `next_job` races other runners for a pending job: it fetches a small page
//! of candidates and tries to reserve them in order with a version-guarded
//! PENDING -> RUNNING patch. The registry's conditional update is the only
//! mutual exclusion, so losing a race just means trying the next candidate.
//!
//! `update` reports a processed job back. Transient failures are retried a
//! bounded number of times; anything else is fatal, since the registry and
//! the runner no longer agree on the job's state.

use std::sync::Arc;
use std::time::Duration;

use conveyor_core::domain::job::{Job, RunStatus};
use conveyor_core::dto::job::{JobFilterParams, JobPatch};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::repository::{JobRepository, RegistryError};

/// Unrecoverable divergence between the runner and the registry
#[derive(Debug, Clone, Error)]
#[error("fatal failure on job {job_id} (correlation {correlation}): {reason}")]
pub struct FatalError {
    pub correlation: Uuid,
    pub job_id: String,
    pub reason: String,
}

pub struct JobManager {
    jobs: Arc<dyn JobRepository>,
    candidates: JobFilterParams,
    window: usize,
    max_attempts: u32,
    retry_delay: Duration,
    fatal: mpsc::UnboundedSender<FatalError>,
}

impl JobManager {
    pub fn new(
        config: &Config,
        jobs: Arc<dyn JobRepository>,
        fatal: mpsc::UnboundedSender<FatalError>,
    ) -> Self {
        let candidates = JobFilterParams {
            account_id: Some(config.account_id.clone()),
            category: Some(config.category.clone()),
            run_status: Some(RunStatus::Pending),
            ..Default::default()
        }
        .with_names(&config.job_names);

        Self {
            jobs,
            candidates,
            window: config.candidate_window,
            max_attempts: config.update_max_attempts.max(1),
            retry_delay: config.update_retry_delay,
            fatal,
        }
    }

    /// Reserves the first pending candidate that can still be reserved
    ///
    /// # Returns
    /// The reserved job, now RUNNING, or `None` when no candidate could be had
    pub async fn next_job(&self) -> Result<Option<Job>, RegistryError> {
        let candidates = self
            .jobs
            .list_candidates(&self.candidates, self.window)
            .await?;

        for candidate in candidates {
            match self
                .jobs
                .patch_job(&candidate.id, &JobPatch::reserve(candidate.version))
                .await
            {
                Ok(job) => {
                    info!("Reserved job {} ({})", job.id, name_of(&job));
                    return Ok(Some(job));
                }
                Err(RegistryError::Conflict(_)) => {
                    debug!("Job {} was reserved by another runner", candidate.id);
                }
                Err(e) => {
                    debug!("Could not reserve job {}: {}", candidate.id, e);
                }
            }
        }

        Ok(None)
    }

    /// Reports `job` back to the registry, guarded by its version
    ///
    /// Fails with a [`FatalError`], also sent to the fatal channel, once the
    /// retry budget is spent or the registry refuses the report.
    pub async fn update(&self, job: &Job) -> Result<Job, FatalError> {
        let patch = JobPatch::report(job.version, &job.value);
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.jobs.patch_job(&job.id, &patch).await {
                Ok(updated) => {
                    if attempt > 1 {
                        info!("Updated job {} after {} attempt(s)", job.id, attempt);
                    }
                    return Ok(updated);
                }
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    warn!(
                        "Failed to update job {} (attempt {}/{}): {}",
                        job.id, attempt, self.max_attempts, e
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => {
                    let reason = if e.is_transient() {
                        format!("gave up after {} attempt(s): {}", attempt, e)
                    } else {
                        e.to_string()
                    };
                    return Err(self.raise(job, reason));
                }
            }
        }
    }

    fn raise(&self, job: &Job, reason: String) -> FatalError {
        let fatal = FatalError {
            correlation: Uuid::new_v4(),
            job_id: job.id.clone(),
            reason,
        };

        error!(
            correlation = %fatal.correlation,
            job_id = %fatal.job_id,
            "Job state diverged from the registry: {}",
            fatal.reason
        );

        if self.fatal.send(fatal.clone()).is_err() {
            error!("No supervisor is listening for fatal failures");
        }
        fatal
    }
}

fn name_of(job: &Job) -> &str {
    job.value.name.as_deref().unwrap_or("<unnamed>")
}
