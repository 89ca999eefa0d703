//! Scheduler layer for the runner
//!
//! This layer polls the registry for pending jobs, reserves them and hands
//! them to the worker pool. Workers process jobs on their own threads and
//! report them back through the [`JobManager`].

pub mod poller;

use std::sync::Arc;

use conveyor_core::domain::job::{ExitStatus, Job, RunStatus};
use tokio::runtime::Handle;
use tracing::{debug, error};

use crate::manager::JobManager;
use crate::processor::JobProcessorFactory;
use crate::worker::ProcessFn;

pub use poller::JobPoller;

/// Builds the function workers run on every reserved job
///
/// Processing failures finish the job with FAILURE and the error as result.
/// Reporting runs on `runtime` and blocks the worker until the registry has
/// the job or the report failed for good.
pub fn job_handler(
    manager: Arc<JobManager>,
    factory: Arc<dyn JobProcessorFactory>,
    runtime: Handle,
) -> ProcessFn<Job> {
    Arc::new(move |job: Job, reason: &str| {
        debug!("Processing job {} ({})", job.id, reason);

        let finished = match factory.create(job.clone()).process() {
            Ok(finished) => finished,
            Err(e) => {
                error!("Job {} failed: {}", job.id, e);
                failed(&job, e.to_string())
            }
        };

        runtime.block_on(manager.update(&finished))?;
        Ok(())
    })
}

/// `job` finished with FAILURE and `reason` as result
pub(crate) fn failed(job: &Job, reason: impl Into<String>) -> Job {
    job.with_value(
        job.value
            .with_status(RunStatus::Done, Some(ExitStatus::Failure))
            .with_result(reason),
    )
}
