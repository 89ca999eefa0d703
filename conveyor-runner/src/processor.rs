//! Job processors
//!
//! A processor turns a reserved job into a finished one. The runner ships a
//! single kind: run the job's arguments as a local command.

use std::process::Command;

use conveyor_core::domain::job::{ExitStatus, Job, RunStatus};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("job {0} has no command to run")]
    NoCommand(String),

    #[error("failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

pub trait JobProcessor {
    /// Processes the job to completion
    ///
    /// # Returns
    /// The job in its terminal state
    fn process(&self) -> Result<Job, ProcessingError>;
}

pub trait JobProcessorFactory: Send + Sync {
    fn create(&self, job: Job) -> Box<dyn JobProcessor>;
}

/// Runs `arguments[0]` with the remaining arguments
///
/// Exit code zero finishes the job with SUCCESS and its stdout as result,
/// anything else with FAILURE and its stderr.
pub struct CommandProcessor {
    job: Job,
}

impl JobProcessor for CommandProcessor {
    fn process(&self) -> Result<Job, ProcessingError> {
        let (program, args) = self
            .job
            .value
            .arguments
            .split_first()
            .ok_or_else(|| ProcessingError::NoCommand(self.job.id.clone()))?;

        debug!("Job {}: running {} {:?}", self.job.id, program, args);

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|source| ProcessingError::Spawn {
                command: program.clone(),
                source,
            })?;

        let (exit, result) = if output.status.success() {
            (ExitStatus::Success, output.stdout)
        } else {
            (ExitStatus::Failure, output.stderr)
        };
        let result = String::from_utf8_lossy(&result).trim_end().to_string();

        info!("Job {} finished: {} ({})", self.job.id, exit, output.status);

        Ok(self.job.with_value(
            self.job
                .value
                .with_status(RunStatus::Done, Some(exit))
                .with_result(result),
        ))
    }
}

#[derive(Debug, Default)]
pub struct CommandProcessorFactory;

impl JobProcessorFactory for CommandProcessorFactory {
    fn create(&self, job: Job) -> Box<dyn JobProcessor> {
        Box::new(CommandProcessor { job })
    }
}
