//! Job lifecycle changes

use chrono::{DateTime, Utc};

use super::{Change, Validation};
use crate::domain::job::{JobValue, RunStatus};

pub const DONE_IS_FINAL: &str = "cannot change a job when run status is DONE";
pub const EXIT_STATUS_REQUIRED: &str = "exit status must be set";
pub const ALREADY_RUNNING: &str = "job is already RUNNING";

/// Change of an existing job
///
/// Rejects any change to a DONE job, a RUNNING to DONE transition without exit
/// status, and RUNNING to RUNNING (which is what makes reservation races safe:
/// the loser's patch is refused).
#[derive(Debug, Clone)]
pub struct JobValueChange {
    current: JobValue,
    proposed: JobValue,
}

impl JobValueChange {
    pub fn from(current: JobValue, proposed: JobValue) -> Self {
        Self { current, proposed }
    }

    pub fn applied_at(&self, now: DateTime<Utc>) -> JobValue {
        let mut applied = self.proposed.clone();
        match (self.current.run_status(), self.proposed.run_status()) {
            (Some(RunStatus::Pending), Some(RunStatus::Running)) => {
                applied.processing.started = Some(now);
            }
            (current, Some(RunStatus::Done)) if current != Some(RunStatus::Done) => {
                applied.processing.finished = Some(now);
            }
            _ => {}
        }
        applied
    }
}

impl Change<JobValue> for JobValueChange {
    fn current_value(&self) -> Option<&JobValue> {
        Some(&self.current)
    }

    fn new_value(&self) -> &JobValue {
        &self.proposed
    }

    fn validate(&self) -> Validation {
        let current = self.current.run_status();
        let proposed = self.proposed.run_status();

        if current == Some(RunStatus::Done) {
            return Validation::invalid(DONE_IS_FINAL);
        }
        if current == Some(RunStatus::Running) {
            if proposed == Some(RunStatus::Done) && self.proposed.status.exit.is_none() {
                return Validation::invalid(EXIT_STATUS_REQUIRED);
            }
            if proposed == Some(RunStatus::Running) {
                return Validation::invalid(ALREADY_RUNNING);
            }
        }
        Validation::valid()
    }

    fn applied(&self) -> JobValue {
        self.applied_at(Utc::now())
    }
}

/// Creation of a job from a caller-supplied value
#[derive(Debug, Clone)]
pub struct JobValueCreation {
    initial: JobValue,
}

impl JobValueCreation {
    pub fn with(initial: JobValue) -> Self {
        Self { initial }
    }

    /// Forces PENDING and stamps `processing.submitted`
    pub fn applied_at(&self, now: DateTime<Utc>) -> JobValue {
        let mut applied = self.initial.clone();
        applied.status.run = Some(RunStatus::Pending);
        applied.processing.submitted = Some(now);
        applied
    }
}

impl Change<JobValue> for JobValueCreation {
    fn current_value(&self) -> Option<&JobValue> {
        None
    }

    fn new_value(&self) -> &JobValue {
        &self.initial
    }

    fn validate(&self) -> Validation {
        if self.initial.name.is_none() {
            return Validation::invalid("a job must have a name");
        }
        if self.initial.category.is_none() {
            return Validation::invalid("a job must have a category");
        }
        if self.initial.accounting.account_id.is_none() {
            return Validation::invalid("a job must have an account id");
        }
        Validation::valid()
    }

    fn applied(&self) -> JobValue {
        self.applied_at(Utc::now())
    }
}
