//! Job domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entity::Entity;

/// A job as stored by the registry: value plus identity and version
pub type Job = Entity<JobValue>;

/// Job value
///
/// Structure shared between registry (persists) and runner (reserves, executes, reports).
/// Every field a caller may omit is optional so that creation rules can tell
/// "absent" apart from "empty".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobValue {
    pub name: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub arguments: Vec<String>,
    pub result: Option<String>,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub processing: Processing,
    #[serde(default)]
    pub accounting: Accounting,
}

impl JobValue {
    /// Starts a builder for a job value
    pub fn builder() -> JobValueBuilder {
        JobValueBuilder::default()
    }

    /// Returns a copy of this value with a different status
    pub fn with_status(&self, run: RunStatus, exit: Option<ExitStatus>) -> Self {
        Self {
            status: JobStatus {
                run: Some(run),
                exit,
            },
            ..self.clone()
        }
    }

    /// Returns a copy of this value with a different result
    pub fn with_result(&self, result: impl Into<String>) -> Self {
        Self {
            result: Some(result.into()),
            ..self.clone()
        }
    }

    pub fn run_status(&self) -> Option<RunStatus> {
        self.status.run
    }
}

/// Run and exit status of a job
///
/// `exit` is only meaningful once `run` is DONE.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    pub run: Option<RunStatus>,
    pub exit: Option<ExitStatus>,
}

impl JobStatus {
    pub fn pending() -> Self {
        Self {
            run: Some(RunStatus::Pending),
            exit: None,
        }
    }

    pub fn running() -> Self {
        Self {
            run: Some(RunStatus::Running),
            exit: None,
        }
    }

    pub fn done(exit: ExitStatus) -> Self {
        Self {
            run: Some(RunStatus::Done),
            exit: Some(exit),
        }
    }
}

/// Job run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Pending,
    Running,
    Done,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Pending => write!(f, "PENDING"),
            RunStatus::Running => write!(f, "RUNNING"),
            RunStatus::Done => write!(f, "DONE"),
        }
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(RunStatus::Pending),
            "RUNNING" => Ok(RunStatus::Running),
            "DONE" => Ok(RunStatus::Done),
            other => Err(format!("unknown run status: {}", other)),
        }
    }
}

/// Job exit status, set once the job is DONE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitStatus {
    Success,
    Failure,
}

impl std::fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitStatus::Success => write!(f, "SUCCESS"),
            ExitStatus::Failure => write!(f, "FAILURE"),
        }
    }
}

impl std::str::FromStr for ExitStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SUCCESS" => Ok(ExitStatus::Success),
            "FAILURE" => Ok(ExitStatus::Failure),
            other => Err(format!("unknown exit status: {}", other)),
        }
    }
}

/// Processing timestamps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Processing {
    pub submitted: Option<DateTime<Utc>>,
    pub started: Option<DateTime<Utc>>,
    pub finished: Option<DateTime<Utc>>,
}

/// Accounting information
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accounting {
    pub account_id: Option<String>,
}

/// Builder for [`JobValue`]
#[derive(Debug, Default)]
pub struct JobValueBuilder {
    value: JobValue,
}

impl JobValueBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.value.name = Some(name.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.value.category = Some(category.into());
        self
    }

    pub fn account_id(mut self, account_id: impl Into<String>) -> Self {
        self.value.accounting.account_id = Some(account_id.into());
        self
    }

    pub fn arguments(mut self, arguments: Vec<String>) -> Self {
        self.value.arguments = arguments;
        self
    }

    pub fn result(mut self, result: impl Into<String>) -> Self {
        self.value.result = Some(result.into());
        self
    }

    pub fn status(mut self, status: JobStatus) -> Self {
        self.value.status = status;
        self
    }

    pub fn processing(mut self, processing: Processing) -> Self {
        self.value.processing = processing;
        self
    }

    pub fn build(self) -> JobValue {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_uppercase() {
        let status = JobStatus::done(ExitStatus::Success);
        let json = serde_json::to_value(status).unwrap();
        assert_eq!(json["run"], "DONE");
        assert_eq!(json["exit"], "SUCCESS");
    }

    #[test]
    fn test_run_status_parse() {
        assert_eq!("pending".parse::<RunStatus>(), Ok(RunStatus::Pending));
        assert_eq!("DONE".parse::<RunStatus>(), Ok(RunStatus::Done));
        assert!("finished".parse::<RunStatus>().is_err());
    }

    #[test]
    fn test_missing_sections_default() {
        let value: JobValue = serde_json::from_str(r#"{"name": "n", "category": "c"}"#).unwrap();
        assert_eq!(value.name.as_deref(), Some("n"));
        assert!(value.arguments.is_empty());
        assert_eq!(value.status, JobStatus::default());
        assert_eq!(value.accounting.account_id, None);
    }
}
