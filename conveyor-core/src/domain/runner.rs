//! Runner domain model
//!
//! Represents a runner process that pulls and executes jobs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entity::Entity;

/// A runner as stored by the registry
pub type Runner = Entity<RunnerValue>;

/// A runner that can execute jobs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunnerValue {
    /// Address the runner is reachable at
    pub callback: Option<String>,

    /// Seconds without a ping after which the runner is considered stale
    pub time_to_live: Option<i64>,

    /// What the runner can execute
    pub competencies: Option<Competencies>,

    /// Runtime state, maintained by the registry
    pub runtime: Option<Runtime>,
}

impl RunnerValue {
    pub fn status(&self) -> Option<RunnerStatus> {
        self.runtime.as_ref().and_then(|r| r.status)
    }

    pub fn last_ping(&self) -> Option<DateTime<Utc>> {
        self.runtime.as_ref().and_then(|r| r.last_ping)
    }

    /// Returns a copy with only the runtime status replaced
    pub fn with_status(&self, status: RunnerStatus) -> Self {
        let mut runtime = self.runtime.unwrap_or_default();
        runtime.status = Some(status);
        Self {
            runtime: Some(runtime),
            ..self.clone()
        }
    }

    /// Returns a copy with the runtime status and last ping replaced
    pub fn pinged(&self, status: RunnerStatus, at: DateTime<Utc>) -> Self {
        let mut runtime = self.runtime.unwrap_or_default();
        runtime.status = Some(status);
        runtime.last_ping = Some(at);
        Self {
            runtime: Some(runtime),
            ..self.clone()
        }
    }
}

/// Category and name patterns a runner declares it can service
///
/// Both lists must be set explicitly at registration, even when empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competencies {
    pub categories: Option<Vec<String>>,
    pub names: Option<Vec<String>>,
}

impl Competencies {
    pub fn new(categories: Vec<String>, names: Vec<String>) -> Self {
        Self {
            categories: Some(categories),
            names: Some(names),
        }
    }
}

/// Runner runtime state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Runtime {
    pub status: Option<RunnerStatus>,
    pub created: Option<DateTime<Utc>>,
    pub last_ping: Option<DateTime<Utc>>,
}

/// Status of a runner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunnerStatus {
    /// Runner has spare capacity
    Idle,

    /// Every worker of the runner is busy
    Running,

    /// Runner stopped pinging
    Disconnected,
}

impl std::fmt::Display for RunnerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunnerStatus::Idle => write!(f, "IDLE"),
            RunnerStatus::Running => write!(f, "RUNNING"),
            RunnerStatus::Disconnected => write!(f, "DISCONNECTED"),
        }
    }
}

impl std::str::FromStr for RunnerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "IDLE" => Ok(RunnerStatus::Idle),
            "RUNNING" | "BUSY" => Ok(RunnerStatus::Running),
            "DISCONNECTED" => Ok(RunnerStatus::Disconnected),
            other => Err(format!("unknown runner status: {}", other)),
        }
    }
}
