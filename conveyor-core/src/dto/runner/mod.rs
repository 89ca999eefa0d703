//! Runner DTOs
//!
//! Data transfer objects for runner-related operations.

use serde::{Deserialize, Serialize};

use crate::domain::runner::{Competencies, RunnerStatus, RunnerValue};
use crate::query::runner::{RunnerCriteria, RunnerQuery};

/// Request to register a runner with the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRunner {
    /// Address the runner is reachable at
    pub callback: Option<String>,

    /// Seconds after which a silent runner is stale
    pub time_to_live: Option<i64>,

    /// Category and name patterns the runner services
    pub competencies: Option<Competencies>,
}

impl From<RegisterRunner> for RunnerValue {
    fn from(req: RegisterRunner) -> Self {
        RunnerValue {
            callback: req.callback,
            time_to_live: req.time_to_live,
            competencies: req.competencies,
            runtime: None,
        }
    }
}

/// Status notification sent by a runner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerStatusPatch {
    pub status: RunnerStatus,
}

/// Single-criterion runner filter as carried in HTTP query strings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunnerFilterParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RunnerStatus>,
}

impl From<RunnerFilterParams> for RunnerQuery {
    fn from(params: RunnerFilterParams) -> Self {
        RunnerQuery::new(vec![RunnerCriteria {
            category: params.category,
            name: params.name,
            runtime_status: params.status,
        }])
    }
}
