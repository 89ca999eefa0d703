//! Job DTOs for inter-service communication

use serde::{Deserialize, Serialize};

use crate::domain::job::{Accounting, ExitStatus, JobStatus, JobValue, RunStatus};
use crate::query::job::{JobCriteria, JobQuery};

/// Request to submit a new job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJob {
    pub name: Option<String>,
    pub category: Option<String>,
    pub account_id: Option<String>,
    #[serde(default)]
    pub arguments: Vec<String>,
}

impl From<CreateJob> for JobValue {
    fn from(req: CreateJob) -> Self {
        JobValue {
            name: req.name,
            category: req.category,
            arguments: req.arguments,
            accounting: Accounting {
                account_id: req.account_id,
            },
            ..Default::default()
        }
    }
}

/// Conditional job update
///
/// Accepted by the registry only if `version` is the stored version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPatch {
    pub version: u64,
    pub status: Option<JobStatus>,
    pub result: Option<String>,
}

impl JobPatch {
    /// Patch reserving a job: PENDING to RUNNING
    pub fn reserve(version: u64) -> Self {
        Self {
            version,
            status: Some(JobStatus {
                run: Some(RunStatus::Running),
                exit: None,
            }),
            result: None,
        }
    }

    /// Patch carrying a job's status and result as they are in `value`
    pub fn report(version: u64, value: &JobValue) -> Self {
        Self {
            version,
            status: Some(value.status),
            result: value.result.clone(),
        }
    }

    /// The value proposed by this patch when applied to `current`
    pub fn apply_to(&self, current: &JobValue) -> JobValue {
        let mut proposed = current.clone();
        if let Some(status) = self.status {
            proposed.status = status;
        }
        if let Some(result) = &self.result {
            proposed.result = Some(result.clone());
        }
        proposed
    }
}

/// Single-criterion job filter as carried in HTTP query strings
///
/// `names` is a comma separated list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobFilterParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub names: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_status: Option<RunStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_status: Option<ExitStatus>,
}

impl JobFilterParams {
    pub fn with_names(mut self, names: &[String]) -> Self {
        self.names = if names.is_empty() {
            None
        } else {
            Some(names.join(","))
        };
        self
    }
}

impl From<JobFilterParams> for JobQuery {
    fn from(params: JobFilterParams) -> Self {
        let names = params
            .names
            .map(|names| {
                names
                    .split(',')
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        JobQuery::single(JobCriteria {
            account_id: params.account_id,
            category: params.category,
            names,
            run_status: params.run_status,
            exit_status: params.exit_status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_only_touches_given_fields() {
        let current = JobValue::builder()
            .name("n")
            .category("c")
            .result("old")
            .status(JobStatus::running())
            .build();

        let patch = JobPatch {
            version: 2,
            status: Some(JobStatus::done(ExitStatus::Failure)),
            result: None,
        };
        let proposed = patch.apply_to(&current);

        assert_eq!(proposed.status, JobStatus::done(ExitStatus::Failure));
        assert_eq!(proposed.result.as_deref(), Some("old"));
        assert_eq!(proposed.name, current.name);
    }

    #[test]
    fn test_filter_params_to_query() {
        let params = JobFilterParams {
            category: Some("c".to_string()),
            run_status: Some(RunStatus::Pending),
            ..Default::default()
        }
        .with_names(&["a".to_string(), "b".to_string()]);

        let query: JobQuery = params.into();
        let criteria = &query.criteria[0];
        assert_eq!(criteria.names, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(criteria.category.as_deref(), Some("c"));
        assert_eq!(criteria.run_status, Some(RunStatus::Pending));
    }

    #[test]
    fn test_create_job_into_value() {
        let value: JobValue = CreateJob {
            name: Some("n".to_string()),
            category: Some("c".to_string()),
            account_id: Some("a1".to_string()),
            arguments: vec!["echo".to_string()],
        }
        .into();
        assert_eq!(value.accounting.account_id.as_deref(), Some("a1"));
        assert_eq!(value.status.run, None);
    }
}
