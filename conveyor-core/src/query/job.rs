//! Job queries

use serde::{Deserialize, Serialize};

use super::filter::{Document, FieldValue, Filter, IntoFilter};
use crate::domain::job::{ExitStatus, JobValue, RunStatus};

pub const NAME: &str = "name";
pub const CATEGORY: &str = "category";
pub const ACCOUNT_ID: &str = "accounting.account_id";
pub const RUN_STATUS: &str = "status.run";
pub const EXIT_STATUS: &str = "status.exit";
pub const SUBMITTED: &str = "processing.submitted";
pub const STARTED: &str = "processing.started";
pub const FINISHED: &str = "processing.finished";

/// Ordered list of criteria, all of which must hold
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobQuery {
    pub criteria: Vec<JobCriteria>,
}

impl JobQuery {
    pub fn new(criteria: Vec<JobCriteria>) -> Self {
        Self { criteria }
    }

    pub fn single(criteria: JobCriteria) -> Self {
        Self::new(vec![criteria])
    }
}

/// One criterion; several names OR together, fields AND together
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobCriteria {
    pub account_id: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub names: Vec<String>,
    pub run_status: Option<RunStatus>,
    pub exit_status: Option<ExitStatus>,
}

impl IntoFilter for JobCriteria {
    fn to_filter(&self) -> Filter {
        let mut terms = Vec::new();
        if let Some(account_id) = &self.account_id {
            terms.push(Filter::eq(ACCOUNT_ID, account_id.clone()));
        }
        if let Some(category) = &self.category {
            terms.push(Filter::eq(CATEGORY, category.clone()));
        }
        if !self.names.is_empty() {
            terms.push(Filter::one_of(NAME, self.names.clone()));
        }
        if let Some(run) = self.run_status {
            terms.push(Filter::eq(RUN_STATUS, run.to_string()));
        }
        if let Some(exit) = self.exit_status {
            terms.push(Filter::eq(EXIT_STATUS, exit.to_string()));
        }
        Filter::and(terms)
    }
}

impl IntoFilter for JobQuery {
    fn to_filter(&self) -> Filter {
        Filter::and(self.criteria.iter().map(IntoFilter::to_filter).collect())
    }
}

impl Document for JobValue {
    fn field(&self, path: &str) -> Option<FieldValue> {
        match path {
            NAME => self.name.clone().map(FieldValue::Text),
            CATEGORY => self.category.clone().map(FieldValue::Text),
            ACCOUNT_ID => self.accounting.account_id.clone().map(FieldValue::Text),
            RUN_STATUS => self.status.run.map(|s| FieldValue::Text(s.to_string())),
            EXIT_STATUS => self.status.exit.map(|s| FieldValue::Text(s.to_string())),
            SUBMITTED => self.processing.submitted.map(FieldValue::Time),
            STARTED => self.processing.started.map(FieldValue::Time),
            FINISHED => self.processing.finished.map(FieldValue::Time),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::job::JobStatus;

    fn job(name: &str, category: &str, run: RunStatus) -> JobValue {
        JobValue::builder()
            .name(name)
            .category(category)
            .account_id("a1")
            .status(JobStatus {
                run: Some(run),
                exit: None,
            })
            .build()
    }

    #[test]
    fn test_empty_criterion_has_no_constraint() {
        let query = JobQuery::single(JobCriteria::default());
        assert_eq!(query.to_filter(), Filter::All);
        assert!(query.to_filter().matches(&job("n", "c", RunStatus::Done)));
    }

    #[test]
    fn test_names_or_together() {
        let criteria = JobCriteria {
            names: vec!["a".to_string(), "b".to_string()],
            ..Default::default()
        };
        let filter = criteria.to_filter();
        assert!(filter.matches(&job("a", "c", RunStatus::Pending)));
        assert!(filter.matches(&job("b", "c", RunStatus::Pending)));
        assert!(!filter.matches(&job("z", "c", RunStatus::Pending)));
    }

    #[test]
    fn test_criteria_and_together() {
        let query = JobQuery::new(vec![
            JobCriteria {
                category: Some("c".to_string()),
                ..Default::default()
            },
            JobCriteria {
                run_status: Some(RunStatus::Pending),
                ..Default::default()
            },
        ]);
        let filter = query.to_filter();
        assert!(filter.matches(&job("n", "c", RunStatus::Pending)));
        assert!(!filter.matches(&job("n", "c", RunStatus::Running)));
        assert!(!filter.matches(&job("n", "other", RunStatus::Pending)));
    }

    #[test]
    fn test_candidate_query_rewrite() {
        let criteria = JobCriteria {
            account_id: Some("a1".to_string()),
            category: Some("c".to_string()),
            names: vec!["n".to_string()],
            run_status: Some(RunStatus::Pending),
            exit_status: None,
        };
        assert_eq!(
            criteria.to_filter(),
            Filter::And(vec![
                Filter::eq(ACCOUNT_ID, "a1"),
                Filter::eq(CATEGORY, "c"),
                Filter::one_of(NAME, vec!["n".to_string()]),
                Filter::eq(RUN_STATUS, "PENDING"),
            ])
        );
    }

    #[test]
    fn test_exit_status_missing_never_matches() {
        let criteria = JobCriteria {
            exit_status: Some(ExitStatus::Success),
            ..Default::default()
        };
        assert!(!criteria.to_filter().matches(&job("n", "c", RunStatus::Running)));
    }
}
