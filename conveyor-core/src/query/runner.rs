//! Runner queries

use serde::{Deserialize, Serialize};

use super::filter::{Document, FieldValue, Filter, IntoFilter};
use crate::domain::runner::{RunnerStatus, RunnerValue};

pub const CALLBACK: &str = "callback";
pub const CATEGORY_COMPETENCIES: &str = "competencies.categories";
pub const NAME_COMPETENCIES: &str = "competencies.names";
pub const RUNTIME_STATUS: &str = "runtime.status";
pub const CREATED: &str = "runtime.created";
pub const LAST_PING: &str = "runtime.last_ping";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunnerQuery {
    pub criteria: Vec<RunnerCriteria>,
}

impl RunnerQuery {
    pub fn new(criteria: Vec<RunnerCriteria>) -> Self {
        Self { criteria }
    }
}

/// A runner matches when it is competent for `category` and `name` and is in
/// `runtime_status`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunnerCriteria {
    pub category: Option<String>,
    pub name: Option<String>,
    pub runtime_status: Option<RunnerStatus>,
}

impl IntoFilter for RunnerCriteria {
    fn to_filter(&self) -> Filter {
        let mut terms = Vec::new();
        if let Some(category) = &self.category {
            terms.push(Filter::matches_pattern(
                CATEGORY_COMPETENCIES,
                category.clone(),
            ));
        }
        if let Some(name) = &self.name {
            terms.push(Filter::matches_pattern(NAME_COMPETENCIES, name.clone()));
        }
        if let Some(status) = self.runtime_status {
            terms.push(Filter::eq(RUNTIME_STATUS, status.to_string()));
        }
        Filter::and(terms)
    }
}

impl IntoFilter for RunnerQuery {
    fn to_filter(&self) -> Filter {
        Filter::and(self.criteria.iter().map(IntoFilter::to_filter).collect())
    }
}

impl Document for RunnerValue {
    fn field(&self, path: &str) -> Option<FieldValue> {
        let competencies = self.competencies.as_ref();
        let runtime = self.runtime.as_ref();
        match path {
            CALLBACK => self.callback.clone().map(FieldValue::Text),
            CATEGORY_COMPETENCIES => competencies
                .and_then(|c| c.categories.clone())
                .map(FieldValue::Texts),
            NAME_COMPETENCIES => competencies
                .and_then(|c| c.names.clone())
                .map(FieldValue::Texts),
            RUNTIME_STATUS => runtime
                .and_then(|r| r.status)
                .map(|s| FieldValue::Text(s.to_string())),
            CREATED => runtime.and_then(|r| r.created).map(FieldValue::Time),
            LAST_PING => runtime.and_then(|r| r.last_ping).map(FieldValue::Time),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::runner::Competencies;
    use chrono::Utc;

    fn runner(categories: &[&str], names: &[&str], status: RunnerStatus) -> RunnerValue {
        RunnerValue {
            callback: Some("http://r".to_string()),
            time_to_live: Some(30),
            competencies: Some(Competencies::new(
                categories.iter().map(|s| s.to_string()).collect(),
                names.iter().map(|s| s.to_string()).collect(),
            )),
            runtime: None,
        }
        .pinged(status, Utc::now())
    }

    #[test]
    fn test_competency_patterns() {
        let r = runner(&["build-.*"], &["compile", "link"], RunnerStatus::Idle);

        let by_category = RunnerCriteria {
            category: Some("build-linux".to_string()),
            ..Default::default()
        };
        assert!(by_category.to_filter().matches(&r));

        let by_name = RunnerCriteria {
            name: Some("package".to_string()),
            ..Default::default()
        };
        assert!(!by_name.to_filter().matches(&r));
    }

    #[test]
    fn test_status_and_competency_combine() {
        let idle = runner(&["c"], &["n"], RunnerStatus::Idle);
        let busy = runner(&["c"], &["n"], RunnerStatus::Running);

        let query = RunnerQuery::new(vec![RunnerCriteria {
            category: Some("c".to_string()),
            name: Some("n".to_string()),
            runtime_status: Some(RunnerStatus::Idle),
        }]);
        let filter = query.to_filter();
        assert!(filter.matches(&idle));
        assert!(!filter.matches(&busy));
    }

    #[test]
    fn test_empty_competencies_match_nothing() {
        let r = runner(&[], &[], RunnerStatus::Idle);
        let criteria = RunnerCriteria {
            category: Some("c".to_string()),
            ..Default::default()
        };
        assert!(!criteria.to_filter().matches(&r));
    }
}
