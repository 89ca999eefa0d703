//! Runner lifecycle changes

use chrono::{DateTime, Utc};

use super::{Change, Validation};
use crate::domain::runner::{RunnerStatus, RunnerValue, Runtime};

/// Registration of a runner
#[derive(Debug, Clone)]
pub struct RunnerValueCreation {
    initial: RunnerValue,
}

impl RunnerValueCreation {
    pub fn with(initial: RunnerValue) -> Self {
        Self { initial }
    }

    /// Defaults the runtime status to IDLE (an explicit status is kept) and
    /// stamps `created` and `last_ping`.
    pub fn applied_at(&self, now: DateTime<Utc>) -> RunnerValue {
        let mut applied = self.initial.clone();
        let runtime = applied.runtime.get_or_insert_with(Runtime::default);
        if runtime.status.is_none() {
            runtime.status = Some(RunnerStatus::Idle);
        }
        runtime.created = Some(now);
        runtime.last_ping = Some(now);
        applied
    }
}

impl Change<RunnerValue> for RunnerValueCreation {
    fn current_value(&self) -> Option<&RunnerValue> {
        None
    }

    fn new_value(&self) -> &RunnerValue {
        &self.initial
    }

    fn validate(&self) -> Validation {
        if self.initial.callback.is_none() {
            return Validation::invalid("a runner must have a callback");
        }
        match self.initial.time_to_live {
            None => return Validation::invalid("a runner must have a time to live"),
            Some(ttl) if ttl <= 0 => {
                return Validation::invalid("a runner time to live must be positive");
            }
            Some(_) => {}
        }
        let Some(competencies) = &self.initial.competencies else {
            return Validation::invalid("a runner must have competencies");
        };
        if competencies.categories.is_none() {
            return Validation::invalid("runner competencies must have categories set");
        }
        if competencies.names.is_none() {
            return Validation::invalid("runner competencies must have names set");
        }
        Validation::valid()
    }

    fn applied(&self) -> RunnerValue {
        self.applied_at(Utc::now())
    }
}

/// Update of a registered runner; trusted as-is
#[derive(Debug, Clone)]
pub struct RunnerValueChange {
    current: RunnerValue,
    proposed: RunnerValue,
}

impl RunnerValueChange {
    pub fn from(current: RunnerValue, proposed: RunnerValue) -> Self {
        Self { current, proposed }
    }
}

impl Change<RunnerValue> for RunnerValueChange {
    fn current_value(&self) -> Option<&RunnerValue> {
        Some(&self.current)
    }

    fn new_value(&self) -> &RunnerValue {
        &self.proposed
    }

    fn validate(&self) -> Validation {
        Validation::valid()
    }

    fn applied(&self) -> RunnerValue {
        self.proposed.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::runner::Competencies;

    fn runner() -> RunnerValue {
        RunnerValue {
            callback: Some("http://runner:9000".to_string()),
            time_to_live: Some(60),
            competencies: Some(Competencies::new(vec!["c.*".to_string()], vec![])),
            runtime: None,
        }
    }

    fn message(value: RunnerValue) -> Option<String> {
        RunnerValueCreation::with(value)
            .validate()
            .message()
            .map(str::to_string)
    }

    #[test]
    fn test_valid_registration() {
        assert!(RunnerValueCreation::with(runner()).validate().is_valid());
    }

    #[test]
    fn test_each_missing_field_has_its_own_message() {
        let mut messages = vec![
            message(RunnerValue {
                callback: None,
                ..runner()
            }),
            message(RunnerValue {
                time_to_live: None,
                ..runner()
            }),
            message(RunnerValue {
                time_to_live: Some(0),
                ..runner()
            }),
            message(RunnerValue {
                competencies: None,
                ..runner()
            }),
            message(RunnerValue {
                competencies: Some(Competencies {
                    categories: None,
                    names: Some(vec![]),
                }),
                ..runner()
            }),
            message(RunnerValue {
                competencies: Some(Competencies {
                    categories: Some(vec![]),
                    names: None,
                }),
                ..runner()
            }),
        ];

        assert!(messages.iter().all(Option::is_some));
        let count = messages.len();
        messages.sort();
        messages.dedup();
        assert_eq!(messages.len(), count);
    }

    #[test]
    fn test_negative_ttl_is_invalid() {
        assert_eq!(
            message(RunnerValue {
                time_to_live: Some(-5),
                ..runner()
            })
            .as_deref(),
            Some("a runner time to live must be positive")
        );
    }

    #[test]
    fn test_creation_defaults_runtime() {
        let now = Utc::now();
        let applied = RunnerValueCreation::with(runner()).applied_at(now);
        let runtime = applied.runtime.unwrap();
        assert_eq!(runtime.status, Some(RunnerStatus::Idle));
        assert_eq!(runtime.created, Some(now));
        assert_eq!(runtime.last_ping, Some(now));
    }

    #[test]
    fn test_creation_keeps_explicit_status_but_overrides_timestamps() {
        let old = Utc::now() - chrono::Duration::hours(1);
        let initial = RunnerValue {
            runtime: Some(Runtime {
                status: Some(RunnerStatus::Running),
                created: Some(old),
                last_ping: Some(old),
            }),
            ..runner()
        };

        let now = Utc::now();
        let runtime = RunnerValueCreation::with(initial)
            .applied_at(now)
            .runtime
            .unwrap();
        assert_eq!(runtime.status, Some(RunnerStatus::Running));
        assert_eq!(runtime.created, Some(now));
        assert_eq!(runtime.last_ping, Some(now));
    }

    #[test]
    fn test_runner_change_is_identity() {
        let current = RunnerValueCreation::with(runner()).applied();
        let proposed = current.pinged(RunnerStatus::Running, Utc::now());
        let change = RunnerValueChange::from(current, proposed.clone());
        assert!(change.validate().is_valid());
        assert_eq!(change.applied(), proposed);
    }
}
