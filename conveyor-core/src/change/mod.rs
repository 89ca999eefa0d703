//! Validated value changes
//!
//! A change pairs the current value of an entity (absent on creation) with a
//! proposed value. Callers first `validate()` the change and only when it passes
//! ask for the `applied()` value, which carries the fields the lifecycle derives
//! (timestamps, forced statuses). `applied()` on an invalid change is
//! unspecified.

mod job;
mod runner;

pub use job::{JobValueChange, JobValueCreation};
pub use runner::{RunnerValueChange, RunnerValueCreation};

use serde::{Deserialize, Serialize};

/// Outcome of a change validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    valid: bool,
    message: Option<String>,
}

impl Validation {
    pub fn valid() -> Self {
        Self {
            valid: true,
            message: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: Some(message.into()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// A proposed transition from a current value to a new one
pub trait Change<V> {
    /// The value before the change, `None` when the change creates the entity
    fn current_value(&self) -> Option<&V>;

    /// The value proposed by the caller
    fn new_value(&self) -> &V;

    /// Checks the lifecycle rules for this transition
    fn validate(&self) -> Validation;

    /// The value to persist; only meaningful once `validate()` passed
    fn applied(&self) -> V;
}
