//! Versioned entity wrapper

use serde::{Deserialize, Serialize};

/// A stored value with its identity and optimistic-concurrency version
///
/// On the wire the value's fields sit beside `id` and `version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity<V> {
    pub id: String,
    pub version: u64,
    #[serde(flatten)]
    pub value: V,
}

impl<V> Entity<V> {
    pub fn new(id: impl Into<String>, version: u64, value: V) -> Self {
        Self {
            id: id.into(),
            version,
            value,
        }
    }

    /// Same identity and version, different value
    pub fn with_value(&self, value: V) -> Self {
        Self {
            id: self.id.clone(),
            version: self.version,
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::job::{JobValue, RunStatus};

    #[test]
    fn test_value_is_flattened() {
        let job = Entity::new(
            "j1",
            3,
            JobValue::builder()
                .name("n")
                .category("c")
                .build()
                .with_status(RunStatus::Pending, None),
        );

        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["id"], "j1");
        assert_eq!(json["version"], 3);
        assert_eq!(json["name"], "n");
        assert_eq!(json["status"]["run"], "PENDING");

        let back: Entity<JobValue> = serde_json::from_value(json).unwrap();
        assert_eq!(back, job);
    }
}
