//! Repository layer
//!
//! Repositories abstract communication with the registry. They provide
//! simple, focused interfaces without any business logic, and classify
//! failures so that callers can tell a lost race from an unreachable
//! registry.
//!
//! All repositories are trait-based to enable testing with fakes.

mod jobs;
mod runners;

use conveyor_client::ClientError;
use thiserror::Error;

// Re-export traits
pub use jobs::JobRepository;
pub use runners::RunnerRepository;

// Re-export implementations
pub use jobs::HttpJobRepository;
pub use runners::HttpRunnerRepository;

/// Registry failure as seen by the runner
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No response was received; worth retrying
    #[error("registry unreachable: {0}")]
    Unreachable(String),

    /// The entity version moved on
    #[error("version conflict: {0}")]
    Conflict(String),

    /// The registry answered with a failure status
    #[error("registry rejected the request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The registry answered successfully with an unreadable body
    #[error("malformed registry response: {0}")]
    Malformed(String),
}

impl RegistryError {
    pub fn is_transient(&self) -> bool {
        matches!(self, RegistryError::Unreachable(_))
    }
}

impl From<ClientError> for RegistryError {
    fn from(err: ClientError) -> Self {
        if err.is_transport() {
            return RegistryError::Unreachable(err.to_string());
        }
        if err.is_conflict() {
            return RegistryError::Conflict(err.to_string());
        }
        match err {
            ClientError::ApiError { status, message } => {
                RegistryError::Rejected { status, message }
            }
            other => RegistryError::Malformed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_are_classified() {
        assert!(matches!(
            RegistryError::from(ClientError::api_error(409, "moved")),
            RegistryError::Conflict(_)
        ));
        assert!(matches!(
            RegistryError::from(ClientError::api_error(400, "exit status must be set")),
            RegistryError::Rejected { status: 400, .. }
        ));
        assert!(matches!(
            RegistryError::from(ClientError::ParseError("eof".into())),
            RegistryError::Malformed(_)
        ));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transient() {
        // Nothing listens on the discard port
        let client = conveyor_client::RegistryClient::new("http://127.0.0.1:9");
        let err = client.get_job("x").await.unwrap_err();

        let err = RegistryError::from(err);
        assert!(err.is_transient(), "{:?}", err);
    }
}
