//! Conveyor HTTP Client
//!
//! A simple, type-safe HTTP client for the Conveyor registry API.
//!
//! Both the runner and the CLI talk to the registry through this crate.
//!
//! # Example
//!
//! ```no_run
//! use conveyor_client::RegistryClient;
//! use conveyor_core::dto::job::CreateJob;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), conveyor_client::ClientError> {
//!     let client = RegistryClient::new("http://localhost:8080");
//!
//!     let job = client.launch_job(&CreateJob {
//!         name: Some("compile".to_string()),
//!         category: Some("build".to_string()),
//!         account_id: Some("a1".to_string()),
//!         arguments: vec!["make".to_string()],
//!     }).await?;
//!
//!     println!("Submitted job: {}", job.id);
//!     Ok(())
//! }
//! ```

pub mod error;
mod jobs;
mod runners;

// Re-export commonly used types
pub use error::{ClientError, Result};

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

/// HTTP client for the Conveyor registry API
///
/// Methods are organized into two groups:
/// - Job registry (submit, list, get, conditional patch)
/// - Runner registry (register, list, get, status notification)
#[derive(Debug, Clone)]
pub struct RegistryClient {
    /// Base URL of the registry (e.g., "http://localhost:8080")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl RegistryClient {
    /// Create a new registry client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the registry API (e.g., "http://localhost:8080")
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new registry client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    ///
    /// # Example
    /// ```
    /// use conveyor_client::RegistryClient;
    /// use reqwest::Client;
    /// use std::time::Duration;
    ///
    /// let http_client = Client::builder()
    ///     .timeout(Duration::from_secs(30))
    ///     .build()
    ///     .unwrap();
    ///
    /// let client = RegistryClient::with_client("http://localhost:8080", http_client);
    /// ```
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the registry
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Check the status code and deserialize the JSON body
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            return Err(Self::error_from(status, response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Check the status code of a response with no body of interest
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if !status.is_success() {
            return Err(Self::error_from(status, response).await);
        }

        Ok(())
    }

    /// Builds the error for a failure status, preferring the `error` field
    /// of the registry's JSON body over the raw text
    async fn error_from(status: reqwest::StatusCode, response: reqwest::Response) -> ClientError {
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        debug!("Registry answered {}: {}", status, text);
        ClientError::api_error(status.as_u16(), error_message(&text))
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = RegistryClient::new("http://localhost:8080");
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = RegistryClient::new("http://localhost:8080/");
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_error_message_prefers_json_field() {
        assert_eq!(
            error_message(r#"{"error":"version conflict on j1"}"#),
            "version conflict on j1"
        );
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_client_with_custom_client() {
        let http_client = Client::new();
        let client = RegistryClient::with_client("http://localhost:8080", http_client);
        assert_eq!(client.base_url(), "http://localhost:8080");
    }
}
