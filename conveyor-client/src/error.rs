//! Error types for the Conveyor client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when using the Conveyor client
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never completed (connection refused, timeout, broken body)
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// The registry answered but refused the request
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Check if this error is an optimistic-lock conflict
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    /// Check if the request failed before any response was received
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::RequestFailed(e) if !e.is_decode())
    }

    /// Check if this error is a client error (4xx status)
    pub fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(status) if (400..500).contains(&status))
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self.status(), Some(status) if status >= 500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let conflict = ClientError::api_error(409, "version moved");
        assert!(conflict.is_conflict());
        assert!(conflict.is_client_error());
        assert!(!conflict.is_transport());

        let missing = ClientError::api_error(404, "no such job");
        assert!(missing.is_not_found());

        let down = ClientError::api_error(503, "unavailable");
        assert!(down.is_server_error());
        assert!(!down.is_client_error());
    }

    #[test]
    fn test_parse_error_is_not_transport() {
        let err = ClientError::ParseError("bad json".to_string());
        assert!(!err.is_transport());
        assert_eq!(err.status(), None);
    }
}
