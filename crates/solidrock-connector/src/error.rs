//! Connector error types
//!
//! Error definitions with transient/permanent classification for retry logic.

use thiserror::Error;

use crate::types::Collection;

/// Error that can occur while talking to the remote API.
#[derive(Debug, Error)]
pub enum ConnectorError {
    // Connection errors (usually transient)
    /// Failed to establish connection to the remote API.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Request timed out.
    #[error("connection timeout after {timeout_secs} seconds")]
    ConnectionTimeout { timeout_secs: u64 },

    /// Remote API answered with a server-side or throttling status.
    #[error("remote API unavailable: {status} {reason}")]
    TargetUnavailable { status: u16, reason: String },

    // Authentication errors (permanent)
    /// Credentials or API key rejected.
    #[error("authentication failed: remote API returned {status}")]
    AuthenticationFailed { status: u16 },

    // Configuration errors (permanent)
    /// Connector configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    // Response errors
    /// Remote API answered with an unexpected client-side status.
    #[error("unexpected response from {endpoint}: {status} {reason}")]
    UnexpectedStatus {
        endpoint: String,
        status: u16,
        reason: String,
    },

    /// Response body could not be decoded.
    #[error("invalid data from {collection} endpoint: {message}")]
    InvalidData {
        collection: Collection,
        message: String,
    },
}

impl ConnectorError {
    /// Check if this error is transient and the request should be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ConnectorError::ConnectionFailed { .. }
                | ConnectorError::ConnectionTimeout { .. }
                | ConnectorError::TargetUnavailable { .. }
        )
    }

    /// Check if this error is permanent and retry won't help.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            ConnectorError::ConnectionFailed { .. } => "CONNECTION_FAILED",
            ConnectorError::ConnectionTimeout { .. } => "CONNECTION_TIMEOUT",
            ConnectorError::TargetUnavailable { .. } => "TARGET_UNAVAILABLE",
            ConnectorError::AuthenticationFailed { .. } => "AUTH_FAILED",
            ConnectorError::InvalidConfiguration { .. } => "INVALID_CONFIG",
            ConnectorError::UnexpectedStatus { .. } => "UNEXPECTED_STATUS",
            ConnectorError::InvalidData { .. } => "INVALID_DATA",
        }
    }

    // Convenience constructors

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        ConnectorError::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection failed error with source.
    pub fn connection_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::ConnectionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        ConnectorError::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create an invalid data error.
    pub fn invalid_data(collection: Collection, message: impl Into<String>) -> Self {
        ConnectorError::InvalidData {
            collection,
            message: message.into(),
        }
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(endpoint: &str, status: u16, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        match status {
            401 | 403 => ConnectorError::AuthenticationFailed { status },
            429 | 500..=599 => ConnectorError::TargetUnavailable { status, reason },
            _ => ConnectorError::UnexpectedStatus {
                endpoint: endpoint.to_string(),
                status,
                reason,
            },
        }
    }
}

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;
