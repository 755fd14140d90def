//! Sync error types.

use thiserror::Error;

use solidrock_connector::error::ConnectorError;
use solidrock_connector::types::Collection;

use crate::queue::QueueError;
use crate::store::StoreError;

/// Errors that can occur during synchronization.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Required setting missing or invalid.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Remote API error.
    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),

    /// Local store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Work queue error.
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    /// Remote record could not be mapped to local fields.
    #[error("Mapping error: {collection} record '{remote_id}' - {message}")]
    Mapping {
        collection: Collection,
        remote_id: String,
        message: String,
    },

    /// Another run holds the collection lock.
    #[error("Sync already running for {collection}")]
    AlreadyRunning { collection: Collection },

    /// Remote listing returned nothing usable.
    #[error("No remote data for {collection}")]
    NoRemoteData { collection: Collection },

    /// Not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Internal error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SyncError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a mapping error.
    pub fn mapping(
        collection: Collection,
        remote_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Mapping {
            collection,
            remote_id: remote_id.into(),
            message: message.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the failed work item should go back to the queue.
    ///
    /// Store rejections are retried; mapping and configuration failures are
    /// not, since the same input would fail the same way.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connector(e) => e.is_transient(),
            Self::Store(_) | Self::Queue(_) | Self::NoRemoteData { .. } => true,
            Self::Configuration { .. }
            | Self::Mapping { .. }
            | Self::AlreadyRunning { .. }
            | Self::NotFound { .. }
            | Self::Internal { .. } => false,
        }
    }

    /// Get an error code for classification.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "CONFIGURATION",
            Self::Connector(_) => "CONNECTOR",
            Self::Store(_) => "STORE",
            Self::Queue(_) => "QUEUE",
            Self::Mapping { .. } => "MAPPING",
            Self::AlreadyRunning { .. } => "ALREADY_RUNNING",
            Self::NoRemoteData { .. } => "NO_REMOTE_DATA",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Internal { .. } => "INTERNAL",
        }
    }
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::EntryId;

    #[test]
    fn test_retryable_classification() {
        assert!(SyncError::from(StoreError::rejected("Grace", "title required")).is_retryable());
        assert!(SyncError::from(ConnectorError::connection_failed("refused")).is_retryable());
        assert!(!SyncError::from(ConnectorError::AuthenticationFailed { status: 401 }).is_retryable());
        assert!(!SyncError::mapping(Collection::Jobs, "7", "no job object").is_retryable());
        assert!(!SyncError::configuration("No API URL provided in settings").is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = SyncError::mapping(Collection::Churches, "12", "missing gathering object");
        assert_eq!(
            err.to_string(),
            "Mapping error: churches record '12' - missing gathering object"
        );

        let err = SyncError::from(StoreError::NotFound {
            entry_id: EntryId::new(4),
        });
        assert!(err.to_string().contains('4'));
        assert_eq!(err.error_code(), "STORE");
    }
}
