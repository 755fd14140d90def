//! CLI error types and exit codes

use thiserror::Error;

use solidrock_connector::error::ConnectorError;
use solidrock_sync::{StoreError, SyncError};

/// Exit codes for the CLI
/// - 0: Success
/// - 1: General error
/// - 3: Network error
/// - 4: Configuration error
/// - 6: Sync already running
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Sync(#[from] SyncError),

    #[error("Remote error: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(String),
}

impl CliError {
    /// Get the exit code for this error
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 4,
            CliError::Sync(SyncError::Configuration { .. }) => 4,
            CliError::Sync(SyncError::AlreadyRunning { .. }) => 6,
            CliError::Sync(SyncError::Connector(_)) | CliError::Connector(_) => 3,
            CliError::Sync(_) | CliError::Store(_) | CliError::Io(_) => 1,
        }
    }

    /// Print the error to stderr
    pub fn print(&self) {
        eprintln!("Error: {self}");
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Io(err.to_string())
    }
}
