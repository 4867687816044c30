//! Error types for QueryOptim

use thiserror::Error;

/// Core error type for QueryOptim operations
///
/// None of these are fatal. The workbench turns each one into a notification
/// or a log line and stays interactive.
#[derive(Error, Debug)]
pub enum QoptError {
    #[error("Please enter a SQL query")]
    EmptyInput,

    #[error("An analysis is already in progress")]
    AnalysisInFlight,

    #[error("Analysis failed: {0}")]
    Backend(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Clipboard access denied: {0}")]
    ClipboardDenied(String),

    #[error("Unknown view: {0}")]
    UnknownView(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cancelled")]
    Cancelled,
}

impl QoptError {
    /// Returns true if the user can fix this by changing their input
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::EmptyInput | Self::AnalysisInFlight)
    }
}

/// Result type alias for QueryOptim operations
pub type Result<T> = std::result::Result<T, QoptError>;
