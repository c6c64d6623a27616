//! Error types module
//!
//! All failures the client can observe are unified under [`AppError`]. The
//! variants map onto the failure taxonomy the sync layer cares about:
//! per-file validation rejections, transport-level failures (connection,
//! non-2xx, unusable body) and local configuration or file errors.
//!
//! `AppError` is `Clone` so a single failed fetch can be handed to every
//! caller that joined it.

use std::io;

use crate::validation::ValidationError;

pub type AppResult<T> = Result<T, AppError>;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like a rejected payload
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Describes how an error should be presented to the user
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "TRANSPORT_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether retrying the same action by hand can succeed
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the user
    fn suggested_action(&self) -> Option<&'static str>;

    /// User-facing message
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Invalid response body: {0}")]
    Decode(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::Decode(err.to_string())
        } else {
            AppError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Decode(format!("JSON parsing error: {}", err))
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

/// Static metadata for each variant: (error_code, recoverable, suggested_action, log_level).
fn app_error_static_metadata(err: &AppError) -> (&'static str, bool, Option<&'static str>, LogLevel) {
    match err {
        AppError::Transport(_) => (
            "TRANSPORT_ERROR",
            true,
            Some("Check the connection and try again"),
            LogLevel::Error,
        ),
        AppError::Api { status, .. } if *status >= 500 => (
            "SERVER_ERROR",
            true,
            Some("Retry after a short delay"),
            LogLevel::Error,
        ),
        AppError::Api { .. } => (
            "REQUEST_REJECTED",
            false,
            Some("Check request parameters and try again"),
            LogLevel::Warn,
        ),
        AppError::PayloadTooLarge(_) => (
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Remove large files from the selection"),
            LogLevel::Warn,
        ),
        AppError::Decode(_) => (
            "INVALID_RESPONSE",
            true,
            Some("Retry; contact the server operator if this persists"),
            LogLevel::Error,
        ),
        AppError::Validation(_) => (
            "VALIDATION_REJECTED",
            false,
            Some("Select a supported file"),
            LogLevel::Debug,
        ),
        AppError::Config(_) => (
            "CONFIG_ERROR",
            false,
            Some("Check VAULT_* environment variables"),
            LogLevel::Error,
        ),
        AppError::Io(_) => (
            "IO_ERROR",
            false,
            Some("Check the file path and permissions"),
            LogLevel::Warn,
        ),
    }
}

impl AppError {
    /// True for failures where the request never produced a usable response.
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            AppError::Transport(_)
                | AppError::Api { .. }
                | AppError::PayloadTooLarge(_)
                | AppError::Decode(_)
        )
    }
}

impl ErrorMetadata for AppError {
    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).1
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Transport(_) => "Could not reach the server".to_string(),
            AppError::Api { message, .. } => message.clone(),
            AppError::PayloadTooLarge(msg) => msg.clone(),
            AppError::Decode(_) => "The server sent an unexpected response".to_string(),
            AppError::Validation(err) => err.to_string(),
            AppError::Config(msg) => msg.clone(),
            AppError::Io(msg) => msg.clone(),
        }
    }
}
