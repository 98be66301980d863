//! Error types for askdb.
//!
//! Defines the main error enum used throughout the application.

use thiserror::Error;

/// Main error type for askdb operations.
#[derive(Error, Debug)]
pub enum AskdbError {
    /// Configuration errors (missing connection fields, unsupported dialect, bad config file).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database connection errors (host unreachable, auth failed, missing file, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Schema introspection errors (any metadata query failing mid-report).
    #[error("Introspection error: {0}")]
    Introspection(String),

    /// Query execution errors (syntax errors, constraint violations, etc.)
    #[error("Execution error: {0}")]
    Execution(String),

    /// LLM API errors (rate limits, auth, timeouts, etc.)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AskdbError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates an introspection error with the given message.
    pub fn introspection(msg: impl Into<String>) -> Self {
        Self::Introspection(msg.into())
    }

    /// Creates an execution error with the given message.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Creates an LLM error with the given message.
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "Configuration Error",
            Self::Connection(_) => "Connection Error",
            Self::Introspection(_) => "Introspection Error",
            Self::Execution(_) => "Execution Error",
            Self::Llm(_) => "LLM Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using AskdbError.
pub type Result<T> = std::result::Result<T, AskdbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_config() {
        let err = AskdbError::config("SQLite database path is required");
        assert_eq!(
            err.to_string(),
            "Configuration error: SQLite database path is required"
        );
        assert_eq!(err.category(), "Configuration Error");
    }

    #[test]
    fn test_error_display_connection() {
        let err = AskdbError::connection("Cannot connect to localhost:5432");
        assert_eq!(
            err.to_string(),
            "Connection error: Cannot connect to localhost:5432"
        );
        assert_eq!(err.category(), "Connection Error");
    }

    #[test]
    fn test_error_display_introspection() {
        let err = AskdbError::introspection("Failed to fetch columns for orders");
        assert_eq!(
            err.to_string(),
            "Introspection error: Failed to fetch columns for orders"
        );
        assert_eq!(err.category(), "Introspection Error");
    }

    #[test]
    fn test_error_display_execution() {
        let err = AskdbError::execution("no such column: emal");
        assert_eq!(err.to_string(), "Execution error: no such column: emal");
        assert_eq!(err.category(), "Execution Error");
    }

    #[test]
    fn test_error_display_llm() {
        let err = AskdbError::llm("Rate limited. Please wait.");
        assert_eq!(err.to_string(), "LLM error: Rate limited. Please wait.");
        assert_eq!(err.category(), "LLM Error");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AskdbError>();
    }
}
