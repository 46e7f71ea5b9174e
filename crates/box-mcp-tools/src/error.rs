//! Error types for `box-mcp-tools`.

use crate::redact::sanitize_reqwest_error;
use thiserror::Error;

/// Main error type for catalogue loading and tool calls.
#[derive(Error, Debug)]
pub enum BoxToolsError {
    /// Configuration errors (invalid catalogue, invalid base URL, inconsistent descriptor).
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Tool not found: {0}")]
    UnknownTool(String),

    /// A required parameter was absent or null. Raised before any network I/O.
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid argument '{name}': {message}")]
    InvalidArgument { name: String, message: String },

    /// Box answered with a non-2xx status. The body is passed through untouched.
    #[error("API returned {status}: {body}")]
    Http { status: u16, body: String },

    /// HTTP client errors (connection, TLS, body read). URLs are redacted.
    #[error("HTTP transport error: {0}")]
    Transport(String),
}

impl BoxToolsError {
    /// HTTP status of an upstream error response, if this is one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn invalid_argument(name: &str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.to_string(),
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for BoxToolsError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(sanitize_reqwest_error(&value))
    }
}

/// Result type alias for Box tool operations.
pub type Result<T> = std::result::Result<T, BoxToolsError>;
