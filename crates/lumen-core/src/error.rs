//! Error types for the Lumen chat widget.

use thiserror::Error;

/// A shared error type for the entire Lumen workspace.
///
/// Every variant is recoverable: the controller surfaces it as a status line or
/// a transcript message and the session stays usable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LumenError {
    /// API key or passkey was empty after trimming
    #[error("Please enter both API Key and Passkey.")]
    MissingInput,

    /// Passkey digest did not match the reference digest
    #[error("Incorrect passkey.")]
    InvalidPasskey,

    /// Context resource answered with a non-success status
    #[error("Failed to load context file: {status}")]
    ContextFetchFailed { status: u16 },

    /// Context payload could not be decoded into UTF-8 text
    #[error("Failed to decode context file: {0}")]
    ContextDecodeFailed(String),

    /// Context resource could not be reached or read at all
    #[error("Failed to read context file: {0}")]
    ContextIo(String),

    /// Generation endpoint failed (transport error or non-success status)
    #[error("Generation request failed{}: {message}", status.map(|s| format!(" ({s})")).unwrap_or_default())]
    GenerationRequestFailed {
        status: Option<u16>,
        message: String,
    },

    /// Generation endpoint answered with a body of the wrong shape
    #[error("Malformed generation response: {0}")]
    GenerationResponseMalformed(String),

    /// The user cancelled the in-flight generation
    #[error("Generation stopped by user")]
    GenerationAborted,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LumenError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a GenerationRequestFailed error without an HTTP status
    pub fn request_failed(message: impl Into<String>) -> Self {
        Self::GenerationRequestFailed {
            status: None,
            message: message.into(),
        }
    }

    /// Creates a GenerationRequestFailed error carrying the HTTP status
    pub fn request_failed_with_status(status: u16, message: impl Into<String>) -> Self {
        Self::GenerationRequestFailed {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Creates a GenerationResponseMalformed error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::GenerationResponseMalformed(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a user cancellation rather than a failure
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::GenerationAborted)
    }

    /// Check if this error came from loading the context resource
    pub fn is_context_error(&self) -> bool {
        matches!(
            self,
            Self::ContextFetchFailed { .. } | Self::ContextDecodeFailed(_) | Self::ContextIo(_)
        )
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for LumenError {
    fn from(err: std::io::Error) -> Self {
        Self::ContextIo(format!("{} (kind: {:?})", err, err.kind()))
    }
}

impl From<toml::de::Error> for LumenError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("TOML - {err}"))
    }
}

/// A type alias for `Result<T, LumenError>`.
pub type Result<T> = std::result::Result<T, LumenError>;
