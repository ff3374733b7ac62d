//! Error types for gateway operations.
//!
//! Mapping CRUD surfaces these errors to the caller as-is. The health pipeline
//! catches them at its boundaries and folds the text into report remarks.

use thiserror::Error;

/// Main error type for gateway operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Unknown or unmapped slot, or unknown device
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed mapping value, outlet out of range or missing field
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Vendor capability not implemented
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Persisted document could not be read or written
    #[error("I/O failure: {0}")]
    IoFailure(String),

    /// Outbound fetch to a device or the lease endpoint failed
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    /// Outbound fetch timed out
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Response body or image could not be decoded
    #[error("Decode failure: {0}")]
    DecodeFailure(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Specialized result type for gateway operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::Unsupported(_) => "UNSUPPORTED",
            Self::IoFailure(_) => "IO_FAILURE",
            Self::NetworkFailure(_) => "NETWORK_FAILURE",
            Self::Timeout(_) => "TIMEOUT",
            Self::DecodeFailure(_) => "DECODE_FAILURE",
            Self::ConfigError(_) => "CONFIG_ERROR",
        }
    }

    /// The error message without the variant prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg)
            | Self::InvalidArgument(msg)
            | Self::Unsupported(msg)
            | Self::IoFailure(msg)
            | Self::NetworkFailure(msg)
            | Self::Timeout(msg)
            | Self::DecodeFailure(msg)
            | Self::ConfigError(msg) => msg,
        }
    }

    /// Returns true if this error should be logged as a serious error.
    #[must_use]
    pub const fn should_log(&self) -> bool {
        matches!(self, Self::IoFailure(_) | Self::ConfigError(_))
    }

    /// Returns true for failures of an outbound call that may succeed on retry.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::NetworkFailure(_) | Self::Timeout(_))
    }
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::DecodeFailure(err.to_string())
        } else {
            Self::NetworkFailure(err.to_string())
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::IoFailure(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::DecodeFailure(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ConfigError(err.to_string())
    }
}
