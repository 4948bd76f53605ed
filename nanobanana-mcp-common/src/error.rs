//! Error types for the Nano Banana MCP server.
//!
//! This module provides a unified error hierarchy using `thiserror`. Every
//! variant maps onto one of the externally visible [`ErrorKind`]s, which the
//! tool dispatcher uses to pick a protocol error code.
//!
//! # Error Categories
//!
//! - `Error::InvalidInput`: Bad arguments or a malformed credential
//! - `Error::PreconditionFailed`: Not configured, no previous image, previous image missing
//! - `Error::File` / `Error::Io`: File system operations
//! - `Error::GenerationFailed`: The backend answered without any image
//! - `Error::ModelUnavailable`: Every model candidate was rejected as unavailable
//! - `Error::MethodNotFound`: Unknown tool name
//! - `Error::Api`, `Error::Json`, `Error::Config`, `Error::Internal`: wrapped as internal errors

use std::fmt;
use std::path::Path;

use thiserror::Error;

/// Unified error type for the Nano Banana MCP server.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration errors (invalid environment values)
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Invalid caller input (empty prompt, malformed credential, bad arguments)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A precondition for the operation does not hold
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// File system error tied to a specific path
    #[error("I/O error for {path}: {source}")]
    File {
        /// The path that was being read or written
        path: String,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// File system I/O errors without path context
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// API errors with endpoint and HTTP status context
    ///
    /// The message holds the response body, which the model resolver inspects
    /// to tell "model unavailable" apart from other failures.
    #[error("API error for {endpoint} (HTTP {status_code}): {message}")]
    Api {
        /// The API endpoint that was called
        endpoint: String,
        /// HTTP status code returned by the API (0 when no response arrived)
        status_code: u16,
        /// Error message from the API or describing the failure
        message: String,
    },

    /// The backend produced no image
    #[error("Image generation failed: {0}")]
    GenerationFailed(String),

    /// All model candidates were rejected as unavailable
    #[error("No available image model (tried: {}): {last_error}", .tried.join(", "))]
    ModelUnavailable {
        /// Candidates in the order they were tried
        tried: Vec<String>,
        /// Message of the last recoverable failure
        last_error: String,
    },

    /// Unknown tool name
    #[error("Unknown tool: {0}")]
    MethodNotFound(String),

    /// JSON (de)serialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Anything else
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new API error with endpoint, status code, and message.
    ///
    /// # Example
    ///
    /// ```
    /// use nanobanana_mcp_common::error::Error;
    ///
    /// let err = Error::api(
    ///     "https://generativelanguage.googleapis.com/v1beta/models/x:generateContent",
    ///     404,
    ///     "models/x is not found"
    /// );
    /// assert!(err.to_string().contains("404"));
    /// assert!(err.to_string().contains("not found"));
    /// ```
    pub fn api(endpoint: impl Into<String>, status_code: u16, message: impl Into<String>) -> Self {
        Error::Api {
            endpoint: endpoint.into(),
            status_code,
            message: message.into(),
        }
    }

    /// Create a new invalid input error.
    ///
    /// # Example
    ///
    /// ```
    /// use nanobanana_mcp_common::error::Error;
    ///
    /// let err = Error::invalid_input("prompt cannot be empty");
    /// assert!(err.to_string().contains("prompt cannot be empty"));
    /// ```
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Error::InvalidInput(message.into())
    }

    /// Create a new precondition failure.
    pub fn precondition(message: impl Into<String>) -> Self {
        Error::PreconditionFailed(message.into())
    }

    /// Create a new file error for the given path.
    pub fn file(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Error::File {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Create a new generation failure.
    pub fn generation_failed(message: impl Into<String>) -> Self {
        Error::GenerationFailed(message.into())
    }

    /// Create a new internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal(message.into())
    }

    /// The externally visible kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::PreconditionFailed(_) => ErrorKind::PreconditionFailed,
            Error::File { .. } | Error::Io(_) => ErrorKind::IoError,
            Error::GenerationFailed(_) => ErrorKind::GenerationFailed,
            Error::ModelUnavailable { .. } => ErrorKind::ModelUnavailable,
            Error::MethodNotFound(_) => ErrorKind::MethodNotFound,
            Error::Config(_) | Error::Api { .. } | Error::Json(_) | Error::Internal(_) => {
                ErrorKind::InternalError
            }
        }
    }
}

/// Error kinds reported to protocol clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad arguments or credential format
    InvalidInput,
    /// Not configured, no previous image, previous image missing
    PreconditionFailed,
    /// Unreadable input or unwritable output
    IoError,
    /// The backend returned zero images
    GenerationFailed,
    /// All model candidates exhausted
    ModelUnavailable,
    /// Unknown operation
    MethodNotFound,
    /// Catch-all
    InternalError,
}

impl ErrorKind {
    /// Stable name used in error payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::PreconditionFailed => "PreconditionFailed",
            ErrorKind::IoError => "IOError",
            ErrorKind::GenerationFailed => "GenerationFailed",
            ErrorKind::ModelUnavailable => "ModelUnavailable",
            ErrorKind::MethodNotFound => "MethodNotFound",
            ErrorKind::InternalError => "InternalError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration errors.
///
/// These errors occur when loading or validating configuration from
/// environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl ConfigError {
    /// Create a new invalid value error.
    pub fn invalid_value(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue(name.into(), reason.into())
    }
}

/// Result type alias using the unified Error type.
pub type Result<T> = std::result::Result<T, Error>;
