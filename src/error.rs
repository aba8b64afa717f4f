//! Error types for m3u-sweep
//!
//! Two layers of errors exist:
//! - [`Error`] is fatal to a run (input cannot be read, output cannot be
//!   written, invalid configuration, cancellation).
//! - [`ProbeError`] describes why a single URL failed its liveness probe. It is
//!   recorded inside that URL's [`ProbeResult`](crate::types::ProbeResult) and
//!   never aborts the run.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for m3u-sweep operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for m3u-sweep
#[derive(Debug, Error)]
pub enum Error {
    /// The input playlist does not exist
    #[error("input playlist not found: {}", path.display())]
    InputNotFound {
        /// Path that was looked up
        path: PathBuf,
    },

    /// The input playlist exists but could not be read or decoded
    #[error("input playlist {} is unreadable: {reason}", path.display())]
    InputUnreadable {
        /// Path of the playlist
        path: PathBuf,
        /// Underlying cause (permission denied, invalid UTF-8, ...)
        reason: String,
    },

    /// The cleaned playlist could not be written or moved into place
    #[error("failed to write output playlist {}: {reason}", path.display())]
    OutputWrite {
        /// Final destination path
        path: PathBuf,
        /// Underlying cause
        reason: String,
    },

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "concurrency_limit")
        key: Option<String>,
    },

    /// The HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// I/O error outside of input/output playlist handling (e.g. config file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The run was interrupted before the output was written
    #[error("validation cancelled before output was written")]
    Cancelled,

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error for a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Map an I/O error raised while opening/reading the input playlist
    pub fn from_input_io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            std::io::ErrorKind::NotFound => Error::InputNotFound { path },
            _ => Error::InputUnreadable {
                path,
                reason: err.to_string(),
            },
        }
    }

    /// Map an I/O error raised while writing or renaming the output playlist
    pub fn output_write(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::OutputWrite {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Per-URL probe failure
///
/// These never escalate: the engine stores them in the URL's result and the
/// URL is classified as non-working.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    /// No response within the per-request timeout
    #[error("timed out after {}s", after.as_secs_f64())]
    Timeout {
        /// The configured timeout
        after: Duration,
    },

    /// Connection could not be established (refused, DNS failure, TLS handshake)
    #[error("connection failed: {0}")]
    Connect(String),

    /// The redirect chain exceeded the configured limit
    #[error("too many redirects")]
    TooManyRedirects,

    /// The URL could not be parsed into a requestable address
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Any other transport-level failure
    #[error("request failed: {0}")]
    Request(String),
}

impl ProbeError {
    /// Classify a reqwest error into a probe failure
    pub fn from_reqwest(err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            ProbeError::Timeout { after: timeout }
        } else if err.is_redirect() {
            ProbeError::TooManyRedirects
        } else if err.is_connect() {
            ProbeError::Connect(root_cause(err))
        } else if err.is_builder() {
            ProbeError::InvalidUrl(err.to_string())
        } else {
            ProbeError::Request(root_cause(err))
        }
    }
}

/// Walk the source chain down to the innermost message.
///
/// reqwest's top-level message only repeats the URL; the useful part
/// ("Connection refused", "dns error") sits at the bottom of the chain.
fn root_cause(err: &(dyn std::error::Error + 'static)) -> String {
    let mut current = err;
    while let Some(next) = current.source() {
        current = next;
    }
    current.to_string()
}

/// Map fatal errors to process exit codes and machine-readable codes
pub trait ToExitCode {
    /// Process exit code for this error
    fn exit_code(&self) -> i32;

    /// Machine-readable error code (used in JSON output)
    fn error_code(&self) -> &str;
}

impl ToExitCode for Error {
    fn exit_code(&self) -> i32 {
        match self {
            Error::InputNotFound { .. } => 2,
            Error::InputUnreadable { .. } => 3,
            Error::OutputWrite { .. } => 4,
            Error::Config { .. } => 5,
            Error::Cancelled => 130,
            Error::HttpClient(_) | Error::Io(_) | Error::Other(_) => 1,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::InputNotFound { .. } => "input_not_found",
            Error::InputUnreadable { .. } => "input_unreadable",
            Error::OutputWrite { .. } => "output_write_error",
            Error::Config { .. } => "config_error",
            Error::HttpClient(_) => "http_client_error",
            Error::Io(_) => "io_error",
            Error::Cancelled => "cancelled",
            Error::Other(_) => "internal_error",
        }
    }
}
