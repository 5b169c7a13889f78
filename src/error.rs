//! Centralized error types for ewsharvest.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the ewsharvest library.
#[derive(Error, Debug)]
pub enum HarvestError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The server rejected the supplied credentials.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The HTTP request could not be completed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// An EWS response message reported an error.
    #[error("Exchange returned {code}: {message}")]
    Service { code: String, message: String },

    /// The server answered with a SOAP fault.
    #[error("SOAP fault: {0}")]
    Fault(String),

    /// The response body was not the XML we expected.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The configuration is invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// An attachment name or subject cannot be used as a file name.
    #[error("Cannot store artifact under name '{0}'")]
    InvalidName(String),

    /// Standard input ended before all credentials were entered.
    #[error("Input closed before credentials were entered")]
    InputClosed,
}

/// Convenience alias for `Result<T, HarvestError>`.
pub type Result<T> = std::result::Result<T, HarvestError>;

impl HarvestError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` when no path is involved (terminal I/O).
impl From<std::io::Error> for HarvestError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<terminal>"),
            source,
        }
    }
}

impl From<reqwest::Error> for HarvestError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<quick_xml::Error> for HarvestError {
    fn from(err: quick_xml::Error) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}
