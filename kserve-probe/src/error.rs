//! Error types for the probe.

/// HTTP-level failure on one of the three exchanges.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Connection refused or the bounded timeout elapsed.
    #[error("timed out or unreachable: {0}")]
    Timeout(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }

    /// Classify a reqwest failure.
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            TransportError::Timeout(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// Error types for probe operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Protocol(#[from] kserve_common::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Server not ready: {url}")]
    NotReady { url: String },

    #[error("Model not found: {model} v{version} (status {status})")]
    ModelNotFound {
        model: String,
        version: String,
        status: u16,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, Error>;
