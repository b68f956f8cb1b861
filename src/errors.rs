//! Client Error Hierarchy
//!
//! Errors are grouped by the layer that produced them: the HTTP transport,
//! the remote agent (non-success status), response decoding, configuration
//! and the caller's own watch callbacks.

use std::time::Duration;

use config::ConfigError;

use crate::ResourceIndex;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Connectivity and timeout failures. Never retried by the executor.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Agent answered with a non-2xx status.
    ///
    /// `index` carries the resource index header of the failed response,
    /// zero when the header was absent.
    #[error("Remote error {status}: {body}")]
    Remote {
        status: u16,
        body: String,
        index: ResourceIndex,
    },

    /// Response body could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Settings loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A watch callback asked the loop to stop with a failure
    #[error("Watch callback failed: {0}")]
    Callback(String),

    /// Unrecoverable failures
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Request did not complete in time
    #[error("Request to {path} timed out after {duration:?}")]
    Timeout { path: String, duration: Duration },

    /// TCP connect failures
    #[error("Failed to connect to agent: {0}")]
    Connect(String),

    /// Malformed agent address
    #[error("Invalid agent address: {0}")]
    InvalidAddress(String),

    /// Any other HTTP client failure
    #[error("Failed to send {method} {path}")]
    Request {
        method: &'static str,
        path: String,
        #[source]
        source: Box<reqwest::Error>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Malformed JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed base64 value for key {key}: {source}")]
    Base64 {
        key: String,
        #[source]
        source: base64::DecodeError,
    },
}

impl Error {
    /// Builds a [`Error::Remote`] from a raw response.
    pub(crate) fn remote(
        status: u16,
        body: &[u8],
        index: ResourceIndex,
    ) -> Self {
        Error::Remote {
            status,
            body: String::from_utf8_lossy(body).trim().to_string(),
            index,
        }
    }

    /// Resource index attached to the failed response, if any.
    pub fn index(&self) -> Option<ResourceIndex> {
        match self {
            Error::Remote { index, .. } if !index.is_zero() => Some(*index),
            _ => None,
        }
    }

    /// HTTP status of a remote failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Failures a polling loop backs off on: connectivity problems and
    /// non-success responses. Decode, config and callback errors are final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Remote { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(DecodeError::Json(e))
    }
}
