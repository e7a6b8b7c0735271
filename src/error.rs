//! Error types for ugc-dl
//!
//! A single crate-wide [`Error`] covers every failure the engine can hit. Errors are
//! classified two ways:
//! - [`IsRetryable`](crate::retry::IsRetryable) decides whether a per-item operation is
//!   worth another attempt (network faults, HTTP error statuses, most I/O faults)
//! - [`Error::is_fatal`] marks storage exhaustion, which ends the whole run instead of
//!   a single item

use crate::types::ItemId;
use thiserror::Error;

/// Result type alias for ugc-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for ugc-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "endpoints.base_url")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error (connect, timeout, body read)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// Status code returned by the server
        status: u16,
        /// The requested URL
        url: String,
    },

    /// Detail page did not contain a recognisable asset link
    #[error("no asset link found for item {id}")]
    NoAssetLink {
        /// The item whose detail page was scanned
        id: ItemId,
    },

    /// Asset URL has no `ugc/<id>/` segment to name the local file after
    #[error("no local identifier in asset url {url}")]
    NoLocalIdentifier {
        /// The resolved asset URL
        url: String,
    },

    /// Asset served with a MIME type outside the extension map
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// Account identifier is not a positive integer
    #[error("invalid account id: {0:?}")]
    InvalidAccountId(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a [`Error::Config`] tied to a specific key
    pub(crate) fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }

    /// Returns true if the error means the output location cannot take any more writes.
    ///
    /// Fatal errors stop the download scheduler from admitting more work and are
    /// propagated to the caller rather than being folded into a per-item outcome.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::StorageFull | std::io::ErrorKind::ReadOnlyFilesystem
            ),
            _ => false,
        }
    }
}
