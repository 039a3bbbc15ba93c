//! Remote mirror error types.

use thiserror::Error;

/// Errors raised while talking to the remote document store.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote returned status {status} for {path}")]
    Status { status: u16, path: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Invalid document {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("Invalid remote URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Remote unavailable: {0}")]
    Unavailable(String),
}
