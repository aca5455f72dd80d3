//! Error types for liam-client.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Encoding, key or signature failure from the signing core.
    #[error(transparent)]
    Signing(#[from] liam_core::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Whether the server refused the request's credentials or signature.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, ClientError::Status { status: 401 | 403, .. })
    }
}

/// Result type alias for liam-client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
