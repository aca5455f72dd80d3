//! Error types for liam-core.

use thiserror::Error;

/// Why the verification side refused a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("unknown API key: {0}")]
    UnknownApiKey(String),

    #[error("missing header: {0}")]
    MissingHeader(&'static str),

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("signature does not match payload")]
    SignatureMismatch,

    #[error("body is not in canonical form")]
    NonCanonicalBody,
}

/// Errors that can occur while encoding, signing or verifying a request.
#[derive(Debug, Error)]
pub enum Error {
    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("invalid signature encoding: {0}")]
    InvalidSignatureEncoding(String),

    #[error("authentication failed: {0}")]
    AuthenticationFailed(#[from] AuthFailure),
}

impl Error {
    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Encoding(_) => "EncodingError",
            Error::InvalidKey(_) => "InvalidKeyError",
            Error::InvalidSignatureEncoding(_) => "InvalidSignatureEncodingError",
            Error::AuthenticationFailed(_) => "AuthenticationFailed",
        }
    }
}

/// Result type alias for liam-core operations.
pub type Result<T> = std::result::Result<T, Error>;
