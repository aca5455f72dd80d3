//! Authenticated request envelopes.
//!
//! An envelope is what the transport sends: the canonical body bytes plus
//! the `apiKey` and `signature` header fields. The body is encoded exactly
//! once, in [`RequestSigner::build`], and the same bytes are signed and
//! carried forward. The envelope exposes no way to swap the body afterwards.

use serde::Serialize;
use tracing::debug;

use crate::encoding::{CanonicalPayload, Canonicalizer, KeyOrder, Value, to_value};
use crate::error::Result;
use crate::hash::PayloadDigest;
use crate::identity::KeyPair;
use crate::signing::{self, NonceMode, Signature};

/// Header carrying the API key identifier.
pub const API_KEY_HEADER: &str = "apiKey";

/// Header carrying the base64 DER signature.
pub const SIGNATURE_HEADER: &str = "signature";

/// Content type of the canonical body.
pub const CONTENT_TYPE: &str = "application/json";

/// The long-lived API key and private key of one calling application.
pub struct Credentials {
    api_key: String,
    key_pair: KeyPair,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, key_pair: KeyPair) -> Self {
        Self { api_key: api_key.into(), key_pair }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("key_pair", &self.key_pair)
            .finish()
    }
}

/// A signed request, ready for the transport.
#[derive(Debug, Clone)]
pub struct AuthenticatedEnvelope {
    endpoint: String,
    api_key: String,
    signature: Signature,
    digest: PayloadDigest,
    body: CanonicalPayload,
}

impl AuthenticatedEnvelope {
    /// Endpoint path relative to the API base, e.g. `memory/create`.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// SHA-256 of the body; the value that was signed.
    pub fn digest(&self) -> PayloadDigest {
        self.digest
    }

    /// The exact bytes that were signed. Send these, never a re-encoding.
    pub fn body(&self) -> &CanonicalPayload {
        &self.body
    }

    /// Header fields to attach to the request, in a stable order.
    pub fn headers(&self) -> [(&'static str, String); 3] {
        [
            ("Content-Type", CONTENT_TYPE.to_string()),
            (API_KEY_HEADER, self.api_key.clone()),
            (SIGNATURE_HEADER, self.signature.to_base64()),
        ]
    }
}

/// Canonicalizes, signs and wraps request bodies for one set of credentials.
///
/// Holds nothing mutable; one signer can serve concurrent requests.
#[derive(Debug, Clone, Copy)]
pub struct RequestSigner<'a> {
    credentials: &'a Credentials,
    canonicalizer: Canonicalizer,
    nonce: NonceMode,
}

impl<'a> RequestSigner<'a> {
    pub fn new(credentials: &'a Credentials) -> Self {
        Self {
            credentials,
            canonicalizer: Canonicalizer::default(),
            nonce: NonceMode::default(),
        }
    }

    /// Set the key ordering rule of the canonical form.
    pub fn key_order(mut self, key_order: KeyOrder) -> Self {
        self.canonicalizer = Canonicalizer::new(key_order);
        self
    }

    /// Set the nonce mode.
    pub fn nonce(mut self, nonce: NonceMode) -> Self {
        self.nonce = nonce;
        self
    }

    /// Canonicalize, sign and build the envelope for one call.
    pub fn build(&self, endpoint: &str, body: &Value) -> Result<AuthenticatedEnvelope> {
        let body = self.canonicalizer.canonicalize(body)?;
        let digest = PayloadDigest::digest(body.as_bytes());
        let signature = signing::sign(self.credentials.key_pair(), body.as_bytes(), self.nonce)?;

        debug!(
            endpoint,
            api_key = self.credentials.api_key(),
            key = %self.credentials.key_pair().public_key().fingerprint(),
            %digest,
            "signed request"
        );

        Ok(AuthenticatedEnvelope {
            endpoint: endpoint.to_string(),
            api_key: self.credentials.api_key().to_string(),
            signature,
            digest,
            body,
        })
    }

    /// Same as [`build`](Self::build) for any serializable body.
    pub fn build_serialize<T: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &T,
    ) -> Result<AuthenticatedEnvelope> {
        self.build(endpoint, &to_value(body)?)
    }
}
