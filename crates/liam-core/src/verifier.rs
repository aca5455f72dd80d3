//! Server-side mirror of request signing.
//!
//! Given the `apiKey` header, the `signature` header and the raw body bytes
//! exactly as received:
//!
//! 1. Look up the public key registered for the API key
//! 2. Decode the signature (base64, then DER)
//! 3. In strict mode, check the body already is in canonical form
//! 4. Verify ECDSA-P256 over SHA-256(body)
//!
//! The body is never parsed and re-encoded before verification.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::encoding::Canonicalizer;
use crate::envelope::{API_KEY_HEADER, AuthenticatedEnvelope, SIGNATURE_HEADER};
use crate::error::{AuthFailure, Error, Result};
use crate::hash::PayloadDigest;
use crate::identity::PublicKey;
use crate::signing::{self, Signature};

/// Public keys of known callers, by API key identifier.
#[derive(Debug, Default, Clone)]
pub struct KeyRegistry {
    keys: HashMap<String, PublicKey>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a caller. Returns the key previously registered under this id.
    pub fn register(&mut self, api_key: impl Into<String>, public_key: PublicKey) -> Option<PublicKey> {
        self.keys.insert(api_key.into(), public_key)
    }

    pub fn get(&self, api_key: &str) -> Option<&PublicKey> {
        self.keys.get(api_key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Accepts exactly the requests a [`RequestSigner`](crate::envelope::RequestSigner) produces.
#[derive(Debug, Clone)]
pub struct Verifier {
    registry: KeyRegistry,
    strict: Option<Canonicalizer>,
}

impl Verifier {
    pub fn new(registry: KeyRegistry) -> Self {
        Self { registry, strict: None }
    }

    /// Also reject bodies that are not already canonical under `canonicalizer`.
    pub fn strict(mut self, canonicalizer: Canonicalizer) -> Self {
        self.strict = Some(canonicalizer);
        self
    }

    pub fn registry(&self) -> &KeyRegistry {
        &self.registry
    }

    /// Verify an inbound request from its header values and raw body.
    pub fn verify(&self, api_key: Option<&str>, signature: Option<&str>, body: &[u8]) -> Result<()> {
        let result = self.check(api_key, signature, body);
        match &result {
            Ok(()) => debug!(api_key, digest = %PayloadDigest::digest(body), "request authenticated"),
            Err(e) => warn!(api_key, error = %e, "request rejected"),
        }
        result.map_err(Error::from)
    }

    /// Verify an envelope as if it had just arrived over the wire.
    pub fn verify_envelope(&self, envelope: &AuthenticatedEnvelope) -> Result<()> {
        let signature = envelope.signature().to_base64();
        self.verify(Some(envelope.api_key()), Some(&signature), envelope.body().as_bytes())
    }

    fn check(
        &self,
        api_key: Option<&str>,
        signature: Option<&str>,
        body: &[u8],
    ) -> std::result::Result<(), AuthFailure> {
        let api_key = api_key.ok_or(AuthFailure::MissingHeader(API_KEY_HEADER))?;
        let public_key = self
            .registry
            .get(api_key)
            .ok_or_else(|| AuthFailure::UnknownApiKey(api_key.to_string()))?;

        let signature = signature.ok_or(AuthFailure::MissingHeader(SIGNATURE_HEADER))?;
        let signature =
            Signature::from_base64(signature).map_err(|e| AuthFailure::MalformedSignature(e.to_string()))?;

        if let Some(canonicalizer) = &self.strict {
            if !canonicalizer.is_canonical(body) {
                return Err(AuthFailure::NonCanonicalBody);
            }
        }

        if signing::verify(public_key, body, &signature) {
            Ok(())
        } else {
            Err(AuthFailure::SignatureMismatch)
        }
    }
}
