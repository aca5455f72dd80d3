//! ECDSA P-256 / SHA-256 signing and verification.
//!
//! Requests are signed over their canonical payload bytes:
//!
//! 1. digest = SHA-256(payload)
//! 2. (r, s) = ECDSA-P256(private_key, digest), s normalized to the low half
//! 3. signature = base64(DER(r, s))
//!
//! Verification recomputes the digest over the exact received bytes.
//! Nothing here knows about JSON; a whitespace change is a different message.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use p256::ecdsa::signature::{DigestSigner, DigestVerifier, RandomizedDigestSigner};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::identity::{KeyPair, PublicKey};

/// How the per-signature nonce is chosen. Both verify identically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NonceMode {
    /// RFC 6979 nonce hedged with fresh OS randomness; every signature differs.
    #[default]
    Randomized,
    /// Plain RFC 6979; the same payload and key always give the same signature.
    Deterministic,
}

/// A DER-encoded ECDSA signature, checked to be well-formed on construction.
#[derive(Clone, PartialEq, Eq)]
pub struct Signature {
    inner: p256::ecdsa::Signature,
    der: Vec<u8>,
}

impl Signature {
    /// Parse DER bytes (ASN.1 SEQUENCE of INTEGER r, INTEGER s).
    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        let inner = p256::ecdsa::Signature::from_der(bytes)
            .map_err(|e| Error::InvalidSignatureEncoding(format!("malformed DER: {e}")))?;
        Ok(Self { inner, der: bytes.to_vec() })
    }

    /// Parse the base64 transport form.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| Error::InvalidSignatureEncoding(format!("malformed base64: {e}")))?;
        Self::from_der(&bytes)
    }

    fn from_ecdsa(inner: p256::ecdsa::Signature) -> Self {
        let der = inner.to_der().as_bytes().to_vec();
        Self { inner, der }
    }

    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// Base64 of the DER bytes, as carried in the `signature` header.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.der)
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({})", self.to_base64())
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_base64())
    }
}

/// Sign a message with a P-256 key.
pub fn sign(key: &KeyPair, message: &[u8], nonce: NonceMode) -> Result<Signature> {
    let digest = Sha256::new_with_prefix(message);
    let signing_key = key.signing_key();
    let signature = match nonce {
        NonceMode::Randomized => RandomizedDigestSigner::<Sha256, p256::ecdsa::Signature>::try_sign_digest_with_rng(
            signing_key,
            &mut OsRng,
            digest,
        ),
        NonceMode::Deterministic => {
            DigestSigner::<Sha256, p256::ecdsa::Signature>::try_sign_digest(signing_key, digest)
        }
    }
    .map_err(|e| Error::InvalidKey(format!("signing failed: {e}")))?;

    let signature = signature.normalize_s().unwrap_or(signature);
    Ok(Signature::from_ecdsa(signature))
}

/// Verify a signature over a message.
///
/// `false` means the signature is well-formed but does not match this
/// message under this key.
pub fn verify(public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool {
    let digest = Sha256::new_with_prefix(message);
    public_key
        .verifying_key()
        .verify_digest(digest, &signature.inner)
        .is_ok()
}

/// Verify a base64 transport signature. Fails only when the signature
/// itself cannot be decoded.
pub fn verify_base64(public_key: &PublicKey, message: &[u8], signature: &str) -> Result<bool> {
    let signature = Signature::from_base64(signature)?;
    Ok(verify(public_key, message, &signature))
}
