//! SHA-256 digests of canonical payloads.
//!
//! - `digest = SHA-256(canonical_payload_bytes)`
//!
//! ECDSA signs this digest; it is also what logs show to correlate a
//! request on both sides without printing the body.

use sha2::{Digest, Sha256};

/// Length of a SHA-256 output in bytes (256 bits).
pub const DIGEST_LEN: usize = 32;

/// A SHA-256 digest (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PayloadDigest([u8; DIGEST_LEN]);

impl PayloadDigest {
    /// Compute the SHA-256 digest of arbitrary bytes.
    pub fn digest(data: &[u8]) -> Self {
        let mut out = [0u8; DIGEST_LEN];
        out.copy_from_slice(&Sha256::digest(data));
        Self(out)
    }

    /// Get the raw bytes of this digest.
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Encode as lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Debug for PayloadDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PayloadDigest({})", self.to_hex())
    }
}

impl std::fmt::Display for PayloadDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
