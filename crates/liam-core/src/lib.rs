//! # liam-core
//!
//! Request signing for the LIAM memory API:
//! - Canonical JSON encoding of request bodies
//! - SHA-256 payload digests
//! - P-256 key material (SEC1 and PKCS#8 PEM)
//! - ECDSA signing and verification (DER, base64 on the wire)
//! - Authenticated request envelopes and the server-side verifier
//!
//! This crate has no network code and no storage code.
//! Every operation is a pure function of its inputs and the read-only key
//! material, so requests can be signed concurrently without locking.

pub mod encoding;
pub mod envelope;
pub mod error;
pub mod hash;
pub mod identity;
pub mod signing;
pub mod verifier;

pub use encoding::{CanonicalPayload, Canonicalizer, KeyOrder, Value, canonicalize};
pub use envelope::{AuthenticatedEnvelope, Credentials, RequestSigner};
pub use error::{AuthFailure, Error, Result};
pub use hash::PayloadDigest;
pub use identity::{KeyPair, PublicKey};
pub use signing::{NonceMode, Signature};
pub use verifier::{KeyRegistry, Verifier};
