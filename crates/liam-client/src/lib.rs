//! # liam-client
//!
//! Signed HTTP access to the LIAM memory API:
//! - Configuration from TOML and `LIAM_*` environment variables
//! - An HTTP transport that posts envelopes byte-for-byte
//! - Typed profile and memory calls on top of `liam-core` signing
//!
//! Every request is canonicalized and signed by `liam-core`; this crate
//! only decides where the envelope goes and how the answer is decoded.

pub mod api;
pub mod config;
pub mod error;
pub mod transport;

pub use api::{LiamClient, UserKey};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use transport::{HttpTransport, Transport};
