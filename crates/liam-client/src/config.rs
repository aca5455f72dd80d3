//! Client configuration.
//!
//! Resolved from, lowest priority first:
//! built-in defaults → TOML file → `LIAM_*` environment variables.
//!
//! ```toml
//! base_url = "https://api.liam.netxd.com/api"
//! api_key = "..."
//! private_key_path = "keys/liam.pem"
//! nonce = "randomized"
//! key_order = "sorted"
//! timeout_secs = 30
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use liam_core::{Credentials, KeyOrder, KeyPair, NonceMode};
use serde::Deserialize;

use crate::error::{ClientError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.liam.netxd.com/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_BASE_URL: &str = "LIAM_BASE_URL";
pub const ENV_API_KEY: &str = "LIAM_API_KEY";
pub const ENV_PRIVATE_KEY_PATH: &str = "LIAM_PRIVATE_KEY_PATH";
pub const ENV_PRIVATE_KEY: &str = "LIAM_PRIVATE_KEY";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub private_key_path: Option<PathBuf>,
    /// Inline PEM. Mutually exclusive with `private_key_path`.
    pub private_key_pem: Option<String>,
    pub nonce: NonceMode,
    pub key_order: KeyOrder,
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            private_key_path: None,
            private_key_pem: None,
            nonce: NonceMode::default(),
            key_order: KeyOrder::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ClientError::Config(e.to_string()))
    }

    /// Load a TOML config file. Relative key paths resolve against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("cannot read {}: {e}", path.display())))?;
        let mut config = Self::from_toml_str(&content)?;
        if let (Some(key_path), Some(dir)) = (&config.private_key_path, path.parent()) {
            if key_path.is_relative() {
                config.private_key_path = Some(dir.join(key_path));
            }
        }
        Ok(config)
    }

    /// Apply `LIAM_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from any variable lookup (set variables win).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(key) = lookup(ENV_API_KEY) {
            self.api_key = Some(key);
        }
        if let Some(path) = lookup(ENV_PRIVATE_KEY_PATH) {
            self.private_key_path = Some(PathBuf::from(path));
            self.private_key_pem = None;
        }
        if let Some(pem) = lookup(ENV_PRIVATE_KEY) {
            self.private_key_pem = Some(pem);
            self.private_key_path = None;
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Load the key material and bundle it with the API key.
    pub fn credentials(&self) -> Result<Credentials> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ClientError::Config(format!("missing api_key (or {ENV_API_KEY})")))?;

        let pem = match (&self.private_key_pem, &self.private_key_path) {
            (Some(_), Some(_)) => {
                return Err(ClientError::Config(
                    "set either private_key_pem or private_key_path, not both".into(),
                ));
            }
            (Some(pem), None) => pem.clone(),
            (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
                ClientError::Config(format!("cannot read private key {}: {e}", path.display()))
            })?,
            (None, None) => {
                return Err(ClientError::Config(format!(
                    "missing private key (private_key_path, private_key_pem, {ENV_PRIVATE_KEY_PATH} or {ENV_PRIVATE_KEY})"
                )));
            }
        };

        let key_pair = KeyPair::from_pem(&pem)?;
        Ok(Credentials::new(api_key, key_pair))
    }
}
