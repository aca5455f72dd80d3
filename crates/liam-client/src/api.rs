//! Typed calls to the LIAM memory API.
//!
//! Endpoints (all `POST {base_url}/{endpoint}`, all signed):
//! - `auth/create-profile`: create a user, returns its userkey
//! - `memory/create`: store a memory for a user
//! - `memory/list`: search a user's memories
//! - `memory/forget`: delete a memory by its query hash
//! - `memory/list-tag`: list a user's tags
//!
//! Bodies are passed through to the canonicalizer uninterpreted; field
//! order below is the order sent when signing with insertion order.

use liam_core::{Credentials, KeyOrder, NonceMode, RequestSigner};
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::transport::{HttpTransport, Transport};

pub const CREATE_PROFILE: &str = "auth/create-profile";
pub const CREATE_MEMORY: &str = "memory/create";
pub const LIST_MEMORIES: &str = "memory/list";
pub const FORGET_MEMORY: &str = "memory/forget";
pub const LIST_TAGS: &str = "memory/list-tag";

/// Identification type sent with every created profile.
pub const IDENTIFICATION_TYPE_UNIQUE_ID: &str = "UNIQUE_ID";

/// Opaque per-user token issued by `auth/create-profile`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserKey(String);

impl UserKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfile<'a> {
    pub name: &'a str,
    pub identification: &'a str,
    pub identification_type: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemory<'a> {
    pub user_key: &'a UserKey,
    pub content: &'a str,
    pub tag: &'a str,
    pub session_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMemories<'a> {
    pub user_key: &'a UserKey,
    pub query: &'a str,
    pub tokens: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgetMemory<'a> {
    pub user_key: &'a UserKey,
    pub query_hash: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTags<'a> {
    pub user_key: &'a UserKey,
}

/// Signs and sends LIAM API calls for one set of credentials.
pub struct LiamClient<T = HttpTransport> {
    base_url: Url,
    credentials: Credentials,
    nonce: NonceMode,
    key_order: KeyOrder,
    transport: T,
}

impl LiamClient<HttpTransport> {
    /// Build an HTTP client from resolved configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.timeout())?;
        Ok(Self::new(&config.base_url, config.credentials()?, transport)?
            .nonce(config.nonce)
            .key_order(config.key_order))
    }
}

impl<T: Transport> LiamClient<T> {
    pub fn new(base_url: &str, credentials: Credentials, transport: T) -> Result<Self> {
        let mut base_url =
            Url::parse(base_url).map_err(|e| ClientError::Config(format!("invalid base_url {base_url:?}: {e}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            base_url,
            credentials,
            nonce: NonceMode::default(),
            key_order: KeyOrder::default(),
            transport,
        })
    }

    pub fn nonce(mut self, nonce: NonceMode) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn key_order(mut self, key_order: KeyOrder) -> Self {
        self.key_order = key_order;
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The signer this client uses for every request.
    pub fn signer(&self) -> RequestSigner<'_> {
        RequestSigner::new(&self.credentials)
            .nonce(self.nonce)
            .key_order(self.key_order)
    }

    pub fn url_for(&self, endpoint: &str) -> Result<Url> {
        self.base_url
            .join(endpoint.trim_start_matches('/'))
            .map_err(|e| ClientError::Config(format!("invalid endpoint {endpoint:?}: {e}")))
    }

    /// Sign `body`, POST it to `endpoint` and return the JSON response.
    pub async fn make_authenticated_request<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<serde_json::Value> {
        let url = self.url_for(endpoint)?;
        let envelope = self.signer().build_serialize(endpoint, body)?;
        self.transport.send(&url, &envelope).await
    }

    /// Create a user profile; the server generates and returns its userkey.
    pub async fn create_profile(&self, name: &str, identification: &str) -> Result<UserKey> {
        let body = CreateProfile {
            name,
            identification,
            identification_type: IDENTIFICATION_TYPE_UNIQUE_ID,
        };
        let response = self.make_authenticated_request(CREATE_PROFILE, &body).await?;

        let user_key = response
            .pointer("/data/userkey")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| ClientError::Decode("response has no data.userkey".into()))?;
        info!(identification, "profile created");
        Ok(UserKey::new(user_key))
    }

    /// Store a memory. A missing tag is sent as an empty string.
    pub async fn create_memory(
        &self,
        user_key: &UserKey,
        content: &str,
        tag: Option<&str>,
        session_id: &str,
    ) -> Result<serde_json::Value> {
        let body = CreateMemory {
            user_key,
            content,
            tag: tag.unwrap_or_default(),
            session_id,
        };
        self.make_authenticated_request(CREATE_MEMORY, &body).await
    }

    /// Search memories by free-text query and tokens.
    pub async fn list_memories(
        &self,
        user_key: &UserKey,
        query: &str,
        tokens: &[String],
    ) -> Result<serde_json::Value> {
        let body = ListMemories { user_key, query, tokens };
        self.make_authenticated_request(LIST_MEMORIES, &body).await
    }

    pub async fn forget_memory(&self, user_key: &UserKey, query_hash: &str) -> Result<serde_json::Value> {
        let body = ForgetMemory { user_key, query_hash };
        self.make_authenticated_request(FORGET_MEMORY, &body).await
    }

    pub async fn list_tags(&self, user_key: &UserKey) -> Result<serde_json::Value> {
        self.make_authenticated_request(LIST_TAGS, &ListTags { user_key }).await
    }
}
