//! Sending envelopes over HTTP.
//!
//! The transport posts the envelope's canonical body bytes verbatim with
//! its header fields. It never sees the structured body, so it cannot
//! re-encode it. No retries here; that is the caller's call.

use std::future::Future;
use std::time::Duration;

use liam_core::AuthenticatedEnvelope;
use tracing::{debug, warn};
use url::Url;

use crate::error::{ClientError, Result};

/// Delivers a signed envelope and returns the decoded JSON response.
pub trait Transport {
    fn send(
        &self,
        url: &Url,
        envelope: &AuthenticatedEnvelope,
    ) -> impl Future<Output = Result<serde_json::Value>> + Send;
}

/// HTTPS POST via reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

impl Transport for HttpTransport {
    async fn send(&self, url: &Url, envelope: &AuthenticatedEnvelope) -> Result<serde_json::Value> {
        let mut request = self.http.post(url.clone());
        for (name, value) in envelope.headers() {
            request = request.header(name, value);
        }

        debug!(%url, digest = %envelope.digest(), bytes = envelope.body().len(), "sending signed request");
        let resp = request.body(envelope.body().as_bytes().to_vec()).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = match resp.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!(%url, %status, error = %e, "could not read error response body");
                    String::new()
                }
            };
            warn!(%url, %status, "API returned an error");
            return Err(ClientError::Status { status: status.as_u16(), body });
        }

        resp.json::<serde_json::Value>()
            .await
            .map_err(|e| ClientError::Decode(format!("response is not JSON: {e}")))
    }
}
