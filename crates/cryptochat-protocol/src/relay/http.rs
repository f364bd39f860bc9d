//! HTTP transport to a relay server

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use tracing::debug;

use super::{Method, RelayClient, RelayReply, RelayRequest, INVALID_RESPONSE, SIGNATURE_HEADER};
use crate::config::ClientConfig;
use crate::error::{ProtocolError, Result};

/// reqwest-based relay client
pub struct HttpRelayClient {
    client: Client,
    base_url: String,
}

impl HttpRelayClient {
    /// Build a client with the configured connect and request timeouts
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.network.connection_timeout())
            .timeout(config.network.request_timeout())
            .build()
            .map_err(|e| ProtocolError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.relay_url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl RelayClient for HttpRelayClient {
    async fn send(&self, request: RelayRequest) -> RelayReply {
        let url = self.url(&request.path);
        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        }
        .header(CONTENT_TYPE, "application/json")
        .header(ACCEPT, "application/json");

        if let Some(signature) = request.signature {
            builder = builder.header(SIGNATURE_HEADER, signature);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return RelayReply::failure(e.to_string()),
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => return RelayReply::failure(e.to_string()),
        };
        debug!(%status, bytes = body.len(), "Relay response");

        if status.is_success() {
            RelayReply::ok(body)
        } else if body.is_empty() {
            RelayReply::failure(INVALID_RESPONSE)
        } else {
            RelayReply::failure(body)
        }
    }
}
