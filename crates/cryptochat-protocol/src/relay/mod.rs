//! Relay request/reply contract
//!
//! The relay stores accounts and sealed messages and verifies request
//! signatures. Every call yields a [`RelayReply`]: a success flag plus the
//! response body, or the error body or transport error text on failure.

mod http;
mod memory;

pub use http::HttpRelayClient;
pub use memory::MemoryRelay;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cryptochat_core::{Account, AccountId, Message};
use cryptochat_crypto::{sign_header, PrivateKey};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{ProtocolError, Result};

/// Header carrying the base64 DER request signature
pub const SIGNATURE_HEADER: &str = "Authentication-Signature";

/// Failure message for a failing response without a body
pub const INVALID_RESPONSE: &str = "Invalid Response received from the server";

/// HTTP method of a relay request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// A request to the relay
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayRequest {
    /// Method
    pub method: Method,
    /// Path starting with `/`
    pub path: String,
    /// Exact JSON body bytes
    pub body: Option<Vec<u8>>,
    /// `Authentication-Signature` header value
    pub signature: Option<String>,
}

impl RelayRequest {
    /// GET `path`
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
            signature: None,
        }
    }

    /// POST `body` to `path`
    pub fn post(path: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(body),
            signature: None,
        }
    }

    /// Attach a signature header
    pub fn with_signature(mut self, signature: String) -> Self {
        self.signature = Some(signature);
        self
    }
}

/// Outcome of a relay call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayReply {
    /// 2xx response received
    pub success: bool,
    /// Response body on success, error detail otherwise
    pub message: String,
}

impl RelayReply {
    /// Successful reply
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// Failed reply
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    /// Decode a successful reply body
    ///
    /// A failed reply becomes [`ProtocolError::Transport`] with its message.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        if !self.success {
            return Err(ProtocolError::Transport(self.message.clone()));
        }
        serde_json::from_str(&self.message).map_err(|e| ProtocolError::Decoding(e.to_string()))
    }
}

/// Transport to a relay
#[async_trait]
pub trait RelayClient: Send + Sync {
    /// Perform one request; never fails, failures are replies
    async fn send(&self, request: RelayRequest) -> RelayReply;
}

/// Builds, signs and sends the relay's four requests
#[derive(Clone)]
pub struct RelayApi {
    client: Arc<dyn RelayClient>,
    timeout: Duration,
}

impl RelayApi {
    /// Wrap a transport; every call is bounded by `timeout`
    pub fn new(client: Arc<dyn RelayClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// `POST /account`, signed by the new account's own key
    pub async fn create_account(&self, account: &Account, private_key: &PrivateKey) -> RelayReply {
        match signed_post("/account", account, private_key) {
            Ok(request) => self.dispatch(request).await,
            Err(reply) => reply,
        }
    }

    /// `GET /account/{id}`, unsigned
    pub async fn get_account(&self, id: AccountId) -> RelayReply {
        self.dispatch(RelayRequest::get(format!("/account/{}", id))).await
    }

    /// `POST /message`, signed by the sender
    pub async fn send_message(&self, message: &Message, private_key: &PrivateKey) -> RelayReply {
        match signed_post("/message", message, private_key) {
            Ok(request) => self.dispatch(request).await,
            Err(reply) => reply,
        }
    }

    /// `GET /message/{id}`, signed over the decimal id
    pub async fn get_messages(&self, id: AccountId, private_key: &PrivateKey) -> RelayReply {
        let signature = match sign_header(private_key, id.to_string().as_bytes()) {
            Ok(signature) => signature,
            Err(e) => return RelayReply::failure(format!("ECDSA signing failed: {}", e)),
        };
        let request = RelayRequest::get(format!("/message/{}", id)).with_signature(signature);
        self.dispatch(request).await
    }

    async fn dispatch(&self, request: RelayRequest) -> RelayReply {
        let method = request.method;
        let path = request.path.clone();
        debug!(%method, %path, "Relay request");

        let reply = match tokio::time::timeout(self.timeout, self.client.send(request)).await {
            Ok(reply) => reply,
            Err(_) => RelayReply::failure(format!(
                "Request timed out after {}s",
                self.timeout.as_secs_f64()
            )),
        };

        if !reply.success {
            warn!(%method, %path, error = %reply.message, "Relay request failed");
        }
        reply
    }
}

fn signed_post<T: serde::Serialize>(
    path: &str,
    value: &T,
    private_key: &PrivateKey,
) -> std::result::Result<RelayRequest, RelayReply> {
    let body = serde_json::to_vec(value)
        .map_err(|e| RelayReply::failure(format!("JSON encoding failed: {}", e)))?;
    let signature = sign_header(private_key, &body)
        .map_err(|e| RelayReply::failure(format!("ECDSA signing failed: {}", e)))?;
    Ok(RelayRequest::post(path, body).with_signature(signature))
}
