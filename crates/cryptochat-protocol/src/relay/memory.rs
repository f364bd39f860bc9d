//! In-process relay
//!
//! Behaves like the relay server: assigns account and message ids, verifies
//! `Authentication-Signature` against the stored public keys and returns
//! every message an account sent or received. It can be taken offline and
//! given artificial latency.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use cryptochat_core::{Account, AccountId, Message, MessageId};
use cryptochat_crypto::{verify, PublicKey, Signature};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use super::{Method, RelayClient, RelayReply, RelayRequest};

struct RelayState {
    accounts: Vec<Account>,
    messages: Vec<Message>,
    next_account_id: i64,
    next_message_id: i64,
}

/// In-memory relay (for testing)
pub struct MemoryRelay {
    state: Mutex<RelayState>,
    online: AtomicBool,
    latency: Mutex<Option<Duration>>,
    requests: AtomicUsize,
}

impl Default for MemoryRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRelay {
    /// Relay assigning account ids from 1
    pub fn new() -> Self {
        Self::with_first_account_id(1)
    }

    /// Relay assigning account ids from `first`
    pub fn with_first_account_id(first: i64) -> Self {
        Self {
            state: Mutex::new(RelayState {
                accounts: Vec::new(),
                messages: Vec::new(),
                next_account_id: first,
                next_message_id: 1,
            }),
            online: AtomicBool::new(true),
            latency: Mutex::new(None),
            requests: AtomicUsize::new(0),
        }
    }

    /// Simulate the relay becoming (un)reachable
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Delay every reply
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    /// Requests received so far, including rejected ones
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Stored messages
    pub fn messages(&self) -> Vec<Message> {
        self.state.lock().messages.clone()
    }

    /// Stored accounts
    pub fn accounts(&self) -> Vec<Account> {
        self.state.lock().accounts.clone()
    }

    fn handle(&self, request: &RelayRequest) -> RelayReply {
        let path = request.path.as_str();
        match request.method {
            Method::Post if path == "/account" => self.create_account(request),
            Method::Post if path == "/message" => self.create_message(request),
            Method::Get => {
                if let Some(id) = path.strip_prefix("/account/") {
                    match id.parse() {
                        Ok(id) => self.get_account(id),
                        Err(_) => RelayReply::failure("Invalid account id"),
                    }
                } else if let Some(id) = path.strip_prefix("/message/") {
                    match id.parse() {
                        Ok(id) => self.get_messages(id, request),
                        Err(_) => RelayReply::failure("Invalid account id"),
                    }
                } else {
                    RelayReply::failure("Not Found")
                }
            }
            _ => RelayReply::failure("Not Found"),
        }
    }

    fn create_account(&self, request: &RelayRequest) -> RelayReply {
        let body = request.body.as_deref().unwrap_or_default();
        let mut account: Account = match serde_json::from_slice(body) {
            Ok(account) => account,
            Err(e) => return RelayReply::failure(format!("Invalid account: {}", e)),
        };
        if account.name.trim().is_empty() {
            return RelayReply::failure("Name is required");
        }
        let public_key = match PublicKey::from_pem(&account.public_key) {
            Ok(key) => key,
            Err(_) => return RelayReply::failure("Invalid public key"),
        };
        if !signature_matches(&public_key, body, request) {
            return RelayReply::failure("Invalid signature");
        }

        let mut state = self.state.lock();
        let id = AccountId::new(state.next_account_id);
        state.next_account_id += 1;
        account.id = Some(id);
        state.accounts.push(account.clone());
        debug!(account = %id, "Relay created account");
        to_reply(&account)
    }

    fn get_account(&self, id: AccountId) -> RelayReply {
        let state = self.state.lock();
        match state.accounts.iter().find(|a| a.id == Some(id)) {
            Some(account) => to_reply(account),
            None => RelayReply::failure("Account not found"),
        }
    }

    fn create_message(&self, request: &RelayRequest) -> RelayReply {
        let body = request.body.as_deref().unwrap_or_default();
        let mut message: Message = match serde_json::from_slice(body) {
            Ok(message) => message,
            Err(e) => return RelayReply::failure(format!("Invalid message: {}", e)),
        };

        let mut state = self.state.lock();
        let sender_key = match public_key_of(&state.accounts, message.sender_id) {
            Some(key) => key,
            None => return RelayReply::failure("Sender not found"),
        };
        if !signature_matches(&sender_key, body, request) {
            return RelayReply::failure("Invalid signature");
        }
        if !state.accounts.iter().any(|a| a.id == Some(message.recipient_id)) {
            return RelayReply::failure("Recipient not found");
        }

        let id = MessageId::new(state.next_message_id);
        state.next_message_id += 1;
        message.message_id = Some(id);
        state.messages.push(message.clone());
        debug!(message = %id, "Relay stored message");
        to_reply(&message)
    }

    fn get_messages(&self, id: AccountId, request: &RelayRequest) -> RelayReply {
        let state = self.state.lock();
        let key = match public_key_of(&state.accounts, id) {
            Some(key) => key,
            None => return RelayReply::failure("Account not found"),
        };
        if !signature_matches(&key, id.to_string().as_bytes(), request) {
            return RelayReply::failure("Invalid signature");
        }

        let messages: Vec<&Message> = state.messages.iter().filter(|m| m.involves(id)).collect();
        to_reply(&messages)
    }
}

#[async_trait]
impl RelayClient for MemoryRelay {
    async fn send(&self, request: RelayRequest) -> RelayReply {
        self.requests.fetch_add(1, Ordering::SeqCst);

        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if !self.online.load(Ordering::SeqCst) {
            return RelayReply::failure("Could not connect to the server.");
        }
        self.handle(&request)
    }
}

fn public_key_of(accounts: &[Account], id: AccountId) -> Option<PublicKey> {
    accounts
        .iter()
        .find(|a| a.id == Some(id))
        .and_then(|a| PublicKey::from_pem(&a.public_key).ok())
}

fn signature_matches(key: &PublicKey, payload: &[u8], request: &RelayRequest) -> bool {
    request
        .signature
        .as_deref()
        .and_then(|s| Signature::from_base64(s).ok())
        .map(|signature| verify(key, payload, &signature))
        .unwrap_or(false)
}

fn to_reply<T: Serialize + ?Sized>(value: &T) -> RelayReply {
    match serde_json::to_string(value) {
        Ok(body) => RelayReply::ok(body),
        Err(e) => RelayReply::failure(e.to_string()),
    }
}
