//! Chat client - main entry point for front ends
//!
//! Ties the [`LocalStore`], the [`RelayApi`] and the [`SyncLoop`] together:
//! identity setup, registration, contacts, sending and reading
//! conversations.

use std::sync::Arc;
use std::time::Duration;

use cryptochat_core::{Account, AccountId, LocalStore, Message, NewAccount};
use cryptochat_crypto::{seal, unseal, CryptoError, PrivateKey, PublicKey};
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{ProtocolError, Result};
use crate::relay::{HttpRelayClient, RelayApi, RelayClient};
use crate::sync::{SyncEvent, SyncLoop};

/// A message of a conversation, opened for display
#[derive(Debug)]
pub struct ConversationEntry {
    /// Stored message
    pub message: Message,
    /// Sent by the profile
    pub outgoing: bool,
    /// Plaintext, or why it could not be opened
    pub text: std::result::Result<String, CryptoError>,
}

/// One row of the conversation list
#[derive(Debug)]
pub struct ConversationSummary {
    /// The contact
    pub contact: Account,
    /// Messages exchanged with the contact
    pub message_count: usize,
    /// Most recent message, opened
    pub last: Option<ConversationEntry>,
}

/// Client for one local identity
pub struct ChatClient {
    config: ClientConfig,
    store: Arc<LocalStore>,
    api: RelayApi,
    sync: SyncLoop,
}

impl ChatClient {
    /// Create a client over a loaded store and a relay transport
    pub fn new(config: ClientConfig, store: Arc<LocalStore>, relay: Arc<dyn RelayClient>) -> Self {
        let api = RelayApi::new(relay, config.network.request_timeout());
        let sync = SyncLoop::new(store.clone(), api.clone(), config.sync.clone());
        Self {
            config,
            store,
            api,
            sync,
        }
    }

    /// Create a client talking HTTP to `config.relay_url`
    pub fn connect(config: ClientConfig, store: Arc<LocalStore>) -> Result<Self> {
        config.validate().map_err(ProtocolError::InvalidConfig)?;
        let relay = HttpRelayClient::new(&config)?;
        Ok(Self::new(config, store, Arc::new(relay)))
    }

    /// Configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Underlying store
    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    /// Registered profile
    pub fn profile(&self) -> Option<Account> {
        self.store.profile()
    }

    /// Public key of the stored identity
    pub fn public_key(&self) -> Option<PublicKey> {
        self.store.private_key().map(|k| k.public_key())
    }

    /// Generate and store a private key unless one exists
    pub fn ensure_identity(&self) -> Result<PublicKey> {
        if let Some(key) = self.store.private_key() {
            return Ok(key.public_key());
        }
        let key = PrivateKey::generate();
        let public_key = key.public_key();
        self.store.set_private_key(Some(key))?;
        info!(fingerprint = %public_key.fingerprint(), "Generated identity key");
        Ok(public_key)
    }

    /// Replace the identity with an imported PEM private key
    pub fn import_private_key(&self, pem: &str) -> Result<PublicKey> {
        let key = PrivateKey::from_pem(pem)?;
        let public_key = key.public_key();
        if self.store.profile().is_some() {
            warn!("Replacing the private key of a registered profile");
        }
        self.store.set_private_key(Some(key))?;
        info!(fingerprint = %public_key.fingerprint(), "Imported identity key");
        Ok(public_key)
    }

    fn private_key(&self) -> Result<PrivateKey> {
        self.store.private_key().ok_or(ProtocolError::MissingPrivateKey)
    }

    fn profile_id(&self) -> Result<AccountId> {
        self.store
            .profile()
            .and_then(|p| p.id)
            .ok_or(ProtocolError::NotRegistered)
    }

    /// Register the profile on the relay
    #[instrument(skip(self, form))]
    pub async fn register(&self, form: NewAccount) -> Result<Account> {
        if let Some(id) = self.store.profile().and_then(|p| p.id) {
            return Err(ProtocolError::AlreadyRegistered(id));
        }
        let key = self.private_key()?;
        let account = form.into_account(key.public_key().to_pem()?)?;

        let reply = self.api.create_account(&account, &key).await;
        let registered: Account = reply.json()?;
        let id = registered.require_id()?;

        self.store.set_profile(Some(registered.clone()))?;
        info!(account = %id, "Registered profile");
        Ok(registered)
    }

    /// Look up an account by id and add it as a contact
    #[instrument(skip(self))]
    pub async fn add_contact(&self, id: AccountId) -> Result<Account> {
        let me = self.profile_id()?;
        if id == me {
            return Err(cryptochat_core::Error::SelfContact(id).into());
        }
        if self.store.contact(id).is_some() {
            return Err(cryptochat_core::Error::DuplicateContact(id).into());
        }

        let mut account: Account = self.api.get_account(id).await.json()?;
        if account.id.is_none() {
            account.id = Some(id);
        }
        if account.id != Some(id) {
            return Err(ProtocolError::Decoding(format!(
                "relay returned account {:?} for {}",
                account.id, id
            )));
        }
        PublicKey::from_pem(&account.public_key)?;

        self.store.add_contact(account.clone())?;
        Ok(account)
    }

    /// Remove a contact and its messages; returns the messages removed
    pub fn remove_contact(&self, id: AccountId) -> Result<usize> {
        Ok(self.store.remove_contact(id)?)
    }

    /// Contacts
    pub fn contacts(&self) -> Vec<Account> {
        self.store.contacts()
    }

    fn peer_key(&self, me: AccountId, key: &PrivateKey, peer: AccountId) -> Result<PublicKey> {
        if peer == me {
            return Ok(key.public_key());
        }
        let contact = self
            .store
            .contact(peer)
            .ok_or(cryptochat_core::Error::ContactNotFound(peer))?;
        Ok(PublicKey::from_pem(&contact.public_key)?)
    }

    /// Seal `text` for `recipient`, post it and store the relay's copy
    #[instrument(skip(self, text))]
    pub async fn send_message(&self, recipient: AccountId, text: &str) -> Result<Message> {
        if text.trim().is_empty() {
            return Err(ProtocolError::EmptyMessage);
        }
        let me = self.profile_id()?;
        let key = self.private_key()?;
        let peer_key = self.peer_key(me, &key, recipient)?;

        let outbound = Message::new(me, recipient, seal(&key, &peer_key, text)?);
        let stored: Message = self.api.send_message(&outbound, &key).await.json()?;
        self.store.append_message(stored.clone())?;
        Ok(stored)
    }

    /// Messages with `peer`, opened with the profile's key pair
    ///
    /// With `peer` equal to the profile this is the notes-to-self thread.
    pub fn conversation(&self, peer: AccountId) -> Result<Vec<ConversationEntry>> {
        let me = self.profile_id()?;
        let key = self.private_key()?;
        let peer_key = self.peer_key(me, &key, peer)?;

        let entries = self
            .store
            .query_messages(Some(peer))
            .into_iter()
            .filter(|m| peer != me || (m.sender_id == me && m.recipient_id == me))
            .map(|message| {
                let text = unseal(&key, &peer_key, &message.message);
                ConversationEntry {
                    outgoing: message.sender_id == me,
                    message,
                    text,
                }
            })
            .collect();
        Ok(entries)
    }

    /// Conversation list: every contact with its message count and latest
    /// message, in contact order
    pub fn conversations(&self) -> Result<Vec<ConversationSummary>> {
        let me = self.profile_id()?;
        let key = self.private_key()?;
        let state = self.store.snapshot();

        let mut summaries = Vec::with_capacity(state.contacts.len());
        for contact in state.contacts.clone() {
            let id = contact.require_id()?;
            let messages = state.query_messages(Some(id));
            let last = messages.last().map(|message| ConversationEntry {
                outgoing: message.sender_id == me,
                text: PublicKey::from_pem(&contact.public_key)
                    .and_then(|peer_key| unseal(&key, &peer_key, &message.message)),
                message: message.clone(),
            });
            summaries.push(ConversationSummary {
                message_count: messages.len(),
                contact,
                last,
            });
        }
        Ok(summaries)
    }

    /// Open one stored message with the profile's key pair
    pub fn open(&self, message: &Message) -> Result<ConversationEntry> {
        let me = self.profile_id()?;
        let key = self.private_key()?;
        let peer = message
            .counterpart(me)
            .ok_or_else(|| ProtocolError::Decoding(format!("message not addressed to {}", me)))?;
        let peer_key = self.peer_key(me, &key, peer)?;

        Ok(ConversationEntry {
            outgoing: message.sender_id == me,
            text: unseal(&key, &peer_key, &message.message),
            message: message.clone(),
        })
    }

    /// Delete the messages with `peer`, keeping the contact
    pub fn clear_conversation(&self, peer: AccountId) -> Result<usize> {
        Ok(self.store.clear_conversation(peer)?)
    }

    /// Poll the relay once
    pub async fn refresh(&self) -> Result<usize> {
        self.sync.poll_once().await
    }

    /// Start background sync, replacing a running one
    pub fn start_sync(&self) {
        self.sync.start();
    }

    /// Stop background sync
    pub fn stop_sync(&self) {
        self.sync.stop();
    }

    /// Whether background sync is running
    pub fn is_syncing(&self) -> bool {
        self.sync.is_running()
    }

    /// Subscribe to sync events
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.sync.subscribe()
    }

    /// Poll interval of the background sync
    pub fn poll_interval(&self) -> Duration {
        self.config.sync.poll_interval()
    }

    /// Stop syncing and erase all local state
    pub fn reset(&self) -> Result<()> {
        self.sync.stop();
        self.store.clear_all()?;
        info!("Local identity reset");
        Ok(())
    }
}
