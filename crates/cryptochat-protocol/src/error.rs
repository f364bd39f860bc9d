//! Protocol error types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Local store or validation error
    #[error("Core error: {0}")]
    Core(#[from] cryptochat_core::Error),

    /// Crypto error
    #[error("Crypto error: {0}")]
    Crypto(#[from] cryptochat_crypto::CryptoError),

    /// Network failure, timeout or non-2xx reply; carries the relay's message
    #[error("Transport error: {0}")]
    Transport(String),

    /// Relay reply did not decode
    #[error("Decoding error: {0}")]
    Decoding(String),

    /// No private key stored yet
    #[error("No private key; generate or import one first")]
    MissingPrivateKey,

    /// No registered profile yet
    #[error("Not registered")]
    NotRegistered,

    /// A profile is already registered
    #[error("Already registered as account {0}")]
    AlreadyRegistered(cryptochat_core::AccountId),

    /// Empty message text
    #[error("Message is empty")]
    EmptyMessage,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Background task failed
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        ProtocolError::Decoding(err.to_string())
    }
}
