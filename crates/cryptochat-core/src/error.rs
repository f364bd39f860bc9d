//! Error types for CryptoChat core

use thiserror::Error;

use crate::types::AccountId;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types
#[derive(Debug, Error)]
pub enum Error {
    /// Cryptographic operation failed
    #[error("Crypto error: {0}")]
    Crypto(#[from] cryptochat_crypto::CryptoError),

    /// Malformed JSON in a persisted blob or relay payload
    #[error("Decoding error: {0}")]
    Decoding(String),

    /// Blob persistence failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Account fields rejected before registration
    #[error("Invalid account: {0}")]
    InvalidAccount(String),

    /// Account has no server-assigned id
    #[error("Account has no id")]
    MissingAccountId,

    /// The profile cannot be its own contact
    #[error("Account {0} is the local profile")]
    SelfContact(AccountId),

    /// Contact already present
    #[error("Contact {0} already exists")]
    DuplicateContact(AccountId),

    /// Contact not present
    #[error("Contact {0} not found")]
    ContactNotFound(AccountId),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decoding(err.to_string())
    }
}

impl From<sled::Error> for Error {
    fn from(err: sled::Error) -> Self {
        Error::Storage(err.to_string())
    }
}
