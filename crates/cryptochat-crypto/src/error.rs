//! Error types for cryptographic operations

use thiserror::Error;

/// Result type alias for cryptographic operations
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors that can occur during cryptographic operations
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Malformed PEM text or key bytes
    #[error("Invalid key format: {0}")]
    KeyFormat(String),

    /// ECDSA signing failed
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Key agreement or encryption failed while sealing
    #[error("Sealing failed: {0}")]
    Sealing(String),

    /// Malformed base64, envelope or plaintext encoding
    #[error("Decoding failed: {0}")]
    Decoding(String),

    /// AEAD tag did not verify (tampering or wrong key pair)
    #[error("Message authentication failed")]
    AuthenticationTag,
}

impl From<p256::pkcs8::Error> for CryptoError {
    fn from(err: p256::pkcs8::Error) -> Self {
        CryptoError::KeyFormat(err.to_string())
    }
}

impl From<p256::pkcs8::spki::Error> for CryptoError {
    fn from(err: p256::pkcs8::spki::Error) -> Self {
        CryptoError::KeyFormat(err.to_string())
    }
}

impl From<base64::DecodeError> for CryptoError {
    fn from(err: base64::DecodeError) -> Self {
        CryptoError::Decoding(format!("base64: {}", err))
    }
}

impl From<std::string::FromUtf8Error> for CryptoError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        CryptoError::Decoding(format!("UTF-8: {}", err))
    }
}
