//! CryptoChat cryptographic primitives
//!
//! - [`identity`]: P-256 key generation and PEM encoding
//! - [`signature`]: ECDSA request signatures (DER, base64 header)
//! - [`sealing`]: ECDH + HKDF-SHA256 + AES-256-GCM message sealing

pub mod error;
pub mod identity;
pub mod sealing;
pub mod signature;

pub use error::{CryptoError, Result};
pub use identity::{derive_public_key, derive_public_key_pem, generate_private_key, PrivateKey, PublicKey};
pub use sealing::{seal, unseal, SealedEnvelope};
pub use signature::{sign, sign_header, verify, Signature};

/// HKDF salt shared by every client of the relay
pub const PROTOCOL_SALT: &[u8] = b"crypto-chat";

/// AES-GCM nonce size (96 bits)
pub const NONCE_SIZE: usize = 12;

/// AES-GCM tag size (128 bits)
pub const TAG_SIZE: usize = 16;

/// Conversation key size (256 bits)
pub const KEY_SIZE: usize = 32;
