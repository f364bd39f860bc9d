//! Pairwise message sealing
//!
//! A conversation key is derived from an ECDH shared secret between one
//! party's private key and the other party's public key, expanded with
//! HKDF-SHA256 under the protocol salt and empty info. Messages are sealed
//! with AES-256-GCM under a fresh random nonce and travel as
//! `base64(nonce || ciphertext || tag)`.
//!
//! ECDH is symmetric, so `(a_priv, b_pub)` and `(b_priv, a_pub)` derive the
//! same key, and the sender can open its own message with the pair it
//! sealed it with.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, Result};
use crate::identity::{PrivateKey, PublicKey};
use crate::{KEY_SIZE, NONCE_SIZE, PROTOCOL_SALT, TAG_SIZE};

/// Symmetric key shared by the two parties of a conversation
#[derive(Zeroize, ZeroizeOnDrop)]
struct ConversationKey([u8; KEY_SIZE]);

impl ConversationKey {
    fn derive(private_key: &PrivateKey, public_key: &PublicKey) -> Result<Self> {
        let shared = p256::ecdh::diffie_hellman(
            private_key.as_secret().to_nonzero_scalar(),
            public_key.as_public().as_affine(),
        );

        let hk = Hkdf::<Sha256>::new(Some(PROTOCOL_SALT), shared.raw_secret_bytes().as_slice());
        let mut okm = [0u8; KEY_SIZE];
        hk.expand(&[], &mut okm)
            .map_err(|e| CryptoError::Sealing(format!("HKDF expand: {}", e)))?;
        Ok(Self(okm))
    }

    fn cipher(&self) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(&self.0).map_err(|e| CryptoError::Sealing(e.to_string()))
    }
}

/// Decoded wire form of a sealed message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedEnvelope {
    /// AES-GCM nonce, unique per seal
    pub nonce: [u8; NONCE_SIZE],
    /// Ciphertext followed by the 16-byte tag
    pub ciphertext: Vec<u8>,
}

impl SealedEnvelope {
    /// Combined `nonce || ciphertext || tag` bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(NONCE_SIZE + self.ciphertext.len());
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Split combined bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::Decoding(format!(
                "sealed envelope too short: {} bytes",
                bytes.len()
            )));
        }
        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&bytes[..NONCE_SIZE]);
        Ok(Self {
            nonce,
            ciphertext: bytes[NONCE_SIZE..].to_vec(),
        })
    }

    /// Wire string
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    /// Parse a wire string
    pub fn from_base64(value: &str) -> Result<Self> {
        let bytes = STANDARD.decode(value.trim())?;
        Self::from_bytes(&bytes)
    }
}

/// Seal `plaintext` from `sender_key` to `recipient_key`
pub fn seal(sender_key: &PrivateKey, recipient_key: &PublicKey, plaintext: &str) -> Result<String> {
    let key = ConversationKey::derive(sender_key, recipient_key)?;

    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);

    let ciphertext = key
        .cipher()?
        .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
        .map_err(|_| CryptoError::Sealing("AES-GCM encryption failed".to_string()))?;

    Ok(SealedEnvelope { nonce, ciphertext }.to_base64())
}

/// Open a wire string sealed between `receiver_key`'s identity and `sender_key`
pub fn unseal(receiver_key: &PrivateKey, sender_key: &PublicKey, ciphertext: &str) -> Result<String> {
    let envelope = SealedEnvelope::from_base64(ciphertext)?;
    let key = ConversationKey::derive(receiver_key, sender_key)?;

    let plaintext = key
        .cipher()?
        .decrypt(Nonce::from_slice(&envelope.nonce), envelope.ciphertext.as_slice())
        .map_err(|_| CryptoError::AuthenticationTag)?;

    Ok(String::from_utf8(plaintext)?)
}
