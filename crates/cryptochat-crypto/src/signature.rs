//! Request authentication
//!
//! Every relay request that changes or reads private state carries an
//! `Authentication-Signature` header: a base64 DER ECDSA/P-256 signature
//! over the exact request body bytes (or the decimal account id for
//! lookups). Signatures authenticate, they do not encrypt.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{SigningKey, VerifyingKey};

use crate::error::{CryptoError, Result};
use crate::identity::{PrivateKey, PublicKey};

/// DER-encoded ECDSA signature
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature(Vec<u8>);

impl Signature {
    /// Wrap raw DER bytes
    pub fn from_der(der: Vec<u8>) -> Self {
        Self(der)
    }

    /// DER bytes
    pub fn as_der(&self) -> &[u8] {
        &self.0
    }

    /// Header encoding
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    /// Parse a header value
    pub fn from_base64(value: &str) -> Result<Self> {
        Ok(Self(STANDARD.decode(value.trim())?))
    }
}

/// Sign `payload` with the identity private key
pub fn sign(private_key: &PrivateKey, payload: &[u8]) -> Result<Signature> {
    let signing_key = SigningKey::from(private_key.as_secret());
    let signature: p256::ecdsa::Signature = signing_key
        .try_sign(payload)
        .map_err(|e| CryptoError::Signing(e.to_string()))?;
    Ok(Signature(signature.to_der().as_bytes().to_vec()))
}

/// Sign `payload` and return the `Authentication-Signature` header value
pub fn sign_header(private_key: &PrivateKey, payload: &[u8]) -> Result<String> {
    sign(private_key, payload).map(|s| s.to_base64())
}

/// Check a signature. Malformed DER is simply invalid.
pub fn verify(public_key: &PublicKey, payload: &[u8], signature: &Signature) -> bool {
    let verifying_key = VerifyingKey::from(public_key.as_public());
    match p256::ecdsa::Signature::from_der(signature.as_der()) {
        Ok(sig) => verifying_key.verify(payload, &sig).is_ok(),
        Err(_) => false,
    }
}
