//! X25519 + HKDF-SHA256 + ChaCha20-Poly1305 hybrid encryption.
//!
//! Ciphertext: `[ephemeral_public: 32][ciphertext][tag: 16]`
//!
//! The AEAD key and nonce come from HKDF-SHA256 with the ephemeral public key
//! as salt, the X25519 shared secret as input key material and the caller's
//! context info as `info`. Each encryption uses a fresh ephemeral key, so the
//! derived nonce is never reused under the same key.

use std::sync::Arc;

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::rngs::OsRng;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use super::{contributory, hkdf_key_and_nonce, parse_public_key, TAG_BYTES, X25519_KEY_BYTES};
use crate::error::{HybridError, Result};
use crate::keyset::{self, KeyData, KeyMaterialType, KeysetError};
use crate::primitive::{
    HybridDecrypt, HybridEncrypt, Primitive, StreamingHybridDecrypt, StreamingHybridEncrypt,
};
use crate::registry::KeyManager;

pub const X25519_HKDF_CHACHA20POLY1305_PRIVATE_KEY_TYPE_URL: &str =
    "type.hybrid-keyset/X25519HkdfChaCha20Poly1305PrivateKey";
pub const X25519_HKDF_CHACHA20POLY1305_PUBLIC_KEY_TYPE_URL: &str =
    "type.hybrid-keyset/X25519HkdfChaCha20Poly1305PublicKey";

/// Recipient side: holds the static X25519 secret.
pub struct X25519HkdfChaCha20Poly1305Decrypt {
    pub(crate) secret: StaticSecret,
}

impl X25519HkdfChaCha20Poly1305Decrypt {
    pub fn new(secret: StaticSecret) -> Self {
        Self { secret }
    }

    /// Parse a 32-byte X25519 secret.
    pub fn from_bytes(secret: &[u8]) -> keyset::Result<Self> {
        let bytes: [u8; X25519_KEY_BYTES] = secret.try_into().map_err(|_| {
            KeysetError::InvalidKey(format!(
                "X25519 secret must be {} bytes, got {}",
                X25519_KEY_BYTES,
                secret.len()
            ))
        })?;
        Ok(Self::new(StaticSecret::from(bytes)))
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::from(&self.secret)
    }
}

impl HybridDecrypt for X25519HkdfChaCha20Poly1305Decrypt {
    fn decrypt(&self, ciphertext: &[u8], context_info: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < X25519_KEY_BYTES + TAG_BYTES {
            return Err(HybridError::DecryptionFailed);
        }
        let (ephemeral, body) = ciphertext.split_at(X25519_KEY_BYTES);
        let ephemeral_public = parse_public_key(ephemeral).ok_or(HybridError::DecryptionFailed)?;

        let shared = contributory(self.secret.diffie_hellman(&ephemeral_public))
            .ok_or(HybridError::DecryptionFailed)?;
        let (key, nonce) = hkdf_key_and_nonce(shared.as_bytes(), ephemeral, context_info)?;

        let cipher = ChaCha20Poly1305::new_from_slice(&key[..])
            .map_err(|_| HybridError::InvalidKeyLength)?;
        cipher
            .decrypt(Nonce::from_slice(&nonce), body)
            .map_err(|_| HybridError::DecryptionFailed)
    }
}

impl Primitive for X25519HkdfChaCha20Poly1305Decrypt {
    fn name(&self) -> &'static str {
        "X25519HkdfChaCha20Poly1305Decrypt"
    }

    fn as_hybrid_decrypt(self: Arc<Self>) -> Option<Arc<dyn HybridDecrypt>> {
        Some(self)
    }

    fn as_streaming_hybrid_decrypt(self: Arc<Self>) -> Option<Arc<dyn StreamingHybridDecrypt>> {
        Some(self)
    }
}

/// Sender side: holds the recipient's X25519 public key.
pub struct X25519HkdfChaCha20Poly1305Encrypt {
    pub(crate) recipient: PublicKey,
    pub(crate) segment_size: usize,
}

impl X25519HkdfChaCha20Poly1305Encrypt {
    pub fn new(recipient: PublicKey) -> Self {
        Self {
            recipient,
            segment_size: super::streaming::DEFAULT_SEGMENT_SIZE,
        }
    }

    pub fn from_bytes(public: &[u8]) -> keyset::Result<Self> {
        let recipient = parse_public_key(public).ok_or_else(|| {
            KeysetError::InvalidKey(format!(
                "X25519 public key must be {} bytes, got {}",
                X25519_KEY_BYTES,
                public.len()
            ))
        })?;
        Ok(Self::new(recipient))
    }

    /// Plaintext bytes per stream segment, at most
    /// [`MAX_SEGMENT_SIZE`](super::streaming::MAX_SEGMENT_SIZE).
    pub fn with_segment_size(mut self, segment_size: usize) -> Result<Self> {
        if segment_size == 0 || segment_size > super::streaming::MAX_SEGMENT_SIZE {
            return Err(HybridError::InvalidSegmentSize(segment_size));
        }
        self.segment_size = segment_size;
        Ok(self)
    }
}

impl HybridEncrypt for X25519HkdfChaCha20Poly1305Encrypt {
    fn encrypt(&self, plaintext: &[u8], context_info: &[u8]) -> Result<Vec<u8>> {
        let ephemeral_secret = EphemeralSecret::random_from_rng(OsRng);
        let ephemeral_public = PublicKey::from(&ephemeral_secret).to_bytes();

        let shared = contributory(ephemeral_secret.diffie_hellman(&self.recipient))
            .ok_or(HybridError::EncryptionFailed)?;
        let (key, nonce) = hkdf_key_and_nonce(shared.as_bytes(), &ephemeral_public, context_info)?;

        let cipher = ChaCha20Poly1305::new_from_slice(&key[..])
            .map_err(|_| HybridError::InvalidKeyLength)?;
        let sealed = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| HybridError::EncryptionFailed)?;

        let mut ciphertext = Vec::with_capacity(X25519_KEY_BYTES + sealed.len());
        ciphertext.extend_from_slice(&ephemeral_public);
        ciphertext.extend_from_slice(&sealed);
        Ok(ciphertext)
    }
}

impl Primitive for X25519HkdfChaCha20Poly1305Encrypt {
    fn name(&self) -> &'static str {
        "X25519HkdfChaCha20Poly1305Encrypt"
    }

    fn as_hybrid_encrypt(self: Arc<Self>) -> Option<Arc<dyn HybridEncrypt>> {
        Some(self)
    }

    fn as_streaming_hybrid_encrypt(self: Arc<Self>) -> Option<Arc<dyn StreamingHybridEncrypt>> {
        Some(self)
    }
}

pub struct X25519HkdfChaCha20Poly1305PrivateKeyManager;

impl KeyManager for X25519HkdfChaCha20Poly1305PrivateKeyManager {
    fn type_url(&self) -> &str {
        X25519_HKDF_CHACHA20POLY1305_PRIVATE_KEY_TYPE_URL
    }

    fn primitive(&self, key_value: &[u8]) -> keyset::Result<Arc<dyn Primitive>> {
        Ok(Arc::new(X25519HkdfChaCha20Poly1305Decrypt::from_bytes(key_value)?))
    }

    fn public_key_data(&self, key_value: &[u8]) -> keyset::Result<KeyData> {
        let decrypt = X25519HkdfChaCha20Poly1305Decrypt::from_bytes(key_value)?;
        Ok(KeyData {
            type_url: X25519_HKDF_CHACHA20POLY1305_PUBLIC_KEY_TYPE_URL.to_string(),
            value: decrypt.public_key().to_bytes().to_vec(),
            material_type: KeyMaterialType::AsymmetricPublic,
        })
    }
}

pub struct X25519HkdfChaCha20Poly1305PublicKeyManager;

impl KeyManager for X25519HkdfChaCha20Poly1305PublicKeyManager {
    fn type_url(&self) -> &str {
        X25519_HKDF_CHACHA20POLY1305_PUBLIC_KEY_TYPE_URL
    }

    fn primitive(&self, key_value: &[u8]) -> keyset::Result<Arc<dyn Primitive>> {
        Ok(Arc::new(X25519HkdfChaCha20Poly1305Encrypt::from_bytes(key_value)?))
    }
}
