//! Post-quantum hybrid encryption: X25519 + ML-KEM-1024 (NIST FIPS 203)
//!
//! Both KEMs run on every message and their shared secrets are bound together
//! with BLAKE3-KDF, so the message stays confidential as long as either
//! algorithm holds.
//!
//! Key sizes (ML-KEM-1024):
//! - Encapsulation key (public):  1568 bytes
//! - Decapsulation key (secret):  3168 bytes
//! - Ciphertext:                  1568 bytes
//!
//! Serialized keys:
//! - private: `[x25519_secret: 32][mlkem_dk: 3168]`
//! - public:  `[x25519_public: 32][mlkem_ek: 1568]`
//!
//! Ciphertext: `[ephemeral_public: 32][mlkem_ct: 1568][nonce: 24][ciphertext][tag: 16]`

use std::sync::Arc;

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use ml_kem::kem::{Decapsulate, Encapsulate};
use ml_kem::{Encoded, EncodedSizeUser, MlKem1024, MlKem1024Params};
use rand::rngs::OsRng;
use rand::RngCore;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::Zeroizing;

use super::{contributory, parse_public_key, TAG_BYTES, X25519_KEY_BYTES};
use crate::error::{HybridError, Result};
use crate::keyset::{self, KeyData, KeyMaterialType, KeysetError};
use crate::primitive::{HybridDecrypt, HybridEncrypt, Primitive};
use crate::registry::KeyManager;

pub const X25519_MLKEM1024_PRIVATE_KEY_TYPE_URL: &str =
    "type.hybrid-keyset/X25519MlKem1024XChaCha20Poly1305PrivateKey";
pub const X25519_MLKEM1024_PUBLIC_KEY_TYPE_URL: &str =
    "type.hybrid-keyset/X25519MlKem1024XChaCha20Poly1305PublicKey";

/// ML-KEM-1024 encapsulation key (public) size in bytes
pub const MLKEM1024_EK_BYTES: usize = 1568;
/// ML-KEM-1024 ciphertext size in bytes
pub const MLKEM1024_CT_BYTES: usize = 1568;
/// ML-KEM-1024 decapsulation key (secret) size in bytes
pub const MLKEM1024_DK_BYTES: usize = 3168;
/// Offset of the embedded encapsulation key inside a decapsulation key
/// (FIPS 203: `dk = dk_pke ‖ ek ‖ H(ek) ‖ z`).
const MLKEM1024_DK_PKE_BYTES: usize = 1536;

const XNONCE_BYTES: usize = 24;
const KDF_CONTEXT: &str = "hybrid-keyset 2026-01 X25519-MLKEM1024-XChaCha20Poly1305 message key";

type DecapsulationKey = ml_kem::kem::DecapsulationKey<MlKem1024Params>;
type EncapsulationKey = ml_kem::kem::EncapsulationKey<MlKem1024Params>;

/// Bind both shared secrets, the ephemeral key and the context info into one
/// AEAD key via BLAKE3-KDF.
fn combine_shared_secrets(
    x25519_ss: &[u8; 32],
    mlkem_ss: &[u8],
    ephemeral_public: &[u8],
    context_info: &[u8],
) -> Zeroizing<[u8; 32]> {
    let mut hasher = blake3::Hasher::new_derive_key(KDF_CONTEXT);
    hasher.update(x25519_ss);
    hasher.update(mlkem_ss);
    hasher.update(ephemeral_public);
    hasher.update(context_info);
    Zeroizing::new(*hasher.finalize().as_bytes())
}

fn invalid_key(what: &str, expected: usize, got: usize) -> KeysetError {
    KeysetError::InvalidKey(format!("{} must be {} bytes, got {}", what, expected, got))
}

pub struct X25519MlKem1024Decrypt {
    x25519_secret: StaticSecret,
    mlkem_dk: DecapsulationKey,
}

impl X25519MlKem1024Decrypt {
    pub fn from_bytes(bytes: &[u8]) -> keyset::Result<Self> {
        if bytes.len() != X25519_KEY_BYTES + MLKEM1024_DK_BYTES {
            return Err(invalid_key(
                "X25519+ML-KEM-1024 private key",
                X25519_KEY_BYTES + MLKEM1024_DK_BYTES,
                bytes.len(),
            ));
        }
        let (x25519, mlkem) = bytes.split_at(X25519_KEY_BYTES);

        let mut x25519_bytes = Zeroizing::new([0u8; X25519_KEY_BYTES]);
        x25519_bytes.copy_from_slice(x25519);

        // Reconstruct ML-KEM-1024 DecapsulationKey from raw bytes
        let dk_encoded = Encoded::<DecapsulationKey>::try_from(mlkem)
            .map_err(|_| invalid_key("ML-KEM-1024 decapsulation key", MLKEM1024_DK_BYTES, mlkem.len()))?;

        Ok(Self {
            x25519_secret: StaticSecret::from(*x25519_bytes),
            mlkem_dk: DecapsulationKey::from_bytes(&dk_encoded),
        })
    }

    /// Serialized public key matching a serialized private key.
    pub fn public_key_bytes(private: &[u8]) -> keyset::Result<Vec<u8>> {
        let decrypt = Self::from_bytes(private)?;
        let ek_start = X25519_KEY_BYTES + MLKEM1024_DK_PKE_BYTES;

        let mut public = Vec::with_capacity(X25519_KEY_BYTES + MLKEM1024_EK_BYTES);
        public.extend_from_slice(PublicKey::from(&decrypt.x25519_secret).as_bytes());
        public.extend_from_slice(&private[ek_start..ek_start + MLKEM1024_EK_BYTES]);
        Ok(public)
    }
}

impl HybridDecrypt for X25519MlKem1024Decrypt {
    fn decrypt(&self, ciphertext: &[u8], context_info: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < X25519_KEY_BYTES + MLKEM1024_CT_BYTES + XNONCE_BYTES + TAG_BYTES {
            return Err(HybridError::DecryptionFailed);
        }
        let (ephemeral, rest) = ciphertext.split_at(X25519_KEY_BYTES);
        let (kem_ct, rest) = rest.split_at(MLKEM1024_CT_BYTES);
        let (nonce, body) = rest.split_at(XNONCE_BYTES);

        // X25519 recover shared secret
        let ephemeral_public = parse_public_key(ephemeral).ok_or(HybridError::DecryptionFailed)?;
        let x25519_shared = contributory(self.x25519_secret.diffie_hellman(&ephemeral_public))
            .ok_or(HybridError::DecryptionFailed)?;

        // ML-KEM-1024 decapsulation
        let ct = ml_kem::Ciphertext::<MlKem1024>::try_from(kem_ct)
            .map_err(|_| HybridError::DecryptionFailed)?;
        let mlkem_ss = self
            .mlkem_dk
            .decapsulate(&ct)
            .map_err(|_| HybridError::DecryptionFailed)?;

        let key = combine_shared_secrets(
            x25519_shared.as_bytes(),
            mlkem_ss.as_ref(),
            ephemeral,
            context_info,
        );
        let cipher = XChaCha20Poly1305::new_from_slice(&key[..])
            .map_err(|_| HybridError::InvalidKeyLength)?;
        cipher
            .decrypt(XNonce::from_slice(nonce), body)
            .map_err(|_| HybridError::DecryptionFailed)
    }
}

impl Primitive for X25519MlKem1024Decrypt {
    fn name(&self) -> &'static str {
        "X25519MlKem1024Decrypt"
    }

    fn as_hybrid_decrypt(self: Arc<Self>) -> Option<Arc<dyn HybridDecrypt>> {
        Some(self)
    }
}

pub struct X25519MlKem1024Encrypt {
    x25519_public: PublicKey,
    mlkem_ek: EncapsulationKey,
}

impl X25519MlKem1024Encrypt {
    pub fn from_bytes(bytes: &[u8]) -> keyset::Result<Self> {
        if bytes.len() != X25519_KEY_BYTES + MLKEM1024_EK_BYTES {
            return Err(invalid_key(
                "X25519+ML-KEM-1024 public key",
                X25519_KEY_BYTES + MLKEM1024_EK_BYTES,
                bytes.len(),
            ));
        }
        let (x25519, mlkem) = bytes.split_at(X25519_KEY_BYTES);
        let x25519_public = parse_public_key(x25519)
            .ok_or_else(|| invalid_key("X25519 public key", X25519_KEY_BYTES, x25519.len()))?;

        // Reconstruct ML-KEM-1024 EncapsulationKey from raw bytes
        let ek_encoded = Encoded::<EncapsulationKey>::try_from(mlkem)
            .map_err(|_| invalid_key("ML-KEM-1024 encapsulation key", MLKEM1024_EK_BYTES, mlkem.len()))?;

        Ok(Self {
            x25519_public,
            mlkem_ek: EncapsulationKey::from_bytes(&ek_encoded),
        })
    }
}

impl HybridEncrypt for X25519MlKem1024Encrypt {
    fn encrypt(&self, plaintext: &[u8], context_info: &[u8]) -> Result<Vec<u8>> {
        // X25519 ephemeral key exchange
        let ephemeral_secret = EphemeralSecret::random_from_rng(OsRng);
        let ephemeral_public = PublicKey::from(&ephemeral_secret).to_bytes();
        let x25519_shared = contributory(ephemeral_secret.diffie_hellman(&self.x25519_public))
            .ok_or(HybridError::EncryptionFailed)?;

        // ML-KEM-1024 encapsulation
        let (kem_ct, mlkem_ss) = self
            .mlkem_ek
            .encapsulate(&mut OsRng)
            .map_err(|_| HybridError::EncryptionFailed)?;

        let key = combine_shared_secrets(
            x25519_shared.as_bytes(),
            mlkem_ss.as_ref(),
            &ephemeral_public,
            context_info,
        );
        let cipher = XChaCha20Poly1305::new_from_slice(&key[..])
            .map_err(|_| HybridError::InvalidKeyLength)?;

        let mut nonce = [0u8; XNONCE_BYTES];
        OsRng.fill_bytes(&mut nonce);
        let sealed = cipher
            .encrypt(XNonce::from_slice(&nonce), plaintext)
            .map_err(|_| HybridError::EncryptionFailed)?;

        let mut ciphertext = Vec::with_capacity(
            X25519_KEY_BYTES + MLKEM1024_CT_BYTES + XNONCE_BYTES + sealed.len(),
        );
        ciphertext.extend_from_slice(&ephemeral_public);
        ciphertext.extend(kem_ct.iter().copied());
        ciphertext.extend_from_slice(&nonce);
        ciphertext.extend_from_slice(&sealed);
        Ok(ciphertext)
    }
}

impl Primitive for X25519MlKem1024Encrypt {
    fn name(&self) -> &'static str {
        "X25519MlKem1024Encrypt"
    }

    fn as_hybrid_encrypt(self: Arc<Self>) -> Option<Arc<dyn HybridEncrypt>> {
        Some(self)
    }
}

pub struct X25519MlKem1024PrivateKeyManager;

impl KeyManager for X25519MlKem1024PrivateKeyManager {
    fn type_url(&self) -> &str {
        X25519_MLKEM1024_PRIVATE_KEY_TYPE_URL
    }

    fn primitive(&self, key_value: &[u8]) -> keyset::Result<Arc<dyn Primitive>> {
        Ok(Arc::new(X25519MlKem1024Decrypt::from_bytes(key_value)?))
    }

    fn public_key_data(&self, key_value: &[u8]) -> keyset::Result<KeyData> {
        Ok(KeyData {
            type_url: X25519_MLKEM1024_PUBLIC_KEY_TYPE_URL.to_string(),
            value: X25519MlKem1024Decrypt::public_key_bytes(key_value)?,
            material_type: KeyMaterialType::AsymmetricPublic,
        })
    }
}

pub struct X25519MlKem1024PublicKeyManager;

impl KeyManager for X25519MlKem1024PublicKeyManager {
    fn type_url(&self) -> &str {
        X25519_MLKEM1024_PUBLIC_KEY_TYPE_URL
    }

    fn primitive(&self, key_value: &[u8]) -> keyset::Result<Arc<dyn Primitive>> {
        Ok(Arc::new(X25519MlKem1024Encrypt::from_bytes(key_value)?))
    }
}
