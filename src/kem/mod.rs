//! Bundled hybrid key types.
//!
//! | Key type | KEM | AEAD | Streaming |
//! |----------|-----|------|-----------|
//! | [`x25519_chacha`] | X25519 + HKDF-SHA256 | ChaCha20-Poly1305 | yes |
//! | [`x25519_mlkem`] | X25519 + ML-KEM-1024, BLAKE3-KDF | XChaCha20-Poly1305 | no |

pub mod streaming;
pub mod x25519_chacha;
#[cfg(feature = "pqc")]
pub mod x25519_mlkem;

use std::sync::Arc;

use hkdf::Hkdf;
use sha2::Sha256;
use x25519_dalek::{PublicKey, SharedSecret};
use zeroize::Zeroizing;

use crate::error::{HybridError, Result};
use crate::registry::KeyManager;

/// X25519 public and secret key size.
pub const X25519_KEY_BYTES: usize = 32;
/// Poly1305 tag size.
pub const TAG_BYTES: usize = 16;

/// Key managers installed in the registry on first use.
pub(crate) fn bundled_key_managers() -> Vec<Arc<dyn KeyManager>> {
    #[cfg_attr(not(feature = "pqc"), allow(unused_mut))]
    let mut managers: Vec<Arc<dyn KeyManager>> = vec![
        Arc::new(x25519_chacha::X25519HkdfChaCha20Poly1305PrivateKeyManager),
        Arc::new(x25519_chacha::X25519HkdfChaCha20Poly1305PublicKeyManager),
    ];
    #[cfg(feature = "pqc")]
    {
        managers.push(Arc::new(x25519_mlkem::X25519MlKem1024PrivateKeyManager));
        managers.push(Arc::new(x25519_mlkem::X25519MlKem1024PublicKeyManager));
    }
    managers
}

/// Parse a 32-byte X25519 public key.
pub(crate) fn parse_public_key(bytes: &[u8]) -> Option<PublicKey> {
    let bytes: [u8; X25519_KEY_BYTES] = bytes.try_into().ok()?;
    Some(PublicKey::from(bytes))
}

/// Reject low-order peer points, whose shared secret is all zeroes.
pub(crate) fn contributory(shared: SharedSecret) -> Option<SharedSecret> {
    shared.was_contributory().then_some(shared)
}

/// HKDF-SHA256 expansion into a 32-byte AEAD key and a 12-byte nonce.
pub(crate) fn hkdf_key_and_nonce(
    ikm: &[u8],
    salt: &[u8],
    info: &[u8],
) -> Result<(Zeroizing<[u8; 32]>, [u8; 12])> {
    let hkdf = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = Zeroizing::new([0u8; 44]);
    hkdf.expand(info, &mut okm[..])
        .map_err(|_| HybridError::InvalidKeyLength)?;

    let mut key = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(&okm[..32]);
    let mut nonce = [0u8; 12];
    nonce.copy_from_slice(&okm[32..]);
    Ok((key, nonce))
}

/// HKDF-SHA256 expansion into a 32-byte AEAD key.
pub(crate) fn hkdf_key(ikm: &[u8], salt: &[u8], info: &[&[u8]]) -> Result<Zeroizing<[u8; 32]>> {
    let hkdf = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut key = Zeroizing::new([0u8; 32]);
    hkdf.expand_multi_info(info, &mut key[..])
        .map_err(|_| HybridError::InvalidKeyLength)?;
    Ok(key)
}
