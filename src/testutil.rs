//! Shared fixtures for unit tests.

use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{HybridError, Result};
use crate::kem::x25519_chacha::X25519_HKDF_CHACHA20POLY1305_PRIVATE_KEY_TYPE_URL;
use crate::keyset::{self, Key, KeyData, KeyMaterialType, KeyStatus, OutputPrefixType};
use crate::primitive::{HybridDecrypt, HybridEncrypt, Primitive, StreamingHybridDecrypt};
use crate::primitive_set::{PrimitiveSet, PrimitiveSetBuilder};
use crate::registry::KeyManager;

/// Enabled key with placeholder material.
pub(crate) fn key(key_id: u32, prefix_type: OutputPrefixType) -> Key {
    Key {
        key_id,
        status: KeyStatus::Enabled,
        output_prefix_type: prefix_type,
        key_data: KeyData {
            type_url: "type.example/test".to_string(),
            value: vec![],
            material_type: KeyMaterialType::SymmetricOrPrivate,
        },
    }
}

/// Enabled X25519 private key whose secret is derived from `key_id`.
pub(crate) fn x25519_private_key(key_id: u32, prefix_type: OutputPrefixType) -> Key {
    let mut secret = [0x5au8; 32];
    secret[..4].copy_from_slice(&key_id.to_be_bytes());
    Key {
        key_id,
        status: KeyStatus::Enabled,
        output_prefix_type: prefix_type,
        key_data: KeyData {
            type_url: X25519_HKDF_CHACHA20POLY1305_PRIVATE_KEY_TYPE_URL.to_string(),
            value: secret.to_vec(),
            material_type: KeyMaterialType::SymmetricOrPrivate,
        },
    }
}

/// Serialized X25519 + ML-KEM-1024 private key, deterministic in `seed`.
#[cfg(feature = "pqc")]
pub(crate) fn mlkem_private_key_bytes(seed: u8) -> Vec<u8> {
    use ml_kem::{EncodedSizeUser, KemCore, MlKem1024};
    use rand::{RngCore, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    let mut rng = ChaCha20Rng::from_seed([seed; 32]);
    let mut x25519 = [0u8; 32];
    rng.fill_bytes(&mut x25519);
    let (dk, _ek) = MlKem1024::generate(&mut rng);

    let mut bytes = x25519.to_vec();
    bytes.extend_from_slice(&dk.as_bytes());
    bytes
}

/// Records which stubs were asked to decrypt, in call order.
#[derive(Clone, Default)]
pub(crate) struct Trail(Arc<Mutex<Vec<&'static str>>>);

impl Trail {
    pub(crate) fn take(&self) -> Vec<&'static str> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }

    fn record(&self, label: &'static str) {
        self.0.lock().unwrap().push(label);
    }
}

#[derive(Clone, Copy, Default)]
struct Capabilities {
    decrypt: bool,
    encrypt: bool,
    streaming: bool,
}

/// Instrumented primitive with fixed behaviour.
///
/// Decryption succeeds only for the exact ciphertext it was built with and
/// returns its label. Encryption returns [`FixedPrimitive::sealed`] of the
/// plaintext. Streaming decryption yields the label, or fails if built with
/// [`FixedPrimitive::streaming_failing`].
pub(crate) struct FixedPrimitive {
    label: &'static str,
    accepts: Vec<u8>,
    capabilities: Capabilities,
    stream_fails: bool,
    calls: AtomicUsize,
    trail: Mutex<Option<Trail>>,
}

impl FixedPrimitive {
    fn build(label: &'static str, accepts: &[u8], capabilities: Capabilities) -> Arc<Self> {
        Arc::new(Self {
            label,
            accepts: accepts.to_vec(),
            capabilities,
            stream_fails: false,
            calls: AtomicUsize::new(0),
            trail: Mutex::new(None),
        })
    }

    pub(crate) fn decrypting(label: &'static str, accepts: &[u8]) -> Arc<Self> {
        Self::build(label, accepts, Capabilities { decrypt: true, ..Default::default() })
    }

    pub(crate) fn encrypt_only() -> Arc<Self> {
        Self::build("encrypt", &[], Capabilities { encrypt: true, ..Default::default() })
    }

    pub(crate) fn streaming(label: &'static str) -> Arc<Self> {
        Self::build(label, &[], Capabilities { streaming: true, ..Default::default() })
    }

    pub(crate) fn streaming_failing() -> Arc<Self> {
        let mut stub = Self::streaming("failing");
        Arc::get_mut(&mut stub).unwrap().stream_fails = true;
        stub
    }

    /// What `encrypt` returns for `plaintext`.
    pub(crate) fn sealed(plaintext: &[u8]) -> Vec<u8> {
        let mut out = b"sealed:".to_vec();
        out.extend_from_slice(plaintext);
        out
    }

    pub(crate) fn with_trail(self: Arc<Self>, trail: &Trail) -> Arc<Self> {
        *self.trail.lock().unwrap() = Some(trail.clone());
        self
    }

    /// Decrypt and stream-open calls seen so far.
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(trail) = self.trail.lock().unwrap().as_ref() {
            trail.record(self.label);
        }
    }
}

impl HybridDecrypt for FixedPrimitive {
    fn decrypt(&self, ciphertext: &[u8], _context_info: &[u8]) -> Result<Vec<u8>> {
        self.touch();
        if ciphertext == self.accepts.as_slice() {
            Ok(self.label.as_bytes().to_vec())
        } else {
            Err(HybridError::DecryptionFailed)
        }
    }
}

impl HybridEncrypt for FixedPrimitive {
    fn encrypt(&self, plaintext: &[u8], _context_info: &[u8]) -> Result<Vec<u8>> {
        Ok(Self::sealed(plaintext))
    }
}

impl StreamingHybridDecrypt for FixedPrimitive {
    fn new_decrypting_reader<'a>(
        &self,
        _source: Box<dyn Read + Send + 'a>,
        _context_info: &[u8],
    ) -> Result<Box<dyn Read + Send + 'a>> {
        self.touch();
        if self.stream_fails {
            return Err(HybridError::DecryptionFailed);
        }
        Ok(Box::new(Cursor::new(self.label.as_bytes().to_vec())))
    }
}

impl Primitive for FixedPrimitive {
    fn name(&self) -> &'static str {
        "FixedPrimitive"
    }

    fn as_hybrid_decrypt(self: Arc<Self>) -> Option<Arc<dyn HybridDecrypt>> {
        if self.capabilities.decrypt {
            Some(self)
        } else {
            None
        }
    }

    fn as_hybrid_encrypt(self: Arc<Self>) -> Option<Arc<dyn HybridEncrypt>> {
        if self.capabilities.encrypt {
            Some(self)
        } else {
            None
        }
    }

    fn as_streaming_hybrid_decrypt(self: Arc<Self>) -> Option<Arc<dyn StreamingHybridDecrypt>> {
        if self.capabilities.streaming {
            Some(self)
        } else {
            None
        }
    }
}

/// Primitive set over `entries` in order, with the first entry whose key id
/// is `primary_id` as primary.
pub(crate) fn stub_set(
    entries: Vec<(Arc<FixedPrimitive>, Key)>,
    primary_id: u32,
) -> PrimitiveSet<Arc<dyn Primitive>> {
    let mut builder = PrimitiveSetBuilder::<Arc<dyn Primitive>>::new();
    let mut primary = None;
    for (primitive, key) in entries {
        let index = builder.add(primitive as Arc<dyn Primitive>, &key).unwrap();
        if key.key_id == primary_id && primary.is_none() {
            primary = Some(index);
        }
    }
    builder.set_primary(primary.unwrap()).unwrap();
    builder.build().unwrap()
}

/// Key manager handing out one shared primitive regardless of key material.
pub(crate) struct StubKeyManager {
    type_url: String,
    primitive: Arc<FixedPrimitive>,
}

impl StubKeyManager {
    pub(crate) fn new(type_url: &str, primitive: Arc<FixedPrimitive>) -> Self {
        Self {
            type_url: type_url.to_string(),
            primitive,
        }
    }
}

impl KeyManager for StubKeyManager {
    fn type_url(&self) -> &str {
        &self.type_url
    }

    fn primitive(&self, _key_value: &[u8]) -> keyset::Result<Arc<dyn Primitive>> {
        Ok(self.primitive.clone())
    }
}
