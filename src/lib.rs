//! # Hybrid Keyset
//!
//! **Keyset-aware hybrid decryption with key rotation.**
//!
//! A keyset holds several hybrid key pairs at once: the primary one used for
//! new messages, and older or raw keys kept around so that ciphertexts
//! produced under them stay readable. The wrappers in [`hybrid`] turn a whole
//! keyset into a single primitive:
//!
//! - **Prefix-guided selection**: ciphertexts start with a 5-byte tag naming
//!   the key that produced them, so only matching keys are tried
//! - **Raw-key fallback**: keys that emit no tag are tried on every ciphertext
//! - **Opaque failure**: callers learn only that decryption failed
//! - **Streaming**: segmented authenticated streams decrypted with the primary
//! - **Post-quantum key type**: X25519 + ML-KEM-1024 (`pqc` feature)
//!
//! ## Quick Start
//!
//! ```rust
//! use hybrid_keyset::kem::x25519_chacha::X25519_HKDF_CHACHA20POLY1305_PRIVATE_KEY_TYPE_URL;
//! use hybrid_keyset::keyset::{
//!     Key, KeyData, KeyMaterialType, KeyStatus, Keyset, KeysetHandle, OutputPrefixType,
//! };
//! use hybrid_keyset::{new_hybrid_decrypt, new_hybrid_encrypt, HybridDecrypt, HybridEncrypt};
//!
//! let key = Key {
//!     key_id: 42,
//!     status: KeyStatus::Enabled,
//!     output_prefix_type: OutputPrefixType::Tink,
//!     key_data: KeyData {
//!         type_url: X25519_HKDF_CHACHA20POLY1305_PRIVATE_KEY_TYPE_URL.to_string(),
//!         value: vec![0x11; 32],
//!         material_type: KeyMaterialType::SymmetricOrPrivate,
//!     },
//! };
//! let private = KeysetHandle::new(Keyset { primary_key_id: 42, keys: vec![key] })?;
//!
//! let ciphertext = new_hybrid_encrypt(&private.public()?)?.encrypt(b"hello", b"ctx")?;
//! let plaintext = new_hybrid_decrypt(&private)?.decrypt(&ciphertext, b"ctx")?;
//! assert_eq!(plaintext, b"hello");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`keyset`] | Keyset model, validation, handle |
//! | [`registry`] | Key-manager registry keyed by type URL |
//! | [`primitive`] | Capability traits and the `Primitive` query interface |
//! | [`primitive_set`] | Primitives grouped by output prefix |
//! | [`cryptofmt`] | Output prefix format |
//! | [`kem`] | Bundled hybrid key types and the segmented stream format |
//! | [`hybrid`] | Keyset-wrapping encrypt/decrypt dispatchers |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `std` | Yes | Standard library support |
//! | `pqc` | Yes | X25519 + ML-KEM-1024 key type (adds `ml-kem`, `blake3`) |

#![allow(clippy::type_complexity)]

// ── Public modules ──────────────────────────────────────────────────────────

pub mod cryptofmt;
pub mod error;
pub mod hybrid;
pub mod kem;
pub mod keyset;
pub mod primitive;
pub mod primitive_set;
pub mod registry;

#[cfg(test)]
mod testutil;

// ── Re-exports for convenience ──────────────────────────────────────────────

pub use error::{HybridError, Result};

pub use hybrid::{
    new_hybrid_decrypt, new_hybrid_decrypt_with_key_manager, new_hybrid_encrypt,
    new_hybrid_encrypt_with_key_manager, new_streaming_hybrid_decrypt,
    new_streaming_hybrid_decrypt_with_key_manager, new_streaming_hybrid_encrypt,
    new_streaming_hybrid_encrypt_with_key_manager, WrappedHybridDecrypt, WrappedHybridEncrypt,
    WrappedStreamingHybridDecrypt, WrappedStreamingHybridEncrypt,
};

pub use keyset::{KeysetError, KeysetHandle};

pub use primitive::{
    EncryptingWrite, HybridDecrypt, HybridEncrypt, Primitive, StreamingHybridDecrypt,
    StreamingHybridEncrypt,
};

pub use primitive_set::PrimitiveSet;

pub use registry::{register_key_manager, KeyManager};

// ── Library metadata ────────────────────────────────────────────────────────

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn version() -> &'static str {
    VERSION
}
