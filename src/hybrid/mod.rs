//! Keyset-wrapping hybrid primitives.
//!
//! Each wrapper takes the primitive set of a whole keyset, checks once that
//! every entry provides the capability it needs, and then dispatches calls:
//!
//! | Wrapper | Dispatch |
//! |---------|----------|
//! | [`WrappedHybridDecrypt`] | prefix lookup, then every RAW key |
//! | [`WrappedStreamingHybridDecrypt`] | primary only |
//! | [`WrappedHybridEncrypt`] | primary, output prefixed with its key prefix |
//! | [`WrappedStreamingHybridEncrypt`] | primary only |

pub mod decrypt;
pub mod encrypt;
pub mod streaming;

pub use decrypt::WrappedHybridDecrypt;
pub use encrypt::{WrappedHybridEncrypt, WrappedStreamingHybridEncrypt};
pub use streaming::WrappedStreamingHybridDecrypt;

use std::sync::Arc;

use crate::error::{HybridError, Result};
use crate::keyset::KeysetHandle;
use crate::primitive::Primitive;
use crate::primitive_set::PrimitiveSet;
use crate::registry::KeyManager;

/// Hybrid decryption over every enabled key of `handle`.
pub fn new_hybrid_decrypt(handle: &KeysetHandle) -> Result<WrappedHybridDecrypt> {
    new_hybrid_decrypt_with_key_manager(handle, None)
}

/// Like [`new_hybrid_decrypt`], resolving supported key types through
/// `key_manager` instead of the registry.
pub fn new_hybrid_decrypt_with_key_manager(
    handle: &KeysetHandle,
    key_manager: Option<&dyn KeyManager>,
) -> Result<WrappedHybridDecrypt> {
    let ps = handle.primitives_with_key_manager(key_manager)?;
    WrappedHybridDecrypt::new(&ps)
}

/// Streaming hybrid decryption with the primary key of `handle`.
pub fn new_streaming_hybrid_decrypt(handle: &KeysetHandle) -> Result<WrappedStreamingHybridDecrypt> {
    new_streaming_hybrid_decrypt_with_key_manager(handle, None)
}

pub fn new_streaming_hybrid_decrypt_with_key_manager(
    handle: &KeysetHandle,
    key_manager: Option<&dyn KeyManager>,
) -> Result<WrappedStreamingHybridDecrypt> {
    let ps = handle.primitives_with_key_manager(key_manager)?;
    WrappedStreamingHybridDecrypt::new(&ps)
}

/// Hybrid encryption with the primary key of a public keyset `handle`.
pub fn new_hybrid_encrypt(handle: &KeysetHandle) -> Result<WrappedHybridEncrypt> {
    new_hybrid_encrypt_with_key_manager(handle, None)
}

pub fn new_hybrid_encrypt_with_key_manager(
    handle: &KeysetHandle,
    key_manager: Option<&dyn KeyManager>,
) -> Result<WrappedHybridEncrypt> {
    let ps = handle.primitives_with_key_manager(key_manager)?;
    WrappedHybridEncrypt::new(&ps)
}

pub fn new_streaming_hybrid_encrypt(handle: &KeysetHandle) -> Result<WrappedStreamingHybridEncrypt> {
    new_streaming_hybrid_encrypt_with_key_manager(handle, None)
}

pub fn new_streaming_hybrid_encrypt_with_key_manager(
    handle: &KeysetHandle,
    key_manager: Option<&dyn KeyManager>,
) -> Result<WrappedStreamingHybridEncrypt> {
    let ps = handle.primitives_with_key_manager(key_manager)?;
    WrappedStreamingHybridEncrypt::new(&ps)
}

/// Narrow every primitive of `ps` to capability `T`, primary first.
/// The first entry lacking it aborts with `CapabilityMismatch`.
pub(crate) fn require_capability<T: ?Sized>(
    ps: &PrimitiveSet<Arc<dyn Primitive>>,
    capability: &'static str,
    query: fn(Arc<dyn Primitive>) -> Option<Arc<T>>,
) -> Result<PrimitiveSet<Arc<T>>> {
    ps.try_map(|entry| {
        query(Arc::clone(&entry.primitive)).ok_or_else(|| {
            log::warn!(
                "key {:#010x} ({}) is not a {} primitive",
                entry.key_id,
                entry.primitive.name(),
                capability
            );
            HybridError::CapabilityMismatch {
                key_id: entry.key_id,
                primitive: entry.primitive.name(),
                capability,
            }
        })
    })
}
