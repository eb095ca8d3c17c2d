//! Multi-key hybrid decryption.
//!
//! Non-raw ciphertexts carry a 5-byte prefix naming the key that produced
//! them. The prefix is only a hint: several keys may share it, and a RAW key
//! leaves no prefix at all. `decrypt` therefore:
//!
//! 1. tries every entry whose prefix matches the first 5 bytes, on the
//!    remainder of the ciphertext, in keyset order;
//! 2. tries every RAW entry on the whole ciphertext, in keyset order;
//! 3. returns `DecryptionFailed` when nothing accepted it.
//!
//! Individual failures are discarded. A caller cannot tell a wrong key from a
//! tampered ciphertext or mismatched context info.

use std::sync::Arc;

use crate::cryptofmt::NON_RAW_PREFIX_SIZE;
use crate::error::{capability, HybridError, Result};
use crate::primitive::{HybridDecrypt, Primitive};
use crate::primitive_set::{Entry, PrimitiveSet};

use super::require_capability;

/// [`HybridDecrypt`] over every key of a keyset.
#[derive(Clone)]
pub struct WrappedHybridDecrypt {
    ps: Arc<PrimitiveSet<Arc<dyn HybridDecrypt>>>,
}

impl WrappedHybridDecrypt {
    /// Fails with `CapabilityMismatch` if the primary or any other entry of
    /// `ps` cannot decrypt.
    pub fn new(ps: &PrimitiveSet<Arc<dyn Primitive>>) -> Result<Self> {
        let ps = require_capability(ps, capability::HYBRID_DECRYPT, |p| p.as_hybrid_decrypt())?;
        log::debug!(
            "hybrid decrypt over {} entries ({} raw), primary {:#010x}",
            ps.len(),
            ps.raw_entries().len(),
            ps.primary().key_id
        );
        Ok(Self::from_primitive_set(Arc::new(ps)))
    }

    /// Wrap a set whose entries are already known to decrypt.
    pub fn from_primitive_set(ps: Arc<PrimitiveSet<Arc<dyn HybridDecrypt>>>) -> Self {
        Self { ps }
    }

    pub fn primitive_set(&self) -> &PrimitiveSet<Arc<dyn HybridDecrypt>> {
        &self.ps
    }
}

/// First plaintext any of `entries` produces, in order.
fn first_success(
    entries: &[Arc<Entry<Arc<dyn HybridDecrypt>>>],
    ciphertext: &[u8],
    context_info: &[u8],
) -> Option<Vec<u8>> {
    entries
        .iter()
        .find_map(|entry| entry.primitive.decrypt(ciphertext, context_info).ok())
}

impl HybridDecrypt for WrappedHybridDecrypt {
    fn decrypt(&self, ciphertext: &[u8], context_info: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() > NON_RAW_PREFIX_SIZE {
            let (prefix, body) = ciphertext.split_at(NON_RAW_PREFIX_SIZE);
            match self.ps.entries_for_prefix(prefix) {
                Some(entries) => {
                    if let Some(plaintext) = first_success(entries, body, context_info) {
                        return Ok(plaintext);
                    }
                }
                None => log::trace!("no key for ciphertext prefix {}", hex::encode(prefix)),
            }
        }

        if let Some(plaintext) = first_success(self.ps.raw_entries(), ciphertext, context_info) {
            return Ok(plaintext);
        }

        log::debug!("hybrid decryption failed: no key accepted the ciphertext");
        Err(HybridError::DecryptionFailed)
    }
}
