//! Primitive capabilities.
//!
//! A key manager hands back an `Arc<dyn Primitive>`; the capabilities it
//! actually provides are discovered through the `as_*` queries, which the
//! keyset wrappers evaluate once when they are constructed.

use std::io::{self, Read, Write};
use std::sync::Arc;

use crate::error::Result;

/// Hybrid decryption: key decapsulation followed by authenticated decryption.
pub trait HybridDecrypt: Send + Sync {
    /// Decrypt `ciphertext`, authenticating `context_info` alongside it.
    fn decrypt(&self, ciphertext: &[u8], context_info: &[u8]) -> Result<Vec<u8>>;
}

/// Hybrid encryption towards a recipient public key.
pub trait HybridEncrypt: Send + Sync {
    fn encrypt(&self, plaintext: &[u8], context_info: &[u8]) -> Result<Vec<u8>>;
}

/// Streaming hybrid decryption over an arbitrary byte source.
pub trait StreamingHybridDecrypt: Send + Sync {
    /// Wrap `source` in a reader yielding plaintext. Header parsing and key
    /// decapsulation happen here, so a malformed or foreign stream fails
    /// before the first `read`.
    fn new_decrypting_reader<'a>(
        &self,
        source: Box<dyn Read + Send + 'a>,
        context_info: &[u8],
    ) -> Result<Box<dyn Read + Send + 'a>>;
}

/// Writer side of a streaming encryption. `finish` must be called to emit the
/// final authenticated segment; dropping the writer leaves a truncated stream.
pub trait EncryptingWrite: Write + Send {
    fn finish(self: Box<Self>) -> io::Result<()>;
}

/// Streaming hybrid encryption into an arbitrary byte sink.
pub trait StreamingHybridEncrypt: Send + Sync {
    fn new_encrypting_writer<'a>(
        &self,
        sink: Box<dyn Write + Send + 'a>,
        context_info: &[u8],
    ) -> Result<Box<dyn EncryptingWrite + 'a>>;
}

/// A primitive produced by a key manager.
///
/// Every capability query defaults to `None`; implementations opt in by
/// returning themselves.
pub trait Primitive: Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    fn as_hybrid_decrypt(self: Arc<Self>) -> Option<Arc<dyn HybridDecrypt>> {
        None
    }

    fn as_hybrid_encrypt(self: Arc<Self>) -> Option<Arc<dyn HybridEncrypt>> {
        None
    }

    fn as_streaming_hybrid_decrypt(self: Arc<Self>) -> Option<Arc<dyn StreamingHybridDecrypt>> {
        None
    }

    fn as_streaming_hybrid_encrypt(self: Arc<Self>) -> Option<Arc<dyn StreamingHybridEncrypt>> {
        None
    }
}
