//! Encryption with the primary key of a public keyset.

use std::io::Write;
use std::sync::Arc;

use crate::error::{capability, Result};
use crate::primitive::{
    EncryptingWrite, HybridEncrypt, Primitive, StreamingHybridEncrypt,
};
use crate::primitive_set::PrimitiveSet;

use super::require_capability;

/// Output: `[primary prefix][primary ciphertext]`. The prefix is empty for
/// a RAW primary.
#[derive(Clone)]
pub struct WrappedHybridEncrypt {
    ps: Arc<PrimitiveSet<Arc<dyn HybridEncrypt>>>,
}

impl WrappedHybridEncrypt {
    pub fn new(ps: &PrimitiveSet<Arc<dyn Primitive>>) -> Result<Self> {
        let ps = require_capability(ps, capability::HYBRID_ENCRYPT, |p| p.as_hybrid_encrypt())?;
        log::debug!("hybrid encrypt with primary {:#010x}", ps.primary().key_id);
        Ok(Self { ps: Arc::new(ps) })
    }
}

impl HybridEncrypt for WrappedHybridEncrypt {
    fn encrypt(&self, plaintext: &[u8], context_info: &[u8]) -> Result<Vec<u8>> {
        let primary = self.ps.primary();
        let body = primary.primitive.encrypt(plaintext, context_info)?;
        let mut out = Vec::with_capacity(primary.prefix.len() + body.len());
        out.extend_from_slice(&primary.prefix);
        out.extend_from_slice(&body);
        Ok(out)
    }
}

/// Streams are never prefixed.
#[derive(Clone)]
pub struct WrappedStreamingHybridEncrypt {
    ps: Arc<PrimitiveSet<Arc<dyn StreamingHybridEncrypt>>>,
}

impl WrappedStreamingHybridEncrypt {
    pub fn new(ps: &PrimitiveSet<Arc<dyn Primitive>>) -> Result<Self> {
        let ps = require_capability(ps, capability::STREAMING_HYBRID_ENCRYPT, |p| {
            p.as_streaming_hybrid_encrypt()
        })?;
        Ok(Self { ps: Arc::new(ps) })
    }
}

impl StreamingHybridEncrypt for WrappedStreamingHybridEncrypt {
    fn new_encrypting_writer<'a>(
        &self,
        sink: Box<dyn Write + Send + 'a>,
        context_info: &[u8],
    ) -> Result<Box<dyn EncryptingWrite + 'a>> {
        self.ps
            .primary()
            .primitive
            .new_encrypting_writer(sink, context_info)
    }
}
