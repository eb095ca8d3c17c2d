//! Streaming hybrid decryption for a keyset.
//!
//! Streams carry no key prefix, so only the primary key is ever used. Every
//! entry must still be able to stream-decrypt; a keyset mixing in a key type
//! without streaming support is rejected up front.

use std::io::Read;
use std::sync::Arc;

use crate::error::{capability, HybridError, Result};
use crate::primitive::{Primitive, StreamingHybridDecrypt};
use crate::primitive_set::PrimitiveSet;

use super::require_capability;

#[derive(Clone)]
pub struct WrappedStreamingHybridDecrypt {
    ps: Arc<PrimitiveSet<Arc<dyn StreamingHybridDecrypt>>>,
}

impl WrappedStreamingHybridDecrypt {
    pub fn new(ps: &PrimitiveSet<Arc<dyn Primitive>>) -> Result<Self> {
        let ps = require_capability(ps, capability::STREAMING_HYBRID_DECRYPT, |p| {
            p.as_streaming_hybrid_decrypt()
        })?;
        log::debug!(
            "streaming hybrid decrypt with primary {:#010x}",
            ps.primary().key_id
        );
        Ok(Self::from_primitive_set(Arc::new(ps)))
    }

    pub fn from_primitive_set(ps: Arc<PrimitiveSet<Arc<dyn StreamingHybridDecrypt>>>) -> Self {
        Self { ps }
    }

    pub fn primitive_set(&self) -> &PrimitiveSet<Arc<dyn StreamingHybridDecrypt>> {
        &self.ps
    }
}

impl StreamingHybridDecrypt for WrappedStreamingHybridDecrypt {
    fn new_decrypting_reader<'a>(
        &self,
        source: Box<dyn Read + Send + 'a>,
        context_info: &[u8],
    ) -> Result<Box<dyn Read + Send + 'a>> {
        self.ps
            .primary()
            .primitive
            .new_decrypting_reader(source, context_info)
            .map_err(|e| match e {
                HybridError::StreamInitFailed(reason) => HybridError::StreamInitFailed(reason),
                other => HybridError::StreamInitFailed(other.to_string()),
            })
    }
}
