use thiserror::Error;

use crate::keyset::KeysetError;

/// Errors surfaced by the hybrid primitives and the keyset-wrapping dispatchers.
///
/// `DecryptionFailed` is opaque: the dispatcher returns it once
/// every candidate entry has been tried, without saying which keys were
/// attempted or why each one rejected the ciphertext.
#[derive(Error, Debug)]
pub enum HybridError {
    #[error("Entry {key_id:#010x} ({primitive}) is not a {capability} primitive")]
    CapabilityMismatch {
        key_id: u32,
        primitive: &'static str,
        capability: &'static str,
    },
    #[error("Cannot obtain primitive set: {0}")]
    PrimitiveSetUnavailable(#[from] KeysetError),
    #[error("Decryption failed")]
    DecryptionFailed,
    #[error("Encryption failed")]
    EncryptionFailed,
    #[error("Invalid key length")]
    InvalidKeyLength,
    #[error("Invalid stream segment size {0}")]
    InvalidSegmentSize(usize),
    #[error("Cannot initialize decrypting stream: {0}")]
    StreamInitFailed(String),
}

pub type Result<T> = std::result::Result<T, HybridError>;

/// Capability names used in `CapabilityMismatch` messages.
pub(crate) mod capability {
    pub const HYBRID_DECRYPT: &str = "HybridDecrypt";
    pub const HYBRID_ENCRYPT: &str = "HybridEncrypt";
    pub const STREAMING_HYBRID_DECRYPT: &str = "StreamingHybridDecrypt";
    pub const STREAMING_HYBRID_ENCRYPT: &str = "StreamingHybridEncrypt";
}
