//! Ciphertext output prefixes.
//!
//! Every non-raw ciphertext starts with a 5-byte prefix naming the key that
//! produced it: a start byte followed by the big-endian key id. Raw keys emit
//! no prefix at all.

use crate::keyset::{Key, OutputPrefixType};

/// Size of the prefix carried by TINK, LEGACY and CRUNCHY ciphertexts.
pub const NON_RAW_PREFIX_SIZE: usize = 5;

/// Start byte for TINK-format prefixes.
pub const TINK_START_BYTE: u8 = 0x01;

/// Start byte for LEGACY and CRUNCHY prefixes.
pub const LEGACY_START_BYTE: u8 = 0x00;

/// Prefix of RAW ciphertexts (empty).
pub const RAW_PREFIX: &[u8] = &[];

/// Compute the output prefix for a key.
pub fn output_prefix(key: &Key) -> Vec<u8> {
    prefix_for(key.output_prefix_type, key.key_id)
}

/// Compute the output prefix for a prefix type and key id.
pub fn prefix_for(prefix_type: OutputPrefixType, key_id: u32) -> Vec<u8> {
    match prefix_type {
        OutputPrefixType::Tink => create_prefix(TINK_START_BYTE, key_id),
        OutputPrefixType::Legacy | OutputPrefixType::Crunchy => {
            create_prefix(LEGACY_START_BYTE, key_id)
        }
        OutputPrefixType::Raw => RAW_PREFIX.to_vec(),
    }
}

fn create_prefix(start_byte: u8, key_id: u32) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(NON_RAW_PREFIX_SIZE);
    prefix.push(start_byte);
    prefix.extend_from_slice(&key_id.to_be_bytes());
    prefix
}
