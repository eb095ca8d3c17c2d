#![no_main]
use std::io::Read;

use libfuzzer_sys::fuzz_target;

use hybrid_keyset::kem::x25519_chacha::X25519_HKDF_CHACHA20POLY1305_PRIVATE_KEY_TYPE_URL;
use hybrid_keyset::keyset::{
    Key, KeyData, KeyMaterialType, KeyStatus, Keyset, KeysetHandle, OutputPrefixType,
};
use hybrid_keyset::{new_streaming_hybrid_decrypt, StreamingHybridDecrypt};

fuzz_target!(|data: &[u8]| {
    let handle = KeysetHandle::new(Keyset {
        primary_key_id: 1,
        keys: vec![Key {
            key_id: 1,
            status: KeyStatus::Enabled,
            output_prefix_type: OutputPrefixType::Raw,
            key_data: KeyData {
                type_url: X25519_HKDF_CHACHA20POLY1305_PRIVATE_KEY_TYPE_URL.to_string(),
                value: vec![0x42; 32],
                material_type: KeyMaterialType::SymmetricOrPrivate,
            },
        }],
    })
    .expect("valid keyset");
    let sd = new_streaming_hybrid_decrypt(&handle).expect("streaming keyset");

    // Header parsing and every segment must reject garbage without panicking
    if let Ok(mut reader) = sd.new_decrypting_reader(Box::new(data), b"") {
        let mut sink = Vec::new();
        let _ = reader.read_to_end(&mut sink);
    }
});
