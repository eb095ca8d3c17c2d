#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use hybrid_keyset::kem::x25519_chacha::X25519_HKDF_CHACHA20POLY1305_PRIVATE_KEY_TYPE_URL;
use hybrid_keyset::keyset::{
    Key, KeyData, KeyMaterialType, KeyStatus, Keyset, KeysetHandle, OutputPrefixType,
};
use hybrid_keyset::{new_hybrid_decrypt, HybridDecrypt};

#[derive(Arbitrary, Debug)]
struct Input {
    ciphertext: Vec<u8>,
    context_info: Vec<u8>,
    /// Low byte of the first key id, so fuzzed prefixes can hit it.
    key_id: u8,
}

fn key(key_id: u32, prefix: OutputPrefixType) -> Key {
    Key {
        key_id,
        status: KeyStatus::Enabled,
        output_prefix_type: prefix,
        key_data: KeyData {
            type_url: X25519_HKDF_CHACHA20POLY1305_PRIVATE_KEY_TYPE_URL.to_string(),
            value: vec![key_id as u8 | 0x40; 32],
            material_type: KeyMaterialType::SymmetricOrPrivate,
        },
    }
}

fuzz_target!(|input: Input| {
    let tink = u32::from(input.key_id);
    let handle = KeysetHandle::new(Keyset {
        primary_key_id: tink,
        keys: vec![
            key(tink, OutputPrefixType::Tink),
            key(tink + 0x100, OutputPrefixType::Legacy),
            key(tink + 0x200, OutputPrefixType::Raw),
        ],
    })
    .expect("valid keyset");
    let hd = new_hybrid_decrypt(&handle).expect("decrypt-capable keyset");

    // Arbitrary bytes must fail cleanly, never panic
    let _ = hd.decrypt(&input.ciphertext, &input.context_info);
});
