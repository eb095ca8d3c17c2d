//! Key rotation through the public API: keysets grow, primaries move, old
//! keys are disabled, and ciphertexts from every stage stay decryptable for
//! as long as their key is enabled.

use std::io::{Read, Write};

use hybrid_keyset::kem::x25519_chacha::X25519_HKDF_CHACHA20POLY1305_PRIVATE_KEY_TYPE_URL;
use hybrid_keyset::keyset::{
    Key, KeyData, KeyMaterialType, KeyStatus, Keyset, KeysetHandle, OutputPrefixType,
};
use hybrid_keyset::{
    new_hybrid_decrypt, new_hybrid_encrypt, new_streaming_hybrid_decrypt,
    new_streaming_hybrid_encrypt, HybridDecrypt, HybridEncrypt, HybridError,
    StreamingHybridDecrypt, StreamingHybridEncrypt,
};

fn x25519_key(key_id: u32, prefix: OutputPrefixType) -> Key {
    let mut secret = [0u8; 32];
    secret[..4].copy_from_slice(&key_id.to_le_bytes());
    secret[31] = 0x77;
    Key {
        key_id,
        status: KeyStatus::Enabled,
        output_prefix_type: prefix,
        key_data: KeyData {
            type_url: X25519_HKDF_CHACHA20POLY1305_PRIVATE_KEY_TYPE_URL.to_string(),
            value: secret.to_vec(),
            material_type: KeyMaterialType::SymmetricOrPrivate,
        },
    }
}

fn handle(primary: u32, keys: Vec<Key>) -> KeysetHandle {
    KeysetHandle::new(Keyset { primary_key_id: primary, keys }).unwrap()
}

fn encrypt_with(private: &KeysetHandle, msg: &[u8], ctx: &[u8]) -> Vec<u8> {
    new_hybrid_encrypt(&private.public().unwrap())
        .unwrap()
        .encrypt(msg, ctx)
        .unwrap()
}

#[test]
fn three_stage_rotation() {
    // Stage 1: a single raw key, as produced by an older deployment.
    let stage1 = handle(10, vec![x25519_key(10, OutputPrefixType::Raw)]);
    let ct1 = encrypt_with(&stage1, b"stage one", b"app");

    // Stage 2: a prefixed key is added and promoted.
    let stage2 = handle(
        20,
        vec![
            x25519_key(10, OutputPrefixType::Raw),
            x25519_key(20, OutputPrefixType::Tink),
        ],
    );
    let ct2 = encrypt_with(&stage2, b"stage two", b"app");
    assert_eq!(ct2[0], 0x01);

    // Stage 3: a legacy-prefixed key becomes primary.
    let stage3 = handle(
        30,
        vec![
            x25519_key(10, OutputPrefixType::Raw),
            x25519_key(20, OutputPrefixType::Tink),
            x25519_key(30, OutputPrefixType::Legacy),
        ],
    );
    let ct3 = encrypt_with(&stage3, b"stage three", b"app");
    assert_eq!(ct3[0], 0x00);

    let hd = new_hybrid_decrypt(&stage3).unwrap();
    assert_eq!(hd.decrypt(&ct1, b"app").unwrap(), b"stage one");
    assert_eq!(hd.decrypt(&ct2, b"app").unwrap(), b"stage two");
    assert_eq!(hd.decrypt(&ct3, b"app").unwrap(), b"stage three");

    // Earlier stages cannot read what later keys produced.
    let hd1 = new_hybrid_decrypt(&stage1).unwrap();
    assert!(matches!(hd1.decrypt(&ct3, b"app"), Err(HybridError::DecryptionFailed)));
}

#[test]
fn disabling_a_key_retires_its_ciphertexts() {
    let both = handle(
        2,
        vec![
            x25519_key(1, OutputPrefixType::Tink),
            x25519_key(2, OutputPrefixType::Tink),
        ],
    );
    let old = handle(1, vec![x25519_key(1, OutputPrefixType::Tink)]);
    let ct = encrypt_with(&old, b"old", b"");
    assert_eq!(new_hybrid_decrypt(&both).unwrap().decrypt(&ct, b"").unwrap(), b"old");

    let mut retired = x25519_key(1, OutputPrefixType::Tink);
    retired.status = KeyStatus::Disabled;
    let after = handle(2, vec![retired, x25519_key(2, OutputPrefixType::Tink)]);
    assert!(new_hybrid_decrypt(&after).unwrap().decrypt(&ct, b"").is_err());
}

#[test]
fn tampering_and_wrong_context_are_indistinguishable() {
    let keyset = handle(
        5,
        vec![
            x25519_key(4, OutputPrefixType::Raw),
            x25519_key(5, OutputPrefixType::Tink),
        ],
    );
    let hd = new_hybrid_decrypt(&keyset).unwrap();
    let ct = encrypt_with(&keyset, b"payload", b"ctx");

    let mut tampered = ct.clone();
    let last = tampered.len() - 1;
    tampered[last] ^= 0x01;

    let mut bad_prefix = ct.clone();
    bad_prefix[4] ^= 0xff;

    let errors = [
        hd.decrypt(&tampered, b"ctx").unwrap_err().to_string(),
        hd.decrypt(&ct, b"other").unwrap_err().to_string(),
        hd.decrypt(&bad_prefix, b"ctx").unwrap_err().to_string(),
        hd.decrypt(&ct[..3], b"ctx").unwrap_err().to_string(),
    ];
    assert!(errors.iter().all(|e| e == "Decryption failed"));
}

#[test]
fn streaming_uses_primary_after_rotation() {
    let keyset = handle(
        2,
        vec![
            x25519_key(1, OutputPrefixType::Tink),
            x25519_key(2, OutputPrefixType::Raw),
        ],
    );
    let se = new_streaming_hybrid_encrypt(&keyset.public().unwrap()).unwrap();
    let sd = new_streaming_hybrid_decrypt(&keyset).unwrap();

    let plaintext: Vec<u8> = (0..200_000u32).map(|i| (i * 7 % 256) as u8).collect();
    let mut stream = Vec::new();
    {
        let mut writer = se.new_encrypting_writer(Box::new(&mut stream), b"file").unwrap();
        for chunk in plaintext.chunks(4096) {
            writer.write_all(chunk).unwrap();
        }
        writer.finish().unwrap();
    }

    let mut reader = sd.new_decrypting_reader(Box::new(stream.as_slice()), b"file").unwrap();
    let mut out = Vec::new();
    reader.read_to_end(&mut out).unwrap();
    assert_eq!(out, plaintext);

    // A stream for the non-primary key is not picked up by fallback.
    let old_only = handle(1, vec![x25519_key(1, OutputPrefixType::Tink)]);
    let se_old = new_streaming_hybrid_encrypt(&old_only.public().unwrap()).unwrap();
    let mut old_stream = Vec::new();
    {
        let mut writer = se_old.new_encrypting_writer(Box::new(&mut old_stream), b"").unwrap();
        writer.write_all(b"for key one").unwrap();
        writer.finish().unwrap();
    }
    let opened = sd
        .new_decrypting_reader(Box::new(old_stream.as_slice()), b"")
        .and_then(|mut r| {
            let mut out = Vec::new();
            r.read_to_end(&mut out).map_err(|_| HybridError::DecryptionFailed)?;
            Ok(out)
        });
    assert!(opened.is_err());
}

#[cfg(feature = "pqc")]
#[test]
fn post_quantum_key_joins_classical_keyset() {
    use hybrid_keyset::kem::x25519_mlkem::{
        X25519_MLKEM1024_PRIVATE_KEY_TYPE_URL, MLKEM1024_DK_BYTES,
    };
    use ml_kem::{EncodedSizeUser, KemCore, MlKem1024};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    let mut rng = ChaCha20Rng::from_seed([0x33; 32]);
    let (dk, _) = MlKem1024::generate(&mut rng);
    let mut value = vec![0x21u8; 32];
    value.extend_from_slice(&dk.as_bytes());
    assert_eq!(value.len(), 32 + MLKEM1024_DK_BYTES);

    let pq = Key {
        key_id: 0xabcd,
        status: KeyStatus::Enabled,
        output_prefix_type: OutputPrefixType::Tink,
        key_data: KeyData {
            type_url: X25519_MLKEM1024_PRIVATE_KEY_TYPE_URL.to_string(),
            value,
            material_type: KeyMaterialType::SymmetricOrPrivate,
        },
    };

    let classical = handle(1, vec![x25519_key(1, OutputPrefixType::Tink)]);
    let classical_ct = encrypt_with(&classical, b"classical", b"");

    let mixed = handle(0xabcd, vec![x25519_key(1, OutputPrefixType::Tink), pq]);
    let pq_ct = encrypt_with(&mixed, b"post-quantum", b"");
    assert_eq!(&pq_ct[..5], &[0x01, 0x00, 0x00, 0xab, 0xcd]);

    let hd = new_hybrid_decrypt(&mixed).unwrap();
    assert_eq!(hd.decrypt(&classical_ct, b"").unwrap(), b"classical");
    assert_eq!(hd.decrypt(&pq_ct, b"").unwrap(), b"post-quantum");

    assert!(matches!(
        new_streaming_hybrid_decrypt(&mixed),
        Err(HybridError::CapabilityMismatch { key_id: 0xabcd, .. })
    ));
}
