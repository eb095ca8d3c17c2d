#![no_main]
use libfuzzer_sys::fuzz_target;

use hybrid_keyset::keyset::{Keyset, KeysetHandle};
use hybrid_keyset::new_hybrid_decrypt;

fuzz_target!(|data: &[u8]| {
    let Ok(keyset) = serde_json::from_slice::<Keyset>(data) else {
        return;
    };
    // Validation, resolution and capability checks must never panic
    if let Ok(handle) = KeysetHandle::new(keyset) {
        let _ = new_hybrid_decrypt(&handle);
        let _ = handle.public();
    }
});
