#![no_main]

use libfuzzer_sys::fuzz_target;
use realm_gate::auth::key::{decode_exponent, materialize};
use realm_gate::auth::KeySet;

fuzz_target!(|data: &[u8]| {
    // Provider responses are untrusted too
    if let Ok(key_set) = serde_json::from_slice::<KeySet>(data) {
        for jwk in &key_set.keys {
            if let Ok(resolved) = key_set.resolve(&jwk.kid) {
                if let Ok(key) = materialize(resolved) {
                    assert!(key.exponent() >= 3 && key.exponent() % 2 == 1);
                    assert_ne!(key.modulus().first(), Some(&0));
                }
            }
        }
    }

    if data.len() <= 8 {
        assert!(decode_exponent(data).is_ok() || data.is_empty());
    } else {
        // More than 8 bytes only fits if the leading bytes are zero
        let leading_zeros = data.iter().take_while(|byte| **byte == 0).count();
        assert_eq!(
            decode_exponent(data).is_ok(),
            data.len() - leading_zeros <= 8
        );
    }
});
