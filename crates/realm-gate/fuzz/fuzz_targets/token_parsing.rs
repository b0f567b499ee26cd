#![no_main]

use libfuzzer_sys::fuzz_target;
use realm_gate::auth::{parse_token, SigningAlgorithm};

fuzz_target!(|data: &[u8]| {
    if let Ok(token_str) = std::str::from_utf8(data) {
        // Untrusted header parsing must never panic
        if let Ok(parsed) = parse_token(token_str) {
            let _ = SigningAlgorithm::from_header(parsed.header().alg.as_deref());
            let _ = parsed.kid();

            // Signing input is always a prefix of the raw token
            assert!(token_str.starts_with(parsed.signing_input()));

            if let Some(signature) = parsed.signature_segment() {
                assert_eq!(parsed.segment_count(), 3);
                assert!(token_str.ends_with(signature));
            }
        }

        let _ = common::jwt::decode_segment(token_str);
    }
});
