//! Fuzz target for learn.json configuration parsing and validation.
//!
//! Tests that parsing and validating arbitrary JSON never panics, only
//! returns an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mctbn_config::{validate_learn_config, LearnConfig};

fuzz_target!(|data: &[u8]| {
    if let Ok(config) = serde_json::from_slice::<LearnConfig>(data) {
        let _ = validate_learn_config(&config);
        let _ = config.to_json_pretty();
    }
});
