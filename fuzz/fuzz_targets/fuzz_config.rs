//! Fuzz target: `SystemConfig::from_json`
//!
//! Arbitrary documents must either be rejected or yield a config that
//! passes its own validation.
//!
//! cargo fuzz run fuzz_config

#![no_main]

use irthermo::config::SystemConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(config) = SystemConfig::from_json(data) {
        assert!(config.validate().is_ok());
        assert!(config.ignore.duration_ms() > 0);
    }
});
