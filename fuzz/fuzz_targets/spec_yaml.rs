#![no_main]

use autoe2e_core::config::SpecConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // YAML 파서는 &str을 받으므로 UTF-8 변환 필요
    if let Ok(yaml) = std::str::from_utf8(data) {
        if let Ok(config) = SpecConfig::parse_yaml(yaml) {
            let _ = config.validate();
        }
    }
});
