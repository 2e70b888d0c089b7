#![no_main]

use autoe2e_report::{MAX_REASON_CHARS, parse_junit};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(xml) = std::str::from_utf8(data) {
        if let Ok(summary) = parse_junit(xml) {
            assert!(summary.passed <= summary.total);
            for failure in &summary.failures {
                assert!(failure.reason.chars().count() <= MAX_REASON_CHARS);
            }
        }
    }
});
