#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // A query the strict grammar accepts must survive sanitizing as valid
    if qheal::parse_strict(data).is_ok() {
        if let Ok(sanitized) = qheal::sanitize(data) {
            assert!(qheal::parse_strict(&sanitized).is_ok());
        }
    }
});
