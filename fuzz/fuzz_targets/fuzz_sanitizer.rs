#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Anything that sanitizes must be valid and stable
    if let Ok(sanitized) = qheal::sanitize(data) {
        assert!(qheal::parse_strict(&sanitized).is_ok(), "{data:?} -> {sanitized:?}");
        assert_eq!(qheal::sanitize(&sanitized).ok().as_deref(), Some(sanitized.as_str()));
    }
});
