#![no_main]

use libfuzzer_sys::fuzz_target;
use stratafs::path;

fuzz_target!(|input: &str| {
    for allow_above_root in [false, true] {
        if let Some(normalized) = path::normalize(input, allow_above_root) {
            // Normalising twice must be stable.
            assert_eq!(path::normalize(&normalized, allow_above_root), Some(normalized.clone()));
        }
    }

    let _ = path::trim_base(input, "base/dir");
    let _ = path::segments(input).count();
    let _ = path::directory(input);
});
