#![no_main]

use blockprof::filter::CategoryPattern;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // First line is the pattern, the rest is the category
    if let Ok(input) = std::str::from_utf8(data) {
        let (pattern, category) = input.split_once('\n').unwrap_or((input, input));

        // Compiling and matching must never panic
        let compiled = CategoryPattern::new(pattern);
        let matched = compiled.matches(category);

        // Patterns without wildcards compare exactly
        if !pattern.contains(['*', '?']) {
            assert_eq!(matched, pattern == category);
        }
    }
});
