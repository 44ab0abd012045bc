//! Fuzz target for single-row label parsing.

#![no_main]

use boxlabel::ir::codec::fuzz_parse_row;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 64 * 1024 {
        return;
    }

    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };

    let _ = fuzz_parse_row(line);
});
