//! Fuzz target for whole label files.
//!
//! Anything that decodes must survive an encode/decode pass with the same
//! number of boxes.

#![no_main]

use boxlabel::ir::codec::{decode, encode};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let boxes = decode(text);
    let again = decode(&encode(&boxes));
    assert_eq!(boxes.len(), again.len());
});
