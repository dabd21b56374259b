#![no_main]

use libfuzzer_sys::fuzz_target;
use pyfront::{parse_module, ErrorPolicy, ParseOptions};

fuzz_target!(|data: &[u8]| {
    if data.len() > 64 * 1024 {
        return;
    }
    let src = String::from_utf8_lossy(data);
    // Recording mode must survive arbitrary input without panicking and
    // hand back a tree for everything short of an indentation overflow.
    let recording = ParseOptions {
        policy: ErrorPolicy::Record,
        ..ParseOptions::default()
    };
    if let Ok(parsed) = parse_module("fuzz.py", &src, recording) {
        let _ = parsed.arena.dump(parsed.root);
    }
    let _ = parse_module("fuzz.py", &src, ParseOptions::default());
});
