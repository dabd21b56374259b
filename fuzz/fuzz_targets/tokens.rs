#![no_main]

use libfuzzer_sys::fuzz_target;
use pyfront::{filter_tokens, lex};

fuzz_target!(|data: &[u8]| {
    if data.len() > 64 * 1024 {
        return;
    }
    let src = String::from_utf8_lossy(data);
    let (tokens, _diags) = lex(&src);
    let _ = filter_tokens(tokens, "fuzz.py");
});
