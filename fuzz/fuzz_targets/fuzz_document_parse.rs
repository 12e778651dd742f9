#![no_main]

use libfuzzer_sys::fuzz_target;
use repo_ledger::remote::{encode_document, parse_document, Fetched};

fuzz_target!(|data: &[u8]| {
    let Ok(body) = std::str::from_utf8(data) else {
        return;
    };
    // Any body classifies without panicking; parsed records re-encode.
    if let Fetched::Found(records) = parse_document(body) {
        let _ = encode_document(&records);
    }
});
