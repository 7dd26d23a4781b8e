#![no_main]

use libfuzzer_sys::fuzz_target;

use kexec::parser;

fuzz_target!(|data: &[u8]| {
    // Any result is fine, only panics are failures
    let _ = parser::parse(data);
});
