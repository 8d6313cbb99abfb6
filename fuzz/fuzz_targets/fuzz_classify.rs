#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (&str, Option<&str>)| {
    let (name, mime) = input;
    let _ = reclaim_core::classify(name, mime);
    let _ = reclaim_core::base_name(name);
});
