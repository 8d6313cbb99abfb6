#![no_main]

use libfuzzer_sys::fuzz_target;
use reclaim_core::formats::video::probe_mp4;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let _ = probe_mp4(Cursor::new(data));
});
