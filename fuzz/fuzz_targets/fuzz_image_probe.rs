#![no_main]

use libfuzzer_sys::fuzz_target;
use reclaim_core::formats::image::probe_bounds;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    if let Ok((width, height)) = probe_bounds(Cursor::new(data)) {
        assert!(width > 0 && height > 0);
    }
});
