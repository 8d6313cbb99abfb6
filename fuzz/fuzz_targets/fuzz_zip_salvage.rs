#![no_main]

use libfuzzer_sys::fuzz_target;
use reclaim_core::formats::archive::{salvage_zip, walk_zip};
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let mut out = Cursor::new(Vec::new());
    if let Ok(stats) = salvage_zip(Cursor::new(data), &mut out) {
        // Whatever was kept must read back cleanly.
        let kept = walk_zip(Cursor::new(out.into_inner())).expect("salvaged archive is valid");
        assert_eq!(kept, stats.kept);
    }
});
