#![no_main]

use libfuzzer_sys::fuzz_target;
use reclaim_core::formats::tarball::{salvage_tar, walk_tar};
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let _ = walk_tar(data, false);
    let mut out = Vec::new();
    if let Ok(stats) = salvage_tar(data, false, &mut out) {
        let kept = walk_tar(Cursor::new(out), false).expect("salvaged tar is valid");
        assert_eq!(kept, stats.kept);
    }
});
