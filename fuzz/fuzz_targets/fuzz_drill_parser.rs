//! Fuzz target: Excellon drill import
//!
//! Feeds arbitrary text to the drill parser and converts the result to
//! solder points.  Neither step may panic, and every hole maps to exactly
//! one point.
//!
//! cargo fuzz run fuzz_drill_parser

#![no_main]

use libfuzzer_sys::fuzz_target;
use solderbot::program::drill;

fuzz_target!(|data: &[u8]| {
    let _ = drill::is_drill_file(data);
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };

    let file = drill::parse(text);
    let points = file.to_solder_points(400, 400, 1_500);
    assert_eq!(points.len(), file.holes.len());
    for hole in &file.holes {
        assert_ne!(hole.tool, 0, "hole recorded without a tool");
    }
});
