//! Fuzz target: `CommandInterpreter`
//!
//! Loads arbitrary bytes as a program and drains it.  The interpreter must
//! never panic, must agree with its own `command_count`, and must only
//! yield commands that passed validation.
//!
//! cargo fuzz run fuzz_command_interpreter

#![no_main]

use libfuzzer_sys::fuzz_target;
use solderbot::program::{CommandInterpreter, CommandKind};

fuzz_target!(|data: &[u8]| {
    let mut interp = CommandInterpreter::new(50);
    interp.load(data);
    let expected = interp.command_count();

    let mut seen = 0;
    while let Some(cmd) = interp.next_command() {
        match cmd.kind {
            CommandKind::Move { x, y, .. } => {
                assert!(x.is_some() || y.is_some(), "move without coordinates");
                assert!(x.is_none_or(f32::is_finite));
                assert!(y.is_none_or(f32::is_finite));
            }
            CommandKind::FeedSolder { amount } => assert!(amount > 0, "zero feed"),
        }
        seen += 1;
    }
    assert_eq!(seen, expected);
    assert!(interp.offset() <= data.len());

    // Rewinding replays the same stream.
    interp.reset();
    assert_eq!(interp.count(), expected);
});
