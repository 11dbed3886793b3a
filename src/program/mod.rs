//! Uploaded job programs.
//!
//! Two formats are accepted: the motion dialect handled by
//! [`CommandInterpreter`] and Excellon drill files handled by [`drill`].
//! Both arrive through the shared [`buffer::ProgramBuffer`].
//!
//! ## Motion dialect
//!
//! ```text
//! G0 X12.5 Y40      ; move (Z raised to safe height first)
//! G0 X20 Y40 Z1     ; move, then lower to soldering height and dwell
//! S75               ; feed 75 steps of solder
//! S                 ; feed the default amount
//! G1 / G4 / G28 / M*  accepted and ignored
//! ```
//!
//! Lines that fail to parse or validate are skipped; the caller only ever
//! sees valid commands.

pub mod buffer;
pub mod drill;

use log::{debug, warn};

/// One executable command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandKind {
    /// Position move.  `z_marker` asks for a solder dip at the target.
    Move {
        x: Option<f32>,
        y: Option<f32>,
        z_marker: bool,
    },
    /// Advance the feed axis by `amount` steps.
    FeedSolder { amount: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Command {
    pub kind: CommandKind,
    /// 1-based source line.
    pub line: u32,
}

/// One `letter value` word of a line.  `value` may be empty.
fn words(line: &str) -> impl Iterator<Item = (char, &str)> {
    let bytes = line.as_bytes();
    let mut i = 0;
    core::iter::from_fn(move || {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            return None;
        }
        if !bytes[i].is_ascii() {
            i += 1;
            while i < bytes.len() && !line.is_char_boundary(i) {
                i += 1;
            }
            return Some(('?', ""));
        }
        let letter = char::from(bytes[i]).to_ascii_uppercase();
        i += 1;
        let start = i;
        while i < bytes.len() && matches!(bytes[i], b'0'..=b'9' | b'.' | b'+' | b'-') {
            i += 1;
        }
        Some((letter, &line[start..i]))
    })
}

/// Drop `;` tails and `( ... )` groups.
fn strip_comments(line: &str) -> String {
    let line = line.split(';').next().unwrap_or("");
    let mut out = String::with_capacity(line.len());
    let mut depth = 0u32;
    for c in line.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

fn parse_coord(value: &str) -> Option<f32> {
    value.parse::<f32>().ok().filter(|v| v.is_finite())
}

/// Parse and validate one line.  `None` means "nothing to execute".
pub fn parse_line(line: &str, default_feed: u32) -> Option<CommandKind> {
    let text = strip_comments(line);
    let mut words = words(&text);
    let (letter, value) = words.next()?;

    let kind = match letter {
        'G' => match value.parse::<u32>().ok()? {
            0 => parse_move(words)?,
            _ => return None,
        },
        'M' => return None,
        'S' => {
            let amount = if value.is_empty() {
                default_feed
            } else {
                value.parse::<u32>().ok()?
            };
            CommandKind::FeedSolder { amount }
        }
        _ => return None,
    };

    validate(kind).then_some(kind)
}

fn parse_move<'a>(words: impl Iterator<Item = (char, &'a str)>) -> Option<CommandKind> {
    let mut x = None;
    let mut y = None;
    let mut z_marker = false;
    for (letter, value) in words {
        match letter {
            'X' => x = Some(parse_coord(value)?),
            'Y' => y = Some(parse_coord(value)?),
            'Z' => z_marker = true,
            'F' => {}
            other => warn!("GCODE: unknown parameter '{}' ignored", other),
        }
    }
    Some(CommandKind::Move { x, y, z_marker })
}

fn validate(kind: CommandKind) -> bool {
    match kind {
        CommandKind::Move { x, y, .. } => x.is_some() || y.is_some(),
        CommandKind::FeedSolder { amount } => amount > 0 && i32::try_from(amount).is_ok(),
    }
}

// ---------------------------------------------------------------------------
// CommandInterpreter
// ---------------------------------------------------------------------------

/// Lazy, restartable command stream over an owned copy of a program.
#[derive(Debug, Clone, Default)]
pub struct CommandInterpreter {
    program: Vec<u8>,
    offset: usize,
    line: u32,
    default_feed: u32,
}

impl CommandInterpreter {
    pub fn new(default_feed: u32) -> Self {
        Self {
            default_feed,
            ..Self::default()
        }
    }

    /// Replace the program and rewind.
    pub fn load(&mut self, program: &[u8]) {
        self.program.clear();
        self.program.extend_from_slice(program);
        self.reset();
    }

    pub fn reset(&mut self) {
        self.offset = 0;
        self.line = 0;
    }

    /// Line number of the most recently consumed line.
    pub fn line_number(&self) -> u32 {
        self.line
    }

    /// Byte offset of the next unread line.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.program.is_empty()
    }

    /// Next valid command, or `None` once the program is exhausted.
    pub fn next_command(&mut self) -> Option<Command> {
        scan(&self.program, &mut self.offset, &mut self.line, self.default_feed)
    }

    /// Number of valid commands in the whole program.  Does not move the cursor.
    pub fn command_count(&self) -> usize {
        let (mut offset, mut line) = (0, 0);
        let mut n = 0;
        while scan(&self.program, &mut offset, &mut line, self.default_feed).is_some() {
            n += 1;
        }
        n
    }
}

impl Iterator for CommandInterpreter {
    type Item = Command;

    fn next(&mut self) -> Option<Command> {
        self.next_command()
    }
}

fn scan(program: &[u8], offset: &mut usize, line: &mut u32, default_feed: u32) -> Option<Command> {
    while *offset < program.len() {
        let rest = &program[*offset..];
        let end = rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len());
        let raw = &rest[..end];
        *offset += (end + 1).min(rest.len());
        *line += 1;

        let Ok(text) = core::str::from_utf8(raw) else {
            debug!("GCODE: line {} is not UTF-8, skipped", line);
            continue;
        };
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        match parse_line(text, default_feed) {
            Some(kind) => return Some(Command { kind, line: *line }),
            None => debug!("GCODE: line {} skipped: {}", line, text),
        }
    }
    None
}
