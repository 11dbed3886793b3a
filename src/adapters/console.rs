//! Line-oriented operator console.
//!
//! Turns text lines from the serial console into [`AppCommand`]s:
//!
//! ```text
//! upload            start collecting a program
//! G0 X10 Y5 Z       ...program lines...
//! end               finish; emits UploadTask
//! manual | exit | jog <x|y|z|s> <steps>
//! calibrate | approve | cancel | pause | continue | finish | stop
//! ```
//!
//! Unknown lines are logged and ignored. An upload that grows past the size
//! limit stops collecting and is dropped at `end`.

use log::warn;

use crate::app::commands::AppCommand;
use crate::config::SystemConfig;
use crate::motion::AxisId;

#[derive(Debug)]
pub struct ConsoleParser {
    upload: Option<Vec<u8>>,
    overflowed: bool,
    max_bytes: usize,
}

impl Default for ConsoleParser {
    fn default() -> Self {
        Self::with_limit(SystemConfig::default().program.max_program_bytes)
    }
}

impl ConsoleParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parser whose uploads are capped at `max_bytes`.
    pub fn with_limit(max_bytes: usize) -> Self {
        Self {
            upload: None,
            overflowed: false,
            max_bytes,
        }
    }

    /// True while program lines are being collected.
    pub fn is_collecting(&self) -> bool {
        self.upload.is_some()
    }

    /// Feed one line; returns a command once one is complete.
    pub fn feed(&mut self, line: &str) -> Option<AppCommand> {
        let trimmed = line.trim();

        if let Some(buf) = self.upload.as_mut() {
            if trimmed.eq_ignore_ascii_case("end") {
                let upload = self.upload.take();
                if std::mem::take(&mut self.overflowed) {
                    warn!("CONSOLE: upload over {} bytes discarded", self.max_bytes);
                    return None;
                }
                return upload.map(AppCommand::UploadTask);
            }
            if self.overflowed {
                return None;
            }
            if buf.len() + trimmed.len() + 1 > self.max_bytes {
                warn!("CONSOLE: upload exceeds {} bytes, ignoring until 'end'", self.max_bytes);
                self.overflowed = true;
                buf.clear();
                buf.shrink_to_fit();
                return None;
            }
            buf.extend_from_slice(trimmed.as_bytes());
            buf.push(b'\n');
            return None;
        }

        let mut words = trimmed.split_ascii_whitespace();
        let verb = words.next()?.to_ascii_lowercase();
        let cmd = match verb.as_str() {
            "upload" => {
                self.upload = Some(Vec::new());
                self.overflowed = false;
                return None;
            }
            "manual" => AppCommand::SelectManual,
            "exit" => AppCommand::ExitManual,
            "jog" => parse_jog(words.next(), words.next())?,
            "calibrate" => AppCommand::RequestCalibration,
            "approve" => AppCommand::Approve,
            "cancel" => AppCommand::Cancel,
            "pause" => AppCommand::Pause,
            "continue" => AppCommand::Continue,
            "finish" => AppCommand::Finish,
            "stop" => AppCommand::Stop,
            _ => {
                warn!("CONSOLE: unknown command '{}'", trimmed);
                return None;
            }
        };
        Some(cmd)
    }
}

fn parse_jog(axis: Option<&str>, delta: Option<&str>) -> Option<AppCommand> {
    let axis = match axis?.to_ascii_lowercase().as_str() {
        "x" => AxisId::X,
        "y" => AxisId::Y,
        "z" => AxisId::Z,
        "s" => AxisId::S,
        other => {
            warn!("CONSOLE: unknown axis '{}'", other);
            return None;
        }
    };
    let Some(delta) = delta.and_then(|d| d.parse().ok()) else {
        warn!("CONSOLE: jog needs a step count");
        return None;
    };
    Some(AppCommand::Jog { axis, delta })
}
