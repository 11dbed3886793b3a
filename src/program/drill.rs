//! Excellon drill-file import.
//!
//! PCB CAM tools emit the plated through-holes of a board as an Excellon
//! file, which is exactly the list of joints to solder:
//!
//! ```text
//! M48              ; header start
//! METRIC,TZ        ; or INCH
//! T01C0.800        ; tool 1, 0.8 mm
//! %                ; header end
//! T01              ; select tool 1
//! X23.25Y-11.0     ; hit
//! M30              ; end
//! ```
//!
//! Coordinates are modal: a hit may omit X or Y and reuse the previous one.
//! Hits before any tool selection are ignored.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::motion::sequencer::SolderPoint;

const MM_PER_INCH: f32 = 25.4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hole {
    pub tool: u32,
    pub x_mm: f32,
    pub y_mm: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrillFile {
    pub metric: bool,
    /// `(tool number, diameter mm)`.
    pub tools: Vec<(u32, f32)>,
    pub holes: Vec<Hole>,
}

/// True if `bytes` look like an Excellon file (first token `M48`).
pub fn is_drill_file(bytes: &[u8]) -> bool {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    bytes[start..].starts_with(b"M48")
}

fn parse_tool(rest: &str) -> Option<(u32, Option<f32>)> {
    let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    let number = rest[..digits].parse().ok()?;
    let tail = &rest[digits..];
    if tail.is_empty() {
        return Some((number, None));
    }
    let size = tail.strip_prefix('C')?;
    let end = size
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(size.len());
    Some((number, Some(size[..end].parse().ok()?)))
}

fn parse_hit(line: &str, last: (f32, f32)) -> Option<(f32, f32)> {
    let (mut x, mut y) = last;
    let mut seen = false;
    let mut rest = line;
    while let Some(letter) = rest.chars().next() {
        let body = &rest[letter.len_utf8()..];
        let end = body
            .find(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | '-' | '+')))
            .unwrap_or(body.len());
        let value: f32 = body[..end].parse().ok()?;
        match letter {
            'X' => x = value,
            'Y' => y = value,
            _ => return None,
        }
        seen = true;
        rest = &body[end..];
    }
    seen.then_some((x, y))
}

/// Parse an Excellon file.  Unknown lines are skipped.
pub fn parse(text: &str) -> DrillFile {
    let mut file = DrillFile {
        metric: true,
        ..DrillFile::default()
    };
    let mut tool = None;
    let mut last = (0.0, 0.0);

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }
        let upper = line.to_ascii_uppercase();
        if upper.starts_with("METRIC") {
            file.metric = true;
            continue;
        }
        if upper.starts_with("INCH") {
            file.metric = false;
            continue;
        }
        if upper == "M30" {
            break;
        }
        if let Some(rest) = upper.strip_prefix('T') {
            match parse_tool(rest) {
                Some((n, Some(dia))) => file.tools.push((n, dia)),
                Some((n, None)) => tool = (n != 0).then_some(n),
                None => debug!("DRILL: bad tool line '{}'", line),
            }
            continue;
        }
        if upper.starts_with('X') || upper.starts_with('Y') {
            let Some(t) = tool else {
                debug!("DRILL: hit before tool selection ignored");
                continue;
            };
            match parse_hit(&upper, last) {
                Some(pos) => {
                    last = pos;
                    file.holes.push(Hole {
                        tool: t,
                        x_mm: pos.0,
                        y_mm: pos.1,
                    });
                }
                None => warn!("DRILL: unparseable hit '{}'", line),
            }
        }
    }

    if !file.metric {
        for (_, dia) in &mut file.tools {
            *dia *= MM_PER_INCH;
        }
        for h in &mut file.holes {
            h.x_mm *= MM_PER_INCH;
            h.y_mm *= MM_PER_INCH;
        }
    }
    file
}

impl DrillFile {
    pub fn tool_diameter(&self, tool: u32) -> Option<f32> {
        self.tools.iter().find(|(n, _)| *n == tool).map(|(_, d)| *d)
    }

    /// Offset that moves every hole into the machine's positive quadrant.
    ///
    /// CAM tools often place the board below the Y axis (KiCad exports
    /// negative Y).  Only an axis with a negative minimum is shifted, so
    /// that its lowest hole lands on 0.
    pub fn origin_shift(&self) -> (f32, f32) {
        let min = |f: fn(&Hole) -> f32| self.holes.iter().map(f).fold(0.0f32, f32::min);
        (-min(|h| h.x_mm), -min(|h| h.y_mm))
    }

    /// One solder point per hole, truncating mm to steps after
    /// [`origin_shift`](Self::origin_shift).
    pub fn to_solder_points(
        &self,
        x_steps_per_mm: u32,
        y_steps_per_mm: u32,
        solder_time_ms: u32,
    ) -> Vec<SolderPoint> {
        let (dx, dy) = self.origin_shift();
        if dx > 0.0 || dy > 0.0 {
            info!("DRILL: negative coordinates, board shifted by ({:.2}, {:.2}) mm", dx, dy);
        }
        self.holes
            .iter()
            .map(|h| SolderPoint {
                x: ((h.x_mm + dx) * x_steps_per_mm as f32) as i32,
                y: ((h.y_mm + dy) * y_steps_per_mm as f32) as i32,
                z: 0,
                solder: true,
                solder_time_ms,
            })
            .collect()
    }
}
