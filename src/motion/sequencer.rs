//! Execution sub-state-machine: the physical solder cycle.
//!
//! ```text
//!  Idle ──▶ MoveToPoint ──▶ MoveDown ──▶ Soldering ──▶ MoveUp ──┐
//!   │            ▲                                               │
//!   │            └────────────────[points remain]────────────────┤
//!   └──[none left]──▶ ReturnHome ──▶ Complete ◀──[none left]─────┘
//! ```
//!
//! Point-list mode walks a fixed list of [`SolderPoint`]s.  Program mode
//! pulls one [`Command`] at a time from a [`CommandInterpreter`]:
//!
//! - `Move` raises Z to the safe height, then moves XY.  With a Z marker
//!   it then lowers to the soldering height and dwells.
//! - `FeedSolder` feeds `amount` steps, dwells, then raises Z.
//! - An exhausted interpreter goes straight to `Complete`.
//!
//! Every tick advances each moving axis by at most the configured step
//! budget, so one tick stays short.  Dwells are timestamps, not sleeps.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::app::ports::AxisDriver;
use crate::config::ExecutionConfig;
use crate::error::AxisError;
use crate::program::{Command, CommandInterpreter, CommandKind};

use super::AxisSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequencerState {
    Idle,
    MoveToPoint,
    MoveDown,
    Soldering,
    MoveUp,
    ReturnHome,
    Complete,
}

impl SequencerState {
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::MoveToPoint => "MOVE_TO_POINT",
            Self::MoveDown => "MOVE_DOWN",
            Self::Soldering => "SOLDERING",
            Self::MoveUp => "MOVE_UP",
            Self::ReturnHome => "RETURN_HOME",
            Self::Complete => "COMPLETE",
        }
    }
}

impl core::fmt::Display for SequencerState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// One joint in point-list mode.  Coordinates are steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolderPoint {
    pub x: i32,
    pub y: i32,
    /// Soldering height; `0` uses the configured height.
    pub z: i32,
    /// `false` visits the point without dipping or feeding.
    pub solder: bool,
    pub solder_time_ms: u32,
}

/// Where an interrupted run picks up again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumePoint {
    /// Points (or commands) already fully handled.
    pub offset: usize,
    pub completed: u32,
}

enum Source {
    Points { points: Vec<SolderPoint>, index: usize },
    Program {
        interp: CommandInterpreter,
        current: Option<Command>,
        total: usize,
    },
}

pub struct ExecutionSequencer {
    state: SequencerState,
    source: Source,
    geometry: ExecutionConfig,
    /// Targets for the current state have been issued.
    in_progress: bool,
    /// Program-mode moves: Z is safe, XY targets issued.
    xy_issued: bool,
    dwell_until: Option<u64>,
    solder_start_ms: u64,
    axes_ready: bool,
    /// Current point's work is finished (resume skips it).
    point_done: bool,
    executed: usize,
    completed: u32,
}

impl ExecutionSequencer {
    pub fn with_points(points: Vec<SolderPoint>, geometry: ExecutionConfig) -> Self {
        info!("EXEC: point-list mode, {} points", points.len());
        Self::new(Source::Points { points, index: 0 }, geometry)
    }

    pub fn with_program(interp: CommandInterpreter, geometry: ExecutionConfig) -> Self {
        let total = interp.command_count();
        info!("EXEC: program mode, {} commands", total);
        Self::new(
            Source::Program {
                interp,
                current: None,
                total,
            },
            geometry,
        )
    }

    fn new(source: Source, geometry: ExecutionConfig) -> Self {
        Self {
            state: SequencerState::Idle,
            source,
            geometry,
            in_progress: false,
            xy_issued: false,
            dwell_until: None,
            solder_start_ms: 0,
            axes_ready: false,
            point_done: false,
            executed: 0,
            completed: 0,
        }
    }

    /// Skip work already done by an earlier, interrupted run.
    pub fn resume_from(mut self, resume: ResumePoint) -> Self {
        match &mut self.source {
            Source::Points { points, index } => *index = resume.offset.min(points.len()),
            Source::Program { interp, .. } => {
                for _ in 0..resume.offset {
                    if interp.next_command().is_none() {
                        break;
                    }
                }
            }
        }
        self.executed = resume.offset;
        self.completed = resume.completed;
        info!("EXEC: resuming after {} items", resume.offset);
        self
    }

    pub fn resume_point(&self) -> ResumePoint {
        let offset = match &self.source {
            Source::Points { index, .. } => index + usize::from(self.point_done),
            Source::Program { .. } => self.executed,
        };
        ResumePoint {
            offset,
            completed: self.completed,
        }
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == SequencerState::Complete
    }

    pub fn is_program_mode(&self) -> bool {
        matches!(self.source, Source::Program { .. })
    }

    /// Points soldered, or commands executed in program mode.
    pub fn completed(&self) -> u32 {
        self.completed
    }

    pub fn progress_percent(&self) -> u8 {
        if self.is_complete() {
            return 100;
        }
        let (done, total) = match &self.source {
            Source::Points { points, index } => (*index, points.len()),
            Source::Program { total, .. } => (self.executed, *total),
        };
        if total == 0 {
            return 0;
        }
        (done.min(total) * 100 / total) as u8
    }

    /// Run one step of the cycle.
    pub fn tick<D: AxisDriver>(
        &mut self,
        axes: &mut AxisSet<D>,
        now_ms: u64,
    ) -> Result<SequencerState, AxisError> {
        if !self.axes_ready {
            axes.set_positioning_enabled(true)?;
            self.axes_ready = true;
        }
        if self.is_program_mode() {
            self.tick_program(axes, now_ms)?;
        } else {
            self.tick_points(axes, now_ms)?;
        }
        Ok(self.state)
    }

    // -----------------------------------------------------------------------
    // Point-list mode
    // -----------------------------------------------------------------------

    fn current_point(&self) -> Option<SolderPoint> {
        match &self.source {
            Source::Points { points, index } => points.get(*index).copied(),
            Source::Program { .. } => None,
        }
    }

    fn point_counts(&self) -> (usize, usize) {
        match &self.source {
            Source::Points { points, index } => (*index, points.len()),
            Source::Program { .. } => (0, 0),
        }
    }

    fn tick_points<D: AxisDriver>(
        &mut self,
        axes: &mut AxisSet<D>,
        now_ms: u64,
    ) -> Result<(), AxisError> {
        let budget = self.geometry.step_budget;
        let safe_z = self.geometry.safe_z;

        match self.state {
            SequencerState::Idle => {
                if self.current_point().is_some() {
                    self.go(SequencerState::MoveToPoint);
                } else {
                    self.go(SequencerState::ReturnHome);
                }
            }
            SequencerState::MoveToPoint => {
                let Some(p) = self.current_point() else {
                    self.go(SequencerState::ReturnHome);
                    return Ok(());
                };
                if !self.in_progress {
                    let (index, total) = self.point_counts();
                    info!(
                        "EXEC: point {}/{}: X={} Y={} Z={}",
                        index + 1,
                        total,
                        p.x,
                        p.y,
                        safe_z
                    );
                    axes.x.set_target(p.x);
                    axes.y.set_target(p.y);
                    axes.z.set_target(safe_z);
                    self.in_progress = true;
                }
                if self.advance_xyz(axes, budget)? && self.dwell(now_ms, self.geometry.settle_ms) {
                    if p.solder {
                        self.go(SequencerState::MoveDown);
                    } else {
                        debug!("EXEC: point without solder, skipping dip");
                        self.point_done = true;
                        self.go(SequencerState::MoveUp);
                    }
                }
            }
            SequencerState::MoveDown => {
                if !self.in_progress {
                    let z = self
                        .current_point()
                        .map(|p| p.z)
                        .filter(|&z| z > 0)
                        .unwrap_or(self.geometry.solder_z);
                    axes.z.set_target(z);
                    self.in_progress = true;
                }
                axes.z.advance_toward(budget)?;
                if axes.z.at_target() {
                    self.go(SequencerState::Soldering);
                }
            }
            SequencerState::Soldering => {
                let duration = self.current_point().map_or(0, |p| p.solder_time_ms);
                if !self.in_progress {
                    let feed = duration / self.geometry.feed_divisor.max(1);
                    axes.s.set_enabled(true)?;
                    axes.s.set_target(axes.s.position().saturating_add(steps_i32(feed)));
                    self.solder_start_ms = now_ms;
                    self.in_progress = true;
                }
                let elapsed = now_ms.saturating_sub(self.solder_start_ms);
                if elapsed < u64::from(duration) {
                    axes.s.advance_toward(budget)?;
                } else {
                    axes.s.set_enabled(false)?;
                    self.completed += 1;
                    self.point_done = true;
                    info!(
                        "EXEC: soldered point {} in {:.1}s",
                        self.completed,
                        duration as f32 / 1000.0
                    );
                    self.go(SequencerState::MoveUp);
                }
            }
            SequencerState::MoveUp => {
                if !self.in_progress {
                    axes.z.set_target(safe_z);
                    self.in_progress = true;
                }
                axes.z.advance_toward(budget)?;
                if axes.z.at_target() {
                    if let Source::Points { index, .. } = &mut self.source {
                        *index += 1;
                    }
                    self.point_done = false;
                    if self.current_point().is_some() {
                        self.go(SequencerState::MoveToPoint);
                    } else {
                        self.go(SequencerState::ReturnHome);
                    }
                }
            }
            SequencerState::ReturnHome => {
                if !self.in_progress {
                    let g = &self.geometry;
                    info!("EXEC: returning home ({},{},{})", g.home_x, g.home_y, g.home_z);
                    axes.x.set_target(g.home_x);
                    axes.y.set_target(g.home_y);
                    axes.z.set_target(g.home_z);
                    self.in_progress = true;
                }
                if self.advance_xyz(axes, budget)? {
                    self.go(SequencerState::Complete);
                }
            }
            SequencerState::Complete => {}
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Program mode
    // -----------------------------------------------------------------------

    fn tick_program<D: AxisDriver>(
        &mut self,
        axes: &mut AxisSet<D>,
        now_ms: u64,
    ) -> Result<(), AxisError> {
        let budget = self.geometry.step_budget;
        let Source::Program { interp, current, .. } = &mut self.source else {
            return Ok(());
        };

        match self.state {
            SequencerState::Idle => match interp.next_command() {
                None => {
                    *current = None;
                    info!("EXEC: program finished, {} commands", self.executed);
                    self.go(SequencerState::Complete);
                }
                Some(cmd) => {
                    debug!("EXEC: line {}: {:?}", cmd.line, cmd.kind);
                    *current = Some(cmd);
                    match cmd.kind {
                        CommandKind::Move { .. } => self.go(SequencerState::MoveToPoint),
                        CommandKind::FeedSolder { .. } => {
                            self.go(SequencerState::Soldering);
                        }
                    }
                }
            },
            SequencerState::MoveToPoint => {
                let Some(CommandKind::Move { x, y, z_marker }) = current.map(|c| c.kind) else {
                    self.go(SequencerState::Idle);
                    return Ok(());
                };
                if !self.in_progress {
                    axes.z.set_target(self.geometry.safe_z);
                    self.in_progress = true;
                }
                if !self.xy_issued {
                    axes.z.advance_toward(budget)?;
                    if !axes.z.at_target() {
                        return Ok(());
                    }
                    if let Some(x) = x {
                        let steps = axes.x.mm_to_steps(x);
                        axes.x.set_target(steps);
                    }
                    if let Some(y) = y {
                        let steps = axes.y.mm_to_steps(y);
                        axes.y.set_target(steps);
                    }
                    self.xy_issued = true;
                }
                axes.x.advance_toward(budget)?;
                axes.y.advance_toward(budget)?;
                if axes.x.at_target() && axes.y.at_target() {
                    if z_marker {
                        self.go(SequencerState::MoveDown);
                    } else {
                        self.finish_command(SequencerState::Idle);
                    }
                }
            }
            SequencerState::MoveDown => {
                if !self.in_progress {
                    axes.z.set_target(self.geometry.solder_z);
                    self.in_progress = true;
                }
                axes.z.advance_toward(budget)?;
                if axes.z.at_target() && self.dwell(now_ms, self.geometry.dwell_ms) {
                    self.finish_command(SequencerState::Idle);
                }
            }
            SequencerState::Soldering => {
                let amount = match current.map(|c| c.kind) {
                    Some(CommandKind::FeedSolder { amount }) => amount,
                    _ => 0,
                };
                if !self.in_progress {
                    axes.s.set_enabled(true)?;
                    axes.s.set_target(axes.s.position().saturating_add(steps_i32(amount)));
                    self.in_progress = true;
                }
                axes.s.advance_toward(budget)?;
                if axes.s.at_target() && self.dwell(now_ms, self.geometry.dwell_ms) {
                    axes.s.set_enabled(false)?;
                    self.finish_command(SequencerState::MoveUp);
                }
            }
            SequencerState::MoveUp => {
                if !self.in_progress {
                    axes.z.set_target(self.geometry.safe_z);
                    self.in_progress = true;
                }
                axes.z.advance_toward(budget)?;
                if axes.z.at_target() {
                    self.go(SequencerState::Idle);
                }
            }
            SequencerState::ReturnHome => self.go(SequencerState::Complete),
            SequencerState::Complete => {}
        }
        Ok(())
    }

    fn finish_command(&mut self, next: SequencerState) {
        self.executed += 1;
        self.completed += 1;
        self.go(next);
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn advance_xyz<D: AxisDriver>(
        &mut self,
        axes: &mut AxisSet<D>,
        budget: u32,
    ) -> Result<bool, AxisError> {
        axes.x.advance_toward(budget)?;
        axes.y.advance_toward(budget)?;
        axes.z.advance_toward(budget)?;
        Ok(axes.x.at_target() && axes.y.at_target() && axes.z.at_target())
    }

    /// True once `ms` have passed since the first call in this state.
    fn dwell(&mut self, now_ms: u64, ms: u32) -> bool {
        let until = *self.dwell_until.get_or_insert(now_ms + u64::from(ms));
        now_ms >= until
    }

    fn go(&mut self, next: SequencerState) {
        if self.state != next {
            debug!("EXEC: {} -> {}", self.state, next);
            self.state = next;
            self.in_progress = false;
            self.xy_issued = false;
            self.dwell_until = None;
        }
    }
}

/// Feed steps as a signed axis delta, saturating instead of wrapping.
fn steps_i32(steps: u32) -> i32 {
    i32::try_from(steps).unwrap_or(i32::MAX)
}
