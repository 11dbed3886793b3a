//! Per-state hooks for the soldering station.
//!
//! ```text
//!  INIT ─▶ IDLE ─▶ CALIBRATION ─▶ READY ─▶ HEATING ─▶ EXECUTING ─▶ NORMAL_EXIT ─▶ IDLE
//!           │ ▲                      │                  │    ▲
//!           ▼ │                      ▼                  ▼    │
//!      MANUAL_CONTROL              IDLE               PAUSED ─┘ (via HEATING)
//!
//!  *_ERROR ─▶ LOCK  (terminal, everything off)
//! ```
//!
//! Hooks never change state themselves.  They act on the [`Machine`] and
//! post events; the controller applies the transition on a later tick.

use log::{error, info, warn};

use crate::app::ports::{AxisDriver, HeaterDriver, TemperatureSource};
use crate::error::{Error, ProgramError};
use crate::motion::CalibrationOutcome;
use crate::motion::sequencer::{ExecutionSequencer, SequencerState};
use crate::program::{CommandInterpreter, drill};

use super::context::Machine;
use super::{HookCtx, LifecycleController, LifecycleEvent as E, LifecycleState as S};

type Ctx<'a, D, H, T> = HookCtx<'a, Machine<D, H, T>>;

/// Install every hook on `fsm`.
pub fn register_hooks<D, H, T>(fsm: &mut LifecycleController<Machine<D, H, T>>)
where
    D: AxisDriver + 'static,
    H: HeaterDriver + 'static,
    T: TemperatureSource + 'static,
{
    fsm.on_execute(S::Init, init_execute::<D, H, T>);

    fsm.on_enter(S::Idle, idle_enter::<D, H, T>);

    fsm.on_enter(S::ManualControl, manual_enter::<D, H, T>);
    fsm.on_execute(S::ManualControl, manual_execute::<D, H, T>);
    fsm.on_exit(S::ManualControl, manual_exit::<D, H, T>);

    fsm.on_execute(S::Calibration, calibration_execute::<D, H, T>);

    fsm.on_execute(S::Ready, ready_execute::<D, H, T>);

    fsm.on_enter(S::Heating, heating_enter::<D, H, T>);
    fsm.on_execute(S::Heating, heating_execute::<D, H, T>);

    fsm.on_enter(S::Executing, executing_enter::<D, H, T>);
    fsm.on_execute(S::Executing, executing_execute::<D, H, T>);

    fsm.on_enter(S::Paused, paused_enter::<D, H, T>);
    fsm.on_execute(S::Paused, paused_execute::<D, H, T>);

    fsm.on_enter(S::NormalExit, normal_exit_enter::<D, H, T>);
    fsm.on_execute(S::NormalExit, normal_exit_execute::<D, H, T>);

    for state in [S::CalibrationError, S::HeatingError, S::DataError] {
        fsm.on_enter(state, error_enter::<D, H, T>);
        fsm.on_execute(state, error_execute::<D, H, T>);
    }
    fsm.on_enter(S::Lock, lock_enter::<D, H, T>);
}

// ═══════════════════════════════════════════════════════════════════════════
//  INIT / IDLE
// ═══════════════════════════════════════════════════════════════════════════

fn init_execute<D, H, T>(ctx: &mut Ctx<'_, D, H, T>) -> Result<(), Error> {
    ctx.post_once(E::InitDone);
    Ok(())
}

fn idle_enter<D, H, T>(ctx: &mut Ctx<'_, D, H, T>) -> Result<(), Error>
where
    D: AxisDriver,
    H: HeaterDriver,
    T: TemperatureSource,
{
    ctx.machine.job.clear();
    ctx.machine.all_off()?;
    info!("IDLE: heater and axes off, waiting for a task");
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
//  MANUAL_CONTROL
// ═══════════════════════════════════════════════════════════════════════════

fn manual_enter<D, H, T>(ctx: &mut Ctx<'_, D, H, T>) -> Result<(), Error>
where
    D: AxisDriver,
{
    let axes = &mut ctx.machine.axes;
    axes.hold_position();
    axes.set_positioning_enabled(true)?;
    axes.s.set_enabled(true)?;
    info!("MANUAL: jog enabled");
    Ok(())
}

fn manual_execute<D, H, T>(ctx: &mut Ctx<'_, D, H, T>) -> Result<(), Error>
where
    D: AxisDriver,
{
    let budget = ctx.machine.config.execution.step_budget;
    ctx.machine.axes.advance_all(budget)?;
    Ok(())
}

fn manual_exit<D, H, T>(ctx: &mut Ctx<'_, D, H, T>) -> Result<(), Error>
where
    D: AxisDriver,
{
    let axes = &mut ctx.machine.axes;
    axes.hold_position();
    axes.disable_all()?;
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
//  CALIBRATION / READY
// ═══════════════════════════════════════════════════════════════════════════

fn calibration_execute<D, H, T>(ctx: &mut Ctx<'_, D, H, T>) -> Result<(), Error>
where
    D: AxisDriver,
{
    if ctx.exec.completed {
        return Ok(());
    }
    info!("CALIBRATION: homing Z, X, Y");
    let axes = &mut ctx.machine.axes;
    let mut result = Ok(());
    for axis in [&mut axes.z, &mut axes.x, &mut axes.y] {
        match axis.calibrate() {
            Ok(CalibrationOutcome::Calibrated { .. }) => {}
            Ok(CalibrationOutcome::NoLimitSwitch) => {
                warn!("CALIBRATION: {} has no limit switch, position assumed", axis.name());
            }
            Err(e) => {
                error!("CALIBRATION: {} failed: {}", axis.name(), e);
                result = Err(e);
                break;
            }
        }
    }

    match result {
        Ok(()) => {
            info!("CALIBRATION: done");
            ctx.post_once(E::CalibrationSuccess);
            Ok(())
        }
        Err(e) => {
            ctx.post_once(E::CalibrationError);
            Err(e.into())
        }
    }
}

fn ready_execute<D, H, T>(ctx: &mut Ctx<'_, D, H, T>) -> Result<(), Error> {
    if ctx.machine.job.calibration_only {
        ctx.post_once(E::CalibrationDone);
    } else if ctx.exec.is_first_iteration() {
        info!("READY: waiting for task approval");
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
//  HEATING
// ═══════════════════════════════════════════════════════════════════════════

fn heating_enter<D, H, T>(ctx: &mut Ctx<'_, D, H, T>) -> Result<(), Error>
where
    D: AxisDriver,
    H: HeaterDriver,
    T: TemperatureSource,
{
    let target = ctx.machine.config.heating.target_temperature_c;
    let regulator = &mut ctx.machine.regulator;
    regulator.set_target(target);
    if let Err(e) = regulator.set_enabled(true) {
        ctx.post_once(E::HeatingError);
        return Err(e.into());
    }
    info!("HEATING: target {:.1}°C", target);
    Ok(())
}

fn heating_execute<D, H, T>(ctx: &mut Ctx<'_, D, H, T>) -> Result<(), Error>
where
    D: AxisDriver,
    H: HeaterDriver,
    T: TemperatureSource,
{
    if ctx.exec.completed {
        return Ok(());
    }
    let t = match ctx.machine.regulate(ctx.now_ms) {
        Ok(t) => t,
        Err(e) => {
            error!("HEATING: {}", e);
            ctx.post_once(E::HeatingError);
            return Err(e);
        }
    };
    if ctx.machine.at_setpoint(t) {
        info!("HEATING: target reached at {:.1}°C", t);
        ctx.post_once(E::HeatingSuccess);
    } else if ctx.elapsed_ms() > u64::from(ctx.machine.config.heating.heating_timeout_ms) {
        error!("HEATING: timed out at {:.1}°C", t);
        ctx.post_once(E::HeatingError);
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
//  EXECUTING
// ═══════════════════════════════════════════════════════════════════════════

/// Copy the uploaded program out of the shared buffer and build a sequencer.
fn build_sequencer<D, H, T>(machine: &Machine<D, H, T>) -> Result<ExecutionSequencer, ProgramError> {
    let bytes = machine.program.snapshot()?;
    let config = &machine.config;
    let geometry = config.execution.clone();

    if drill::is_drill_file(&bytes) {
        let text = String::from_utf8_lossy(&bytes);
        let file = drill::parse(&text);
        if file.holes.is_empty() {
            return Err(ProgramError::NoValidCommands);
        }
        let points = file.to_solder_points(
            config.axis_x.steps_per_mm,
            config.axis_y.steps_per_mm,
            config.program.default_solder_ms,
        );
        return Ok(ExecutionSequencer::with_points(points, geometry));
    }

    let mut interp = CommandInterpreter::new(config.program.default_feed_steps);
    interp.load(&bytes);
    if interp.command_count() == 0 {
        return Err(ProgramError::NoValidCommands);
    }
    Ok(ExecutionSequencer::with_program(interp, geometry))
}

fn executing_enter<D, H, T>(ctx: &mut Ctx<'_, D, H, T>) -> Result<(), Error>
where
    D: AxisDriver,
    H: HeaterDriver,
    T: TemperatureSource,
{
    let mut sequencer = match build_sequencer(ctx.machine) {
        Ok(s) => s,
        Err(e) => {
            error!("EXECUTING: cannot load program: {}", e);
            ctx.machine.job.sequencer = None;
            ctx.post_once(E::DataError);
            return Err(e.into());
        }
    };
    match ctx.machine.job.resume.take() {
        Some(resume) => sequencer = sequencer.resume_from(resume),
        None => ctx.machine.job.completed = 0,
    }
    ctx.machine.job.sequencer = Some(sequencer);
    info!("EXECUTING: job started");
    Ok(())
}

fn executing_execute<D, H, T>(ctx: &mut Ctx<'_, D, H, T>) -> Result<(), Error>
where
    D: AxisDriver,
    H: HeaterDriver,
    T: TemperatureSource,
{
    if ctx.exec.completed {
        return Ok(());
    }
    if let Err(e) = ctx.machine.regulate(ctx.now_ms) {
        error!("EXECUTING: heating lost: {}", e);
        ctx.post_once(E::HeatingError);
        return Err(e);
    }

    let now = ctx.now_ms;
    let machine = &mut *ctx.machine;
    let Some(sequencer) = machine.job.sequencer.as_mut() else {
        return Ok(());
    };
    let state = sequencer.tick(&mut machine.axes, now)?;
    machine.job.completed = sequencer.completed();
    if state == SequencerState::Complete {
        info!("EXECUTING: job complete, {} done", sequencer.completed());
        ctx.post_once(E::TaskDone);
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
//  PAUSED
// ═══════════════════════════════════════════════════════════════════════════

fn paused_enter<D, H, T>(ctx: &mut Ctx<'_, D, H, T>) -> Result<(), Error>
where
    D: AxisDriver,
{
    let machine = &mut *ctx.machine;
    machine.job.resume = machine.job.sequencer.as_ref().map(ExecutionSequencer::resume_point);
    machine.axes.s.set_enabled(false)?;
    if let Some(r) = machine.job.resume {
        info!("PAUSED: {} done, resume from item {}", r.completed, r.offset);
    }
    Ok(())
}

fn paused_execute<D, H, T>(ctx: &mut Ctx<'_, D, H, T>) -> Result<(), Error>
where
    D: AxisDriver,
    H: HeaterDriver,
    T: TemperatureSource,
{
    ctx.machine.regulate(ctx.now_ms)?;
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
//  NORMAL_EXIT
// ═══════════════════════════════════════════════════════════════════════════

fn normal_exit_enter<D, H, T>(ctx: &mut Ctx<'_, D, H, T>) -> Result<(), Error>
where
    D: AxisDriver,
    H: HeaterDriver,
{
    let machine = &mut *ctx.machine;
    machine.regulator.set_enabled(false)?;
    machine.axes.s.set_enabled(false)?;
    info!(
        "NORMAL_EXIT: heater off, cooling below {:.1}°C",
        machine.config.heating.cooldown_safe_temperature_c
    );
    Ok(())
}

fn normal_exit_execute<D, H, T>(ctx: &mut Ctx<'_, D, H, T>) -> Result<(), Error>
where
    D: AxisDriver,
    H: HeaterDriver,
    T: TemperatureSource,
{
    if ctx.exec.completed {
        return Ok(());
    }
    let t = match ctx.machine.read_temperature() {
        Ok(t) => t,
        Err(e) => {
            error!("NORMAL_EXIT: {}", e);
            ctx.post_once(E::CoolingError);
            return Err(e.into());
        }
    };
    let heating = &ctx.machine.config.heating;
    if t <= heating.cooldown_safe_temperature_c {
        info!("NORMAL_EXIT: cooled to {:.1}°C", t);
        ctx.post_once(E::DeinitSuccess);
    } else if ctx.elapsed_ms() > u64::from(heating.cooldown_timeout_ms) {
        error!("NORMAL_EXIT: still {:.1}°C after cooldown timeout", t);
        ctx.post_once(E::CoolingError);
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
//  ERROR STATES / LOCK
// ═══════════════════════════════════════════════════════════════════════════

fn error_enter<D, H, T>(ctx: &mut Ctx<'_, D, H, T>) -> Result<(), Error>
where
    D: AxisDriver,
    H: HeaterDriver,
    T: TemperatureSource,
{
    error!("{}: everything off", ctx.state);
    ctx.machine.all_off()
}

/// Each error state escalates with its own event.
fn error_execute<D, H, T>(ctx: &mut Ctx<'_, D, H, T>) -> Result<(), Error> {
    let event = match ctx.state {
        S::CalibrationError => E::CalibrationError,
        S::HeatingError => E::HeatingError,
        S::DataError => E::DataError,
        _ => return Ok(()),
    };
    ctx.post_once(event);
    Ok(())
}

fn lock_enter<D, H, T>(ctx: &mut Ctx<'_, D, H, T>) -> Result<(), Error>
where
    D: AxisDriver,
    H: HeaterDriver,
    T: TemperatureSource,
{
    ctx.machine.job.clear();
    error!("LOCK: station locked, power cycle required");
    ctx.machine.all_off()
}
