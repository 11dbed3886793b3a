//! Recording mock adapters for integration tests.
//!
//! Each mock records the calls that matter so tests can assert on the
//! command history without touching real GPIO/LEDC/SPI.  The station
//! owns its drivers; tests reach them through `Station::machine()`.

use solderbot::app::events::AppEvent;
use solderbot::app::ports::{AxisDriver, EventSink, HeaterDriver, TemperatureSource};
use solderbot::error::{AxisError, HeaterError, SensorError};
use solderbot::motion::Direction;

// ── Axis ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisCall {
    Enable(bool),
    Direction(Direction),
}

#[derive(Debug, Clone, Copy)]
enum Switch {
    Absent,
    /// Triggers after this many pulses in one direction.
    After(u64),
    Stuck,
}

pub struct MockAxis {
    pub calls: Vec<AxisCall>,
    pub pulses: u64,
    pub enabled: bool,
    since_direction: u64,
    switch: Switch,
}

#[allow(dead_code)]
impl MockAxis {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            pulses: 0,
            enabled: false,
            since_direction: 0,
            switch: Switch::Absent,
        }
    }

    pub fn with_switch_after(pulses: u64) -> Self {
        Self {
            switch: Switch::After(pulses),
            ..Self::new()
        }
    }

    pub fn with_stuck_switch() -> Self {
        Self {
            switch: Switch::Stuck,
            ..Self::new()
        }
    }

    pub fn was_enabled(&self) -> bool {
        self.calls.contains(&AxisCall::Enable(true))
    }
}

impl AxisDriver for MockAxis {
    fn set_enabled(&mut self, on: bool) -> Result<(), AxisError> {
        self.enabled = on;
        self.calls.push(AxisCall::Enable(on));
        Ok(())
    }

    fn set_direction(&mut self, dir: Direction) -> Result<(), AxisError> {
        self.since_direction = 0;
        self.calls.push(AxisCall::Direction(dir));
        Ok(())
    }

    fn step_pulses(&mut self, count: u32, _period_us: u32) -> Result<(), AxisError> {
        self.pulses += u64::from(count);
        self.since_direction += u64::from(count);
        Ok(())
    }

    fn has_limit_switch(&self) -> bool {
        !matches!(self.switch, Switch::Absent)
    }

    fn limit_triggered(&mut self) -> Result<bool, AxisError> {
        Ok(match self.switch {
            Switch::After(n) => self.since_direction >= n,
            Switch::Absent | Switch::Stuck => false,
        })
    }
}

// ── Heater ────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MockHeater {
    pub duty_history: Vec<f32>,
    pub enabled: bool,
}

#[allow(dead_code)]
impl MockHeater {
    pub fn duty(&self) -> f32 {
        self.duty_history.last().copied().unwrap_or(0.0)
    }
}

impl HeaterDriver for MockHeater {
    fn set_duty(&mut self, percent: f32) -> Result<(), HeaterError> {
        self.duty_history.push(percent);
        Ok(())
    }

    fn set_enabled(&mut self, on: bool) -> Result<(), HeaterError> {
        self.enabled = on;
        Ok(())
    }
}

// ── Thermometer ───────────────────────────────────────────────

/// Reports whatever the test last set.
pub struct MockThermometer {
    pub temperature: f32,
    pub fault: Option<SensorError>,
    pub reads: u32,
}

impl MockThermometer {
    pub fn at(temperature: f32) -> Self {
        Self {
            temperature,
            fault: None,
            reads: 0,
        }
    }
}

impl TemperatureSource for MockThermometer {
    fn read_celsius(&mut self) -> Result<f32, SensorError> {
        self.reads += 1;
        match self.fault {
            Some(e) => Err(e),
            None => Ok(self.temperature),
        }
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Rig: station + sink + simulated time ──────────────────────

use solderbot::app::commands::AppCommand;
use solderbot::app::service::Station;
use solderbot::config::SystemConfig;
use solderbot::fsm::{LifecycleState, TickOutcome};

pub type TestStation = Station<MockAxis, MockHeater, MockThermometer>;

/// Small geometry so jobs finish in a few hundred ticks.
pub fn test_config() -> SystemConfig {
    let mut c = SystemConfig::default();
    c.execution.safe_z = 200;
    c.execution.solder_z = 300;
    c.execution.step_budget = 100;
    c.execution.settle_ms = 100;
    c.execution.dwell_ms = 200;
    c.heating.heating_timeout_ms = 5_000;
    c.heating.cooldown_timeout_ms = 5_000;
    for axis in [&mut c.axis_x, &mut c.axis_y, &mut c.axis_z] {
        axis.calibration_max_bursts = 10;
    }
    c
}

pub struct Rig {
    pub station: TestStation,
    pub sink: RecordingSink,
    pub now: u64,
    tick_ms: u64,
}

#[allow(dead_code)]
impl Rig {
    /// X/Y/Z with working endstops, feeder without.
    pub fn new(config: SystemConfig) -> Self {
        Self::with_axes(
            config,
            [
                MockAxis::with_switch_after(200),
                MockAxis::with_switch_after(200),
                MockAxis::with_switch_after(200),
                MockAxis::new(),
            ],
        )
    }

    pub fn with_axes(config: SystemConfig, axes: [MockAxis; 4]) -> Self {
        let tick_ms = u64::from(config.lifecycle.tick_period_ms);
        let station = Station::new(config, axes, MockHeater::default(), MockThermometer::at(25.0))
            .expect("test config is valid");
        let mut rig = Self {
            station,
            sink: RecordingSink::default(),
            now: 0,
            tick_ms,
        };
        rig.station.start(rig.now, &mut rig.sink);
        rig
    }

    /// Started and settled in Idle.
    pub fn idle(config: SystemConfig) -> Self {
        let mut rig = Self::new(config);
        rig.run_until(|s| s.state() == LifecycleState::Idle, 10);
        rig
    }

    pub fn tick(&mut self) -> TickOutcome {
        self.now += self.tick_ms;
        self.station.tick(self.now, &mut self.sink)
    }

    pub fn send(&mut self, cmd: AppCommand) {
        self.station
            .handle_command(cmd, &mut self.sink)
            .expect("command accepted");
    }

    pub fn state(&self) -> LifecycleState {
        self.station.state()
    }

    pub fn set_temperature(&mut self, t: f32) {
        self.station.machine_mut().sensor.temperature = t;
    }

    /// Tick until `done` holds; panics after `max_ticks`.
    pub fn run_until(&mut self, done: impl Fn(&TestStation) -> bool, max_ticks: u32) {
        for _ in 0..max_ticks {
            if done(&self.station) {
                return;
            }
            self.tick();
        }
        assert!(
            done(&self.station),
            "condition not met within {} ticks, state {}",
            max_ticks,
            self.state()
        );
    }

    pub fn run_to(&mut self, state: LifecycleState, max_ticks: u32) {
        self.run_until(|s| s.state() == state, max_ticks);
    }

    /// States visited, in order, from the recorded transitions.
    pub fn visited(&self) -> Vec<LifecycleState> {
        self.sink
            .events
            .iter()
            .filter_map(|e| match e {
                AppEvent::StateChanged { to, .. } => Some(*to),
                _ => None,
            })
            .collect()
    }
}
