//! SolderBot firmware entry point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  StepperDriver ×4   PwmHeater   Max6675   MonotonicClock       │
//! │  (AxisDriver)       (Heater)    (TempSrc) (Clock)              │
//! │  ConsoleParser ──▶ AppCommand        LogEventSink (EventSink)  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              Station (pure logic)                      │    │
//! │  │  LifecycleController · Sequencer · PID · Axes          │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::io::BufRead;
use std::sync::mpsc;

use anyhow::Result;
use log::{info, warn};

use esp_idf_hal::delay::{Ets, FreeRtos};
use esp_idf_hal::gpio::{AnyIOPin, AnyOutputPin, Input, Output, PinDriver, Pull};
use esp_idf_hal::ledc::{LedcDriver, LedcTimerDriver, config::TimerConfig};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::spi::{SpiDeviceDriver, SpiDriverConfig, config::Config as SpiConfig};
use esp_idf_hal::units::Hertz;

use solderbot::adapters::console::ConsoleParser;
use solderbot::adapters::log_sink::LogEventSink;
use solderbot::adapters::time::MonotonicClock;
use solderbot::app::ports::Clock;
use solderbot::app::service::Station;
use solderbot::config::SystemConfig;
use solderbot::drivers::heater::PwmHeater;
use solderbot::drivers::stepper::StepperDriver;
use solderbot::pins::{self, StepperPins};
use solderbot::sensors::thermocouple::Max6675;

type OutPin = PinDriver<'static, AnyOutputPin, Output>;
type LimitPin = PinDriver<'static, AnyIOPin, Input>;
type Axis = StepperDriver<OutPin, OutPin, OutPin, LimitPin, Ets>;

/// Status is logged every this many control ticks.
const STATUS_EVERY_TICKS: u32 = 50;

fn output(gpio: i32) -> Result<OutPin> {
    // SAFETY: every GPIO number in `pins` is claimed exactly once, here.
    Ok(PinDriver::output(unsafe { AnyOutputPin::new(gpio) })?)
}

fn stepper(p: StepperPins) -> Result<Axis> {
    let limit = match p.limit {
        Some(gpio) => {
            // SAFETY: see `output`.
            let mut pin = PinDriver::input(unsafe { AnyIOPin::new(gpio) })?;
            pin.set_pull(Pull::Up)?;
            Some(pin)
        }
        None => None,
    };
    let driver = StepperDriver::new(output(p.step)?, output(p.dir)?, output(p.enable)?, limit, Ets)
        .map_err(|e| anyhow::anyhow!("stepper init: {e}"))?;
    Ok(driver)
}

/// Read console lines on their own thread; the control loop never blocks.
fn spawn_console() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    let spawned = std::thread::Builder::new()
        .name("console".into())
        .stack_size(4096)
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(l) => {
                        if tx.send(l).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("CONSOLE: read failed: {}", e),
                }
            }
        });
    if let Err(e) = spawned {
        warn!("CONSOLE: thread not started ({}), no operator input", e);
    }
    rx
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  SolderBot v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = SystemConfig::default();
    let tick_ms = config.lifecycle.tick_period_ms;
    let upload_limit = config.program.max_program_bytes;

    // ── 2. Peripherals ────────────────────────────────────────
    let p = Peripherals::take()?;

    let axes = [
        stepper(pins::AXIS_X)?,
        stepper(pins::AXIS_Y)?,
        stepper(pins::AXIS_Z)?,
        stepper(pins::AXIS_S)?,
    ];

    let timer = LedcTimerDriver::new(
        p.ledc.timer0,
        &TimerConfig::default().frequency(Hertz(pins::HEATER_PWM_FREQ_HZ)),
    )?;
    // SAFETY: see `output`.
    let pwm = LedcDriver::new(p.ledc.channel0, timer, unsafe {
        AnyOutputPin::new(pins::HEATER_PWM_GPIO)
    })?;
    let heater = PwmHeater::new(pwm).map_err(|e| anyhow::anyhow!("heater init: {e}"))?;

    // SAFETY: see `output`.
    let spi = unsafe {
        SpiDeviceDriver::new_single(
            p.spi2,
            AnyOutputPin::new(pins::THERMO_SCLK_GPIO),
            AnyOutputPin::new(pins::THERMO_MOSI_GPIO),
            Some(AnyIOPin::new(pins::THERMO_MISO_GPIO)),
            Some(AnyOutputPin::new(pins::THERMO_CS_GPIO)),
            &SpiDriverConfig::new(),
            &SpiConfig::new().baudrate(Hertz(pins::THERMO_SPI_HZ)),
        )?
    };
    let thermocouple = Max6675::new(spi);

    // ── 3. Station ────────────────────────────────────────────
    let clock = MonotonicClock::new();
    let mut sink = LogEventSink::new();
    let mut station = Station::new(config, axes, heater, thermocouple)?;
    station.start(clock.now_ms(), &mut sink);

    let console = spawn_console();
    let mut parser = ConsoleParser::with_limit(upload_limit);
    let mut ticks: u32 = 0;

    info!("System ready. Entering control loop.");

    // ── 4. Control loop ───────────────────────────────────────
    loop {
        while let Ok(line) = console.try_recv() {
            if let Some(cmd) = parser.feed(&line) {
                if let Err(e) = station.handle_command(cmd, &mut sink) {
                    warn!("CONSOLE: command failed: {}", e);
                }
            }
        }

        let now = clock.now_ms();
        station.tick(now, &mut sink);

        ticks = ticks.wrapping_add(1);
        if ticks % STATUS_EVERY_TICKS == 0 {
            station.report_status(now, &mut sink);
        }

        FreeRtos::delay_ms(tick_ms);
    }
}
