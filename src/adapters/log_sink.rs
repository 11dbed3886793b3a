//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing station events to the ESP-IDF
//! logger (UART / USB-CDC in production, stderr on the host).  A display
//! or web adapter would implement the same trait.

use log::{info, warn};

use crate::app::events::{AppEvent, StatusReport};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink {
    json_status: bool,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log status reports as one JSON object per line, for host tooling.
    pub fn with_json_status() -> Self {
        Self { json_status: true }
    }
}

fn status_json(report: &StatusReport) -> Option<String> {
    serde_json::to_string(report)
        .map_err(|e| warn!("STATUS: JSON encoding failed: {}", e))
        .ok()
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Status(s) if self.json_status => {
                if let Some(json) = status_json(s) {
                    info!("STATUS {}", json);
                }
            }
            AppEvent::Status(s) => {
                let temp = s
                    .temperature_c
                    .map_or_else(|| "--".to_string(), |t| format!("{t:.1}"));
                info!(
                    "STATUS | state={} ({:?}) {}ms | job={} done={} {}% | \
                     T={}/{:.0}\u{00b0}C duty={:.0}% | errors={} tasks={} queued={}",
                    s.state,
                    s.color,
                    s.time_in_state_ms,
                    s.sequencer.map_or("-", |q| q.name()),
                    s.completed,
                    s.progress_percent,
                    temp,
                    s.target_c,
                    s.heater_duty,
                    s.statistics.error_count,
                    s.statistics.task_completed_count,
                    s.pending_events,
                );
            }
            AppEvent::StateChanged { from, to, event } => {
                info!("STATE | {} -> {} on {}", from, to, event);
            }
            AppEvent::TransitionRejected { state, event } => {
                warn!("STATE | {} ignored in {}", event, state);
            }
            AppEvent::EventDropped(event) => {
                warn!("EVENT | queue full, {} dropped", event);
            }
            AppEvent::Started(state) => {
                info!("START | initial_state={}", state);
            }
            AppEvent::Stopped(state) => {
                warn!("STOP | halted in {}", state);
            }
        }
    }
}
