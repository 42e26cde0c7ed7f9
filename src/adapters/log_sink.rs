//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => {
                info!("START | initial_state={}", state.as_str());
            }
            AppEvent::NutrientChanged(flags) => {
                info!(
                    "NUTRIENT | P={} K={}",
                    if flags.phosphorus { "present" } else { "absent" },
                    if flags.potassium { "present" } else { "absent" },
                );
            }
            AppEvent::AnalogChanged { channel, value } => {
                info!("SENSOR | {} changed to {:.1}", channel.name(), value);
            }
            AppEvent::IrrigationTransition(t) => {
                info!(
                    "STATE | {} -> {} ({:?}) at {}ms",
                    t.from.as_str(),
                    t.to.as_str(),
                    t.cause,
                    t.at_ms
                );
            }
            AppEvent::CommandRejected { command, reason } => {
                warn!("COMMAND | {} rejected: {}", command.name(), reason);
            }
            AppEvent::PublishDropped { region, reason } => {
                warn!("STORE | {:?} publish dropped: {}", region, reason);
            }
            AppEvent::CycleOverrun { missed } => {
                warn!("SCHED | {} acquisition cycle(s) missed", missed);
            }
        }
    }
}
