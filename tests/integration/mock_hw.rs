//! Mock adapters for integration tests.
//!
//! Records every actuator call so tests can assert on the full command
//! history without touching the simulated GPIO state shared by the unit
//! tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use soilwatch::app::events::AppEvent;
use soilwatch::app::ports::{
    Clock, EventSink, IrrigationActuator, SoilProbePort, SystemProbe, TelemetrySink,
};
use soilwatch::diagnostics::SystemHealth;
use soilwatch::sensors::{ClimateReading, NutrientFlags};
use soilwatch::telemetry::TelemetryFrame;

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    SetIrrigation(bool),
    SetIndicator(bool),
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub nutrients: NutrientFlags,
    pub ph_code: u16,
    pub climate: ClimateReading,
    pub health: SystemHealth,
    pub relay: bool,
    /// Relay contacts welded: writes are accepted but the readback never
    /// changes.
    pub relay_stuck: bool,
    pub indicator: bool,
    pub calls: Vec<ActuatorCall>,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            nutrients: NutrientFlags::default(),
            ph_code: 2048,
            climate: ClimateReading {
                temperature_c: 21.0,
                humidity_pct: 45.0,
            },
            health: SystemHealth::default(),
            relay: false,
            relay_stuck: false,
            indicator: false,
            calls: Vec::new(),
        }
    }

    pub fn set_moisture(&mut self, pct: f32) {
        self.climate.humidity_pct = pct;
    }

    pub fn relay_writes(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, ActuatorCall::SetIrrigation(_)))
            .count()
    }

    pub fn indicator_history(&self) -> Vec<bool> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                ActuatorCall::SetIndicator(on) => Some(*on),
                ActuatorCall::SetIrrigation(_) => None,
            })
            .collect()
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl SoilProbePort for MockHardware {
    fn read_nutrients(&mut self) -> NutrientFlags {
        self.nutrients
    }

    fn read_ph_raw(&mut self) -> u16 {
        self.ph_code
    }

    fn read_climate(&mut self, _now_ms: u64) -> ClimateReading {
        self.climate
    }
}

impl IrrigationActuator for MockHardware {
    fn set_irrigation(&mut self, on: bool) {
        self.calls.push(ActuatorCall::SetIrrigation(on));
        if !self.relay_stuck {
            self.relay = on;
        }
    }

    fn is_irrigating(&mut self) -> bool {
        self.relay
    }

    fn set_indicator(&mut self, on: bool) {
        self.calls.push(ActuatorCall::SetIndicator(on));
        self.indicator = on;
    }
}

impl SystemProbe for MockHardware {
    fn sample_health(&mut self, uptime_ms: u64) -> SystemHealth {
        SystemHealth {
            uptime_secs: uptime_ms / 1000,
            ..self.health
        }
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transitions(&self) -> Vec<soilwatch::fsm::Transition> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::IrrigationTransition(t) => Some(*t),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(*event);
    }
}

// ── Telemetry sink ────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingTelemetry {
    pub frames: Vec<TelemetryFrame>,
    pub console: Vec<String>,
}

impl TelemetrySink for RecordingTelemetry {
    fn push_json(&mut self, frame: &TelemetryFrame) {
        self.frames.push(frame.clone());
    }

    fn push_console(&mut self, line: &str) {
        self.console.push(line.to_owned());
    }
}

// ── Clock ─────────────────────────────────────────────────────

/// Hand-driven clock; clones share the same time.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

#[allow(dead_code)]
impl ManualClock {
    pub fn at(ms: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(ms)),
        }
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
