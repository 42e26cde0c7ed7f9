//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlService (domain)
//! ```
//!
//! Driven adapters (probes, relay, health, sinks, clock) implement these
//! traits. The [`ControlService`](super::service::ControlService) consumes
//! them via generics, so the domain core never touches hardware directly.

use crate::diagnostics::SystemHealth;
use crate::sensors::{ClimateReading, NutrientFlags};
use crate::telemetry::TelemetryFrame;

// ───────────────────────────────────────────────────────────────
// Probe port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port for the soil probes.
pub trait SoilProbePort {
    /// Sample both nutrient lines once and return the debounced flags.
    fn read_nutrients(&mut self) -> NutrientFlags;

    /// Oversampled pH ADC code, 0..=4095.
    fn read_ph_raw(&mut self) -> u16;

    /// Temperature / humidity. NaN fields when the probe failed.
    fn read_climate(&mut self, now_ms: u64) -> ClimateReading;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the irrigation relay and indicator.
///
/// Only the irrigation controller, from the acquisition task, calls
/// `set_irrigation`.
pub trait IrrigationActuator {
    /// Energise (`true`) or release the irrigation relay.
    fn set_irrigation(&mut self, on: bool);

    /// Whether the relay is actually energised (pin readback).
    fn is_irrigating(&mut self) -> bool;

    fn set_indicator(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// System probe (driven adapter: RTOS / network stack → domain)
// ───────────────────────────────────────────────────────────────

pub trait SystemProbe {
    /// Heap, uptime and station link figures at this instant.
    fn sample_health(&mut self, uptime_ms: u64) -> SystemHealth;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Telemetry sink port (driven adapter: distributor → transport)
// ───────────────────────────────────────────────────────────────

/// Receives fully formatted frames. The transport (serial capture line,
/// WebSocket push) lives on the other side.
pub trait TelemetrySink {
    /// Machine-readable JSON body.
    fn push_json(&mut self, frame: &TelemetryFrame);

    /// Human-readable console summary.
    fn push_console(&mut self, line: &str);
}

// ───────────────────────────────────────────────────────────────
// Clock
// ───────────────────────────────────────────────────────────────

/// Monotonic time source.
pub trait Clock {
    fn now_ms(&self) -> u64;
}
