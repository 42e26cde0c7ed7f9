//! Machine-readable telemetry body.
//!
//! Nested `sensors` / `irrigation` / `stats` object consumed by the web
//! layer and by the serial capture pipeline, which picks the first `{...}`
//! span out of each line.

use serde::Serialize;

use crate::error::FormatError;
use crate::store::SharedTelemetrySnapshot;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Body {
    version: u64,
    sensors: Sensors,
    irrigation: Irrigation,
    stats: Stats,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Sensors {
    ph: f32,
    temperature: f32,
    humidity: f32,
    phosphorus: bool,
    potassium: bool,
    timestamp: u64,
    read_count: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Irrigation {
    active: bool,
    state: &'static str,
    /// Seconds the current activation has been running.
    uptime: u64,
    /// Start of the most recent activation (ms), 0 if never.
    last_activation: u64,
    /// Activations today.
    activations: u32,
    activations_total: u32,
    /// Low moisture threshold (%).
    threshold: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Stats {
    free_heap: u32,
    min_free_heap: u32,
    fragmentation: u8,
    uptime: u64,
    wifi_rssi: i8,
    ip_address: heapless::String<16>,
}

/// One decimal place, matching what the probes can actually resolve.
fn round1(v: f32) -> f32 {
    (v * 10.0).round() / 10.0
}

impl From<&SharedTelemetrySnapshot> for Body {
    fn from(s: &SharedTelemetrySnapshot) -> Self {
        let mut ip = heapless::String::new();
        // "255.255.255.255" is 15 bytes, always fits.
        let _ = core::fmt::Write::write_fmt(&mut ip, format_args!("{}", s.health.ip_address));
        Self {
            version: s.version,
            sensors: Sensors {
                ph: round1(s.sensors.ph),
                temperature: round1(s.sensors.temperature_c),
                humidity: round1(s.sensors.humidity_pct),
                phosphorus: s.sensors.phosphorus,
                potassium: s.sensors.potassium,
                timestamp: s.sensors.timestamp_ms,
                read_count: s.sensors.read_count,
            },
            irrigation: Irrigation {
                active: s.irrigation.active,
                state: s.irrigation.phase.as_str(),
                uptime: s.irrigation.current_runtime_ms / 1000,
                last_activation: s.irrigation.last_activation_ms.unwrap_or(0),
                activations: s.irrigation.activations_today,
                activations_total: s.irrigation.activations_total,
                threshold: round1(s.irrigation.moisture_low_pct),
            },
            stats: Stats {
                free_heap: s.health.free_heap,
                min_free_heap: s.health.min_free_heap,
                fragmentation: s.health.fragmentation_pct,
                uptime: s.health.uptime_secs,
                wifi_rssi: s.health.wifi_rssi,
                ip_address: ip,
            },
        }
    }
}

/// Render `snapshot` straight into `out`. On overflow `out` is left empty.
pub fn render_json<const N: usize>(
    snapshot: &SharedTelemetrySnapshot,
    out: &mut heapless::String<N>,
) -> Result<(), FormatError> {
    out.clear();
    match serde_json_core::to_string::<_, N>(&Body::from(snapshot)) {
        Ok(text) => {
            *out = text;
            Ok(())
        }
        Err(serde_json_core::ser::Error::BufferFull) => {
            Err(FormatError::BufferTooSmall { capacity: N })
        }
        #[allow(unreachable_patterns)]
        Err(_) => Err(FormatError::Serialize),
    }
}
