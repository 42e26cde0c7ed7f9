//! Fixed single-line console summaries for humans tailing the serial log.

use core::fmt::Write;

use crate::error::FormatError;
use crate::store::SharedTelemetrySnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleView {
    Sensors,
    System,
    Network,
    All,
}

/// Human label for an RSSI figure.
pub fn rssi_quality(rssi: i8) -> &'static str {
    match rssi {
        i8::MIN..=-81 => "poor",
        -80..=-71 => "fair",
        -70..=-61 => "good",
        _ => "excellent",
    }
}

fn presence(flag: bool) -> &'static str {
    if flag { "PRESENT" } else { "ABSENT" }
}

/// Render one console line into `out`. On overflow `out` is left empty.
pub fn render_console<const N: usize>(
    s: &SharedTelemetrySnapshot,
    view: ConsoleView,
    out: &mut heapless::String<N>,
) -> Result<(), FormatError> {
    out.clear();
    let res = match view {
        ConsoleView::Sensors => write!(
            out,
            "Sensors  -> pH: {:.1}  Temp: {:.1} C  Hum: {:.1}%  P: {}  K: {}",
            s.sensors.ph,
            s.sensors.temperature_c,
            s.sensors.humidity_pct,
            presence(s.sensors.phosphorus),
            presence(s.sensors.potassium),
        ),
        ConsoleView::System => write!(
            out,
            "System   -> Uptime: {:<5} s  Heap: {:<7} bytes  Min: {:<7} bytes  Frag: {}%",
            s.health.uptime_secs,
            s.health.free_heap,
            s.health.min_free_heap,
            s.health.fragmentation_pct,
        ),
        ConsoleView::Network => write!(
            out,
            "WiFi     -> IP: {} | RSSI: {} dBm | Signal: {}",
            s.health.ip_address,
            s.health.wifi_rssi,
            rssi_quality(s.health.wifi_rssi),
        ),
        ConsoleView::All => write!(
            out,
            "Sensors: pH={:.1} T={:.1}C H={:.1}% P={} K={} | Irrigation: {} Up={}s Act={}/{} | \
             Sys: Heap={} Up={}s | WiFi: {}",
            s.sensors.ph,
            s.sensors.temperature_c,
            s.sensors.humidity_pct,
            u8::from(s.sensors.phosphorus),
            u8::from(s.sensors.potassium),
            s.irrigation.phase.as_str(),
            s.irrigation.current_runtime_ms / 1000,
            s.irrigation.activations_today,
            s.irrigation.activations_total,
            s.health.free_heap,
            s.health.uptime_secs,
            s.health.ip_address,
        ),
    };
    res.map_err(|_| {
        out.clear();
        FormatError::BufferTooSmall { capacity: N }
    })
}
