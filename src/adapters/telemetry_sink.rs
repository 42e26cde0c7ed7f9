//! Log-based telemetry sink.
//!
//! JSON frames go out under the `telemetry` log target, one object per
//! line, which is what the serial capture pipeline scans for. Console
//! summaries use the `console` target.

use log::{debug, info};

use crate::app::ports::TelemetrySink;
use crate::telemetry::TelemetryFrame;

#[derive(Default)]
pub struct LogTelemetrySink;

impl LogTelemetrySink {
    pub fn new() -> Self {
        Self
    }
}

impl TelemetrySink for LogTelemetrySink {
    fn push_json(&mut self, frame: &TelemetryFrame) {
        if frame.stale {
            debug!(target: "telemetry", "re-sending v{} (store busy)", frame.version);
        }
        info!(target: "telemetry", "{}", frame.json);
    }

    fn push_console(&mut self, line: &str) {
        info!(target: "console", "{}", line);
    }
}
