//! Telemetry distribution.
//!
//! The distribution side never touches the hardware or the controllers. It
//! copies a [`SharedTelemetrySnapshot`] out of the store (one lock hold)
//! and formats it with the lock released. When the store read times out,
//! the last snapshot that was read successfully is served again, marked
//! stale.

pub mod console;
pub mod json;

use std::sync::Arc;

use log::{debug, warn};

use crate::error::{Error, StoreError};
use crate::store::{SharedTelemetrySnapshot, SharedTelemetryStore};

pub use console::{render_console, rssi_quality, ConsoleView};
pub use json::render_json;

/// JSON body capacity.
pub const JSON_CAP: usize = 512;
/// Console line capacity.
pub const CONSOLE_CAP: usize = 192;

/// One formatted telemetry push.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryFrame {
    /// Store version the frame was rendered from.
    pub version: u64,
    /// Rendered from the cached snapshot after a store read timeout.
    pub stale: bool,
    pub json: heapless::String<JSON_CAP>,
    pub console: heapless::String<CONSOLE_CAP>,
}

pub struct TelemetryDistributor {
    store: Arc<SharedTelemetryStore>,
    last_good: Option<SharedTelemetrySnapshot>,
}

impl TelemetryDistributor {
    pub fn new(store: Arc<SharedTelemetryStore>) -> Self {
        Self {
            store,
            last_good: None,
        }
    }

    /// Read the store, falling back to the last good snapshot.
    ///
    /// Returns the snapshot and whether it is stale. Fails only when the
    /// very first read times out.
    pub fn pull(&mut self) -> Result<(SharedTelemetrySnapshot, bool), StoreError> {
        match self.store.snapshot_all() {
            Ok(snap) => {
                self.last_good = Some(snap);
                Ok((snap, false))
            }
            Err(e) => match self.last_good {
                Some(snap) => {
                    debug!("TELEMETRY | store busy, serving v{} stale", snap.version);
                    Ok((snap, true))
                }
                None => Err(e),
            },
        }
    }

    /// Pull and render both the JSON body and the `view` console line.
    pub fn pull_and_format(&mut self, view: ConsoleView) -> Result<TelemetryFrame, Error> {
        let (snap, stale) = self.pull()?;
        let mut frame = TelemetryFrame {
            version: snap.version,
            stale,
            json: heapless::String::new(),
            console: heapless::String::new(),
        };
        render_json(&snap, &mut frame.json).inspect_err(|e| {
            warn!("TELEMETRY | json render failed: {}", e);
        })?;
        render_console(&snap, view, &mut frame.console).inspect_err(|e| {
            warn!("TELEMETRY | console render failed: {}", e);
        })?;
        Ok(frame)
    }

    pub fn last_good(&self) -> Option<&SharedTelemetrySnapshot> {
        self.last_good.as_ref()
    }
}
