//! SoilWatch Firmware: Main Entry Point
//!
//! Two tasks on two cores, sharing one lock-guarded telemetry store.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                       Adapters (outer ring)                      │
//! │                                                                  │
//! │  HardwareAdapter        LogEventSink   LogTelemetrySink          │
//! │  (Probe+Actuator+System) (EventSink)   (TelemetrySink)           │
//! │                                                                  │
//! │  ─────────────────── Port Trait Boundary ───────────────────     │
//! │                                                                  │
//! │  APP core, high prio                PRO core, low prio           │
//! │  ┌──────────────────────┐          ┌──────────────────────┐      │
//! │  │  AcquisitionTask     │  store   │  DistributionTask    │      │
//! │  │  ControlService      │ ───────▶ │  TelemetryDistributor│      │
//! │  │  Sensors · FSM       │  signal  │  JSON · console      │      │
//! │  └──────────────────────┘          └──────────────────────┘      │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::{Context, Result};
use log::{info, warn};

use soilwatch::adapters::hardware::HardwareAdapter;
use soilwatch::adapters::log_sink::LogEventSink;
use soilwatch::adapters::telemetry_sink::LogTelemetrySink;
use soilwatch::adapters::time::MonotonicClock;
use soilwatch::app::channels::{COMMAND_CHANNEL, TELEMETRY_UPDATED};
use soilwatch::app::context::SystemContext;
use soilwatch::config::SystemConfig;
use soilwatch::drivers::hw_init;
use soilwatch::tasks::acquisition::{self, AcquisitionTask};
use soilwatch::tasks::distribution::{self, DistributionTask};

/// Build-time JSON override, e.g.
/// `SOILWATCH_CONFIG='{"irrigation":{"moisture_low_pct":25.0}}' cargo build`.
fn load_config() -> SystemConfig {
    match option_env!("SOILWATCH_CONFIG") {
        Some(json) => match SystemConfig::from_json(json) {
            Ok(config) => {
                info!("Config: build-time override applied");
                config
            }
            Err(e) => {
                warn!("Config: override rejected ({}), using defaults", e);
                SystemConfig::default()
            }
        },
        None => SystemConfig::default(),
    }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  SoilWatch v{}                    ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration + context ────────────────────────────
    let config = load_config();
    let ctx = SystemContext::new(config).map_err(|e| anyhow::anyhow!("{e}"))?;
    let config = ctx.config();
    info!(
        "Irrigation: low={:.0}% high={:.0}% ceiling={}s interval={}s",
        config.irrigation.moisture_low_pct,
        config.irrigation.moisture_high_pct,
        config.irrigation.max_runtime_ms / 1000,
        config.irrigation.min_interval_ms / 1000,
    );

    // ── 3. Peripherals ────────────────────────────────────────
    hw_init::init_peripherals(&config.pins).map_err(|e| anyhow::anyhow!("HAL init: {e}"))?;
    let hw = HardwareAdapter::new(config);

    // ── 4. Tasks ──────────────────────────────────────────────
    let acquire = AcquisitionTask::new(
        &ctx,
        hw,
        MonotonicClock::new(),
        LogEventSink::new(),
        &COMMAND_CHANNEL,
        &TELEMETRY_UPDATED,
    );
    let acquire = acquisition::spawn(acquire, config).context("spawning acquisition task")?;

    let distribute = DistributionTask::new(&ctx, LogTelemetrySink::new(), &TELEMETRY_UPDATED);
    let distribute =
        distribution::spawn(distribute, config).context("spawning distribution task")?;

    info!("System ready.");

    // Neither task returns; a join only completes if one of them panicked.
    if acquire.join().is_err() {
        anyhow::bail!("acquisition task panicked");
    }
    if distribute.join().is_err() {
        anyhow::bail!("distribution task panicked");
    }
    Ok(())
}
