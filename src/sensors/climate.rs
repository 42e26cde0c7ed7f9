//! DHT22 temperature / humidity probe.
//!
//! The sensor must not be polled more often than every 2 s, but the
//! acquisition cycle runs at 5 Hz. Between physical reads the cached result
//! is served so every cycle still delivers exactly one sample per channel.
//! A failed read is reported as NaN on both channels.

use log::debug;

use crate::drivers::hw_init;
use crate::error::SensorError;

use super::ClimateReading;

pub struct ClimateProbe {
    gpio: i32,
    min_interval_ms: u64,
    last_read_ms: Option<u64>,
    cached: ClimateReading,
    failures: u32,
}

impl ClimateProbe {
    pub fn new(gpio: i32, min_interval_ms: u64) -> Self {
        Self {
            gpio,
            min_interval_ms,
            last_read_ms: None,
            cached: ClimateReading::MISSING,
            failures: 0,
        }
    }

    /// Current reading, refreshing from the bus when the interval allows.
    pub fn read(&mut self, now_ms: u64) -> ClimateReading {
        let gpio = self.gpio;
        self.read_with(now_ms, || hw_init::dht22_read(gpio))
    }

    /// Same as [`read`](Self::read) with an injected bus transaction.
    pub fn read_with(
        &mut self,
        now_ms: u64,
        transact: impl FnOnce() -> Result<(f32, f32), SensorError>,
    ) -> ClimateReading {
        let due = self
            .last_read_ms
            .is_none_or(|t| now_ms.saturating_sub(t) >= self.min_interval_ms);
        if !due {
            return self.cached;
        }
        self.last_read_ms = Some(now_ms);
        self.cached = match transact() {
            Ok((temperature_c, humidity_pct)) => ClimateReading {
                temperature_c,
                humidity_pct,
            },
            Err(e) => {
                self.failures = self.failures.saturating_add(1);
                debug!("CLIMATE | read failed: {}", e);
                ClimateReading::MISSING
            }
        };
        self.cached
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}
