//! Analog pH probe.
//!
//! The probe conditioner outputs 0..3.3 V for pH 0..14, read through ADC1
//! and averaged over a few back-to-back conversions.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads the configured ADC1 channel via the oneshot API.
//! On host/test: reads the simulated ADC code (`hw_init::sim_set_adc`).

use crate::drivers::hw_init;
use crate::pins::ADC_MAX_CODE;

/// pH at full-scale ADC code.
pub const PH_FULL_SCALE: f32 = 14.0;

/// Linear conversion from a (possibly fractional, filtered) ADC code.
pub fn ph_from_code(code: f32) -> f32 {
    (code / f32::from(ADC_MAX_CODE) * PH_FULL_SCALE).clamp(0.0, PH_FULL_SCALE)
}

pub struct PhProbe {
    channel: u32,
    oversample: u8,
}

impl PhProbe {
    pub fn new(channel: u32, oversample: u8) -> Self {
        Self {
            channel,
            oversample: oversample.max(1),
        }
    }

    /// Mean of `oversample` conversions, rounded to the nearest code.
    pub fn read_raw(&mut self) -> u16 {
        average_code((0..self.oversample).map(|_| hw_init::adc1_read(self.channel)))
    }
}

fn average_code(samples: impl Iterator<Item = u16>) -> u16 {
    let (sum, n) = samples.fold((0u32, 0u32), |(s, n), c| (s + u32::from(c), n + 1));
    if n == 0 {
        return 0;
    }
    ((sum + n / 2) / n).min(u32::from(ADC_MAX_CODE)) as u16
}
