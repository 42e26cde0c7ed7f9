//! System configuration parameters
//!
//! All tunable parameters for the SoilWatch controller. The configuration
//! is consumed once when the system context is built and is immutable from
//! then on; a partial JSON override can be layered over the defaults with
//! [`SystemConfig::from_json`].

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pins;
use crate::sensors::filter::Channel;

/// Irrigation thresholds and the two safety limits enforced by the state
/// machine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IrrigationLimits {
    /// Start irrigating when moisture drops below this (0-100%).
    pub moisture_low_pct: f32,
    /// Stop irrigating once moisture reaches this (0-100%).
    pub moisture_high_pct: f32,
    /// Maximum continuous runtime of one activation (milliseconds).
    pub max_runtime_ms: u64,
    /// Minimum time between a deactivation and the next activation (milliseconds).
    pub min_interval_ms: u64,
}

impl Default for IrrigationLimits {
    fn default() -> Self {
        Self {
            moisture_low_pct: 30.0,
            moisture_high_pct: 60.0,
            max_runtime_ms: 300_000, // 5 min
            min_interval_ms: 60_000, // 1 min
        }
    }
}

/// Minimum movement of a filtered analog reading, measured against the
/// periodically retaken reference, that counts as a change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeThresholds {
    pub ph: f32,
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

impl Default for ChangeThresholds {
    fn default() -> Self {
        Self {
            ph: 0.2,
            temperature_c: 0.5,
            humidity_pct: 1.0,
        }
    }
}

impl ChangeThresholds {
    pub fn for_channel(&self, channel: Channel) -> f32 {
        match channel {
            Channel::Ph => self.ph,
            Channel::Temperature => self.temperature_c,
            Channel::Humidity => self.humidity_pct,
        }
    }
}

/// Highest GPIO number on the ESP32.
pub const MAX_GPIO: i32 = 39;
/// GPIO 34..=39 have no output driver.
pub const FIRST_INPUT_ONLY_GPIO: i32 = 34;
/// ADC1 channels 0..=9.
pub const ADC1_CHANNELS: u32 = 10;

/// GPIO / ADC assignments. Defaults come from [`crate::pins`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinAssignments {
    pub phosphorus_gpio: i32,
    pub potassium_gpio: i32,
    pub ph_adc_channel: u32,
    pub dht22_gpio: i32,
    pub relay_gpio: i32,
    /// Relay coil polarity: `true` = drive HIGH to energise.
    pub relay_active_high: bool,
    pub indicator_gpio: i32,
}

impl Default for PinAssignments {
    fn default() -> Self {
        Self {
            phosphorus_gpio: pins::PHOSPHORUS_GPIO,
            potassium_gpio: pins::POTASSIUM_GPIO,
            ph_adc_channel: pins::PH_ADC1_CHANNEL,
            dht22_gpio: pins::DHT22_GPIO,
            relay_gpio: pins::IRRIGATION_RELAY_GPIO,
            relay_active_high: true,
            indicator_gpio: pins::INDICATOR_LED_GPIO,
        }
    }
}

impl PinAssignments {
    /// Reject numbers the drivers cannot address.
    pub fn validate(&self) -> Result<()> {
        let inputs = [self.phosphorus_gpio, self.potassium_gpio, self.dht22_gpio];
        let outputs = [self.relay_gpio, self.indicator_gpio];
        if inputs.iter().chain(&outputs).any(|gpio| !(0..=MAX_GPIO).contains(gpio)) {
            return Err(Error::Config("GPIO number outside 0..=39"));
        }
        if outputs.iter().any(|&gpio| gpio >= FIRST_INPUT_ONLY_GPIO) {
            return Err(Error::Config("relay and indicator need output-capable GPIOs"));
        }
        if self.dht22_gpio >= FIRST_INPUT_ONLY_GPIO {
            return Err(Error::Config("DHT22 line must be bidirectional"));
        }
        if self.ph_adc_channel >= ADC1_CHANNELS {
            return Err(Error::Config("pH ADC1 channel outside 0..10"));
        }
        Ok(())
    }
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Acquisition ---
    /// Full acquisition cycle period (milliseconds)
    pub sample_period_ms: u32,
    /// Nutrient-only fast poll period (milliseconds)
    pub nutrient_poll_ms: u32,
    /// Analog samples averaged per pH read
    pub ph_oversample: u8,
    /// Consecutive agreeing samples before a nutrient line changes state
    pub debounce_samples: u8,
    /// Minimum spacing of physical DHT22 reads (milliseconds)
    pub climate_min_interval_ms: u32,

    // --- Filter plausibility (readings outside bypass the filter) ---
    /// Exclusive temperature bounds (Celsius)
    pub temperature_range_c: (f32, f32),
    /// Inclusive humidity bounds (percent)
    pub humidity_range_pct: (f32, f32),
    /// Analog change detection
    pub change_thresholds: ChangeThresholds,

    // --- Irrigation ---
    pub irrigation: IrrigationLimits,

    // --- Shared store ---
    /// Bounded wait for the telemetry store lock (milliseconds)
    pub lock_timeout_ms: u32,

    // --- Telemetry ---
    /// Minimum spacing of JSON telemetry pushes (milliseconds)
    pub telemetry_interval_ms: u32,
    /// Console summary period (milliseconds)
    pub console_interval_ms: u32,

    // --- Tasks ---
    pub acquisition_priority: u8,
    pub acquisition_stack_kb: usize,
    pub distribution_priority: u8,
    pub distribution_stack_kb: usize,
    /// Task watchdog timeout for the acquisition task (milliseconds)
    pub watchdog_timeout_ms: u32,

    // --- Board ---
    pub pins: PinAssignments,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Acquisition
            sample_period_ms: 200, // 5 Hz
            nutrient_poll_ms: 50,  // 20 Hz
            ph_oversample: 3,
            debounce_samples: 2,
            climate_min_interval_ms: 2_000, // DHT22 datasheet

            // Plausibility
            temperature_range_c: (-50.0, 100.0),
            humidity_range_pct: (0.0, 100.0),
            change_thresholds: ChangeThresholds::default(),

            // Irrigation
            irrigation: IrrigationLimits::default(),

            // Store
            lock_timeout_ms: 5,

            // Telemetry
            telemetry_interval_ms: 1_000,
            console_interval_ms: 5_000,

            // Tasks
            acquisition_priority: 10,
            acquisition_stack_kb: 8,
            distribution_priority: 5,
            distribution_stack_kb: 12,
            watchdog_timeout_ms: 5_000,

            pins: PinAssignments::default(),
        }
    }
}

impl SystemConfig {
    /// Parse a (possibly partial) JSON override on top of the defaults and
    /// validate the result.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|_| Error::Config("malformed JSON override"))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject inconsistent parameter sets instead of clamping them.
    pub fn validate(&self) -> Result<()> {
        let irr = &self.irrigation;
        if self.sample_period_ms == 0 || self.nutrient_poll_ms == 0 {
            return Err(Error::Config("acquisition periods must be non-zero"));
        }
        if self.nutrient_poll_ms >= self.sample_period_ms {
            return Err(Error::Config("nutrient poll must be faster than the sample period"));
        }
        if self.ph_oversample == 0 || self.debounce_samples == 0 {
            return Err(Error::Config("sample counts must be non-zero"));
        }
        if !(0.0..=100.0).contains(&irr.moisture_low_pct)
            || !(0.0..=100.0).contains(&irr.moisture_high_pct)
        {
            return Err(Error::Config("moisture thresholds must lie within 0..100%"));
        }
        if irr.moisture_low_pct >= irr.moisture_high_pct {
            return Err(Error::Config("low moisture threshold must be below high threshold"));
        }
        if irr.max_runtime_ms == 0 {
            return Err(Error::Config("irrigation runtime ceiling must be non-zero"));
        }
        if self.lock_timeout_ms == 0 {
            return Err(Error::Config("store lock timeout must be non-zero"));
        }
        if self.temperature_range_c.0 >= self.temperature_range_c.1
            || self.humidity_range_pct.0 >= self.humidity_range_pct.1
        {
            return Err(Error::Config("plausibility ranges must be non-empty"));
        }
        let thresholds = &self.change_thresholds;
        if [thresholds.ph, thresholds.temperature_c, thresholds.humidity_pct]
            .iter()
            .any(|t| t.is_nan() || *t <= 0.0)
        {
            return Err(Error::Config("change thresholds must be positive"));
        }
        if u64::from(self.watchdog_timeout_ms) <= u64::from(self.sample_period_ms) {
            return Err(Error::Config("watchdog timeout must exceed the sample period"));
        }
        self.pins.validate()
    }

    /// Store lock wait as a [`core::time::Duration`].
    pub fn lock_timeout(&self) -> core::time::Duration {
        core::time::Duration::from_millis(u64::from(self.lock_timeout_ms))
    }
}
