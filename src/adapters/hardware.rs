//! Hardware adapter. Bridges the soil probes, relay and indicator to the
//! port traits.
//!
//! Owns every driver the acquisition task touches and implements
//! [`SoilProbePort`], [`IrrigationActuator`] and [`SystemProbe`]. Because
//! this one adapter is moved into the acquisition task, the relay pin has
//! exactly one writer.

use crate::app::ports::{IrrigationActuator, SoilProbePort, SystemProbe};
use crate::config::SystemConfig;
use crate::diagnostics::{HealthMonitor, SystemHealth};
use crate::drivers::gpio::{GpioInput, GpioOutput};
use crate::drivers::indicator::Indicator;
use crate::drivers::relay::RelayDriver;
use crate::sensors::climate::ClimateProbe;
use crate::sensors::nutrients::NutrientInput;
use crate::sensors::ph::PhProbe;
use crate::sensors::{ClimateReading, NutrientFlags};

pub struct HardwareAdapter {
    phosphorus: NutrientInput<GpioInput>,
    potassium: NutrientInput<GpioInput>,
    ph: PhProbe,
    climate: ClimateProbe,
    relay: RelayDriver<GpioOutput>,
    indicator: Indicator<GpioOutput>,
    health: HealthMonitor,
}

impl HardwareAdapter {
    /// Build all drivers from the configured pin map. Peripherals must
    /// already be initialised (`hw_init::init_peripherals`).
    pub fn new(config: &SystemConfig) -> Self {
        let pins = &config.pins;
        Self {
            phosphorus: NutrientInput::new(
                GpioInput::new(pins.phosphorus_gpio),
                config.debounce_samples,
            ),
            potassium: NutrientInput::new(
                GpioInput::new(pins.potassium_gpio),
                config.debounce_samples,
            ),
            ph: PhProbe::new(pins.ph_adc_channel, config.ph_oversample),
            climate: ClimateProbe::new(pins.dht22_gpio, u64::from(config.climate_min_interval_ms)),
            relay: RelayDriver::new(GpioOutput::new(pins.relay_gpio), pins.relay_active_high),
            indicator: Indicator::new(GpioOutput::new(pins.indicator_gpio)),
            health: HealthMonitor::new(),
        }
    }
}

impl SoilProbePort for HardwareAdapter {
    fn read_nutrients(&mut self) -> NutrientFlags {
        NutrientFlags {
            phosphorus: self.phosphorus.sample(),
            potassium: self.potassium.sample(),
        }
    }

    fn read_ph_raw(&mut self) -> u16 {
        self.ph.read_raw()
    }

    fn read_climate(&mut self, now_ms: u64) -> ClimateReading {
        self.climate.read(now_ms)
    }
}

impl IrrigationActuator for HardwareAdapter {
    fn set_irrigation(&mut self, on: bool) {
        self.relay.set(on);
    }

    fn is_irrigating(&mut self) -> bool {
        self.relay.is_energized()
    }

    fn set_indicator(&mut self, on: bool) {
        self.indicator.set(on);
    }
}

impl SystemProbe for HardwareAdapter {
    fn sample_health(&mut self, uptime_ms: u64) -> SystemHealth {
        self.health.collect(uptime_ms)
    }
}
