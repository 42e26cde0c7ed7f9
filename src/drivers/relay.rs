//! Irrigation relay coil driver.
//!
//! A dumb actuator: the irrigation state machine decides, this driver only
//! translates "water on/off" into the configured coil polarity and reports
//! the level that actually ended up on the pin.
//!
//! ## Dual-target design
//!
//! Generic over `StatefulOutputPin`, so on ESP-IDF it drives a real GPIO
//! via [`GpioOutput`](crate::drivers::gpio::GpioOutput) and on host/test
//! any in-memory pin.

use embedded_hal::digital::StatefulOutputPin;

pub struct RelayDriver<P> {
    pin: P,
    active_high: bool,
}

impl<P: StatefulOutputPin> RelayDriver<P> {
    /// Wrap `pin` and force the relay to the released state.
    pub fn new(pin: P, active_high: bool) -> Self {
        let mut relay = Self { pin, active_high };
        relay.release();
        relay
    }

    pub fn energize(&mut self) {
        self.drive(true);
    }

    pub fn release(&mut self) {
        self.drive(false);
    }

    pub fn set(&mut self, on: bool) {
        self.drive(on);
    }

    /// Whether the coil is energised according to the pin readback.
    ///
    /// A pin that cannot be read back is reported as released.
    pub fn is_energized(&mut self) -> bool {
        match self.pin.is_set_high() {
            Ok(high) => high == self.active_high,
            Err(_) => false,
        }
    }

    fn drive(&mut self, on: bool) {
        let high = on == self.active_high;
        let res = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if res.is_err() {
            log::error!("RELAY | pin write failed (requested {})", if on { "on" } else { "off" });
        }
    }
}
