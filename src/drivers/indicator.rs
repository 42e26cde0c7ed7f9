//! Single-colour indicator LED.
//!
//! Steady on while irrigating, toggled once per acquisition cycle while
//! locked out, off otherwise.

use embedded_hal::digital::OutputPin;

pub struct Indicator<P> {
    pin: P,
    lit: bool,
}

impl<P: OutputPin> Indicator<P> {
    pub fn new(pin: P) -> Self {
        let mut led = Self { pin, lit: true };
        led.set(false);
        led
    }

    pub fn set(&mut self, on: bool) {
        if on == self.lit {
            return;
        }
        let res = if on { self.pin.set_high() } else { self.pin.set_low() };
        if res.is_ok() {
            self.lit = on;
        }
    }

    pub fn toggle(&mut self) {
        self.set(!self.lit);
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }
}
