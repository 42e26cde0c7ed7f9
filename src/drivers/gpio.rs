//! `embedded-hal` pin wrappers over the raw `hw_init` primitives.
//!
//! Drivers above this layer are generic over the `embedded-hal` traits so
//! integration tests can hand them in-memory pins instead.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin, StatefulOutputPin};

use crate::drivers::hw_init;

/// A configured input line (pull-up already enabled by `hw_init`).
#[derive(Debug)]
pub struct GpioInput {
    gpio: i32,
}

impl GpioInput {
    pub fn new(gpio: i32) -> Self {
        Self { gpio }
    }
}

impl ErrorType for GpioInput {
    type Error = Infallible;
}

impl InputPin for GpioInput {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(hw_init::gpio_read(self.gpio))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!hw_init::gpio_read(self.gpio))
    }
}

/// A configured output line. Readback goes through the pad level register.
#[derive(Debug)]
pub struct GpioOutput {
    gpio: i32,
}

impl GpioOutput {
    pub fn new(gpio: i32) -> Self {
        Self { gpio }
    }
}

impl ErrorType for GpioOutput {
    type Error = Infallible;
}

impl OutputPin for GpioOutput {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        hw_init::gpio_write(self.gpio, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        hw_init::gpio_write(self.gpio, true);
        Ok(())
    }
}

impl StatefulOutputPin for GpioOutput {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(hw_init::gpio_read(self.gpio))
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!hw_init::gpio_read(self.gpio))
    }
}
