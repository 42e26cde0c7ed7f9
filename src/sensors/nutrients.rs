//! Phosphorus / potassium presence inputs.
//!
//! Each line is an active-low contact with the internal pull-up enabled:
//! LOW means the nutrient is present. A line only changes its reported
//! state after `threshold` consecutive samples agree.

use embedded_hal::digital::InputPin;

/// Consecutive-sample debouncer.
#[derive(Debug, Clone, Copy)]
pub struct Debouncer {
    stable: bool,
    run: u8,
    threshold: u8,
}

impl Debouncer {
    pub fn new(initial: bool, threshold: u8) -> Self {
        Self {
            stable: initial,
            run: 0,
            threshold: threshold.max(1),
        }
    }

    /// Feed one raw sample; returns the debounced state.
    pub fn update(&mut self, sample: bool) -> bool {
        if sample == self.stable {
            self.run = 0;
        } else {
            self.run += 1;
            if self.run >= self.threshold {
                self.stable = sample;
                self.run = 0;
            }
        }
        self.stable
    }
}

/// One nutrient presence line.
pub struct NutrientInput<P> {
    pin: P,
    debounce: Debouncer,
}

impl<P: InputPin> NutrientInput<P> {
    pub fn new(pin: P, threshold: u8) -> Self {
        Self {
            pin,
            debounce: Debouncer::new(false, threshold),
        }
    }

    /// Sample the line once and return the debounced presence flag.
    ///
    /// A pin read error counts as "line released" (not present).
    pub fn sample(&mut self) -> bool {
        let present = self.pin.is_low().unwrap_or(false);
        self.debounce.update(present)
    }
}
