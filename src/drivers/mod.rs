//! Actuator drivers, hardware initialisation, and task helpers.

pub mod gpio;
pub mod hw_init;
pub mod indicator;
pub mod relay;
pub mod task_pin;
pub mod watchdog;
