//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the orchestration for the SoilWatch controller:
//! the acquisition/irrigation cycle, operator commands and the inter-task
//! channels. All interaction with hardware happens through **port traits**
//! defined in [`ports`], keeping this layer fully testable without real
//! peripherals.

pub mod channels;
pub mod commands;
pub mod context;
pub mod events;
pub mod ports;
pub mod service;
