//! SoilWatch firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fsm;
pub mod irrigation;
pub mod safety;
pub mod scheduler;
pub mod store;
pub mod telemetry;
pub mod tasks;

pub mod pins;

// Hardware-facing modules; the real implementations are guarded by cfg
// attributes inside and fall back to in-memory simulation on the host.
pub mod adapters;
pub mod drivers;
pub mod sensors;
