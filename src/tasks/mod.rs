//! The two units of concurrency.
//!
//! | Task           | Core | Priority | Drives                               |
//! |----------------|------|----------|--------------------------------------|
//! | `acquisition`  | APP  | high     | probes, irrigation relay, store writes |
//! | `distribution` | PRO  | low      | store reads, telemetry formatting    |
//!
//! They share nothing but the [`SharedTelemetryStore`](crate::store::SharedTelemetryStore)
//! and the `embassy-sync` primitives in [`crate::app::channels`].

pub mod acquisition;
pub mod distribution;
