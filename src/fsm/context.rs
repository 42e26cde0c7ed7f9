//! Mutable context threaded through every FSM handler.
//!
//! The "blackboard": the engine's caller writes the time and the moisture
//! reading before each tick, handlers write the commanded relay output and
//! the activation bookkeeping.

use crate::config::IrrigationLimits;

/// Activation bookkeeping, written only by the ACTIVE enter/exit actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActivationRecord {
    /// Start of the running activation.
    pub active_since_ms: Option<u64>,
    /// Start of the most recent activation.
    pub last_activation_ms: Option<u64>,
    /// End of the most recent activation.
    pub last_deactivation_ms: Option<u64>,
    /// Sum of all completed activations.
    pub total_runtime_ms: u64,
    /// Completed activations since `day_start_ms`.
    pub activations_today: u32,
    pub activations_total: u32,
    pub day_start_ms: u64,
}

pub struct IrrigationContext {
    pub limits: IrrigationLimits,

    // -- Inputs (written before each tick) --
    pub now_ms: u64,
    pub moisture_pct: f32,

    // -- Outputs (written by handlers) --
    /// Commanded relay output.
    pub relay_on: bool,
    pub record: ActivationRecord,
}

impl IrrigationContext {
    pub fn new(limits: IrrigationLimits, now_ms: u64) -> Self {
        Self {
            limits,
            now_ms,
            // Neither threshold trips until the first real reading.
            moisture_pct: (limits.moisture_low_pct + limits.moisture_high_pct) / 2.0,
            relay_on: false,
            record: ActivationRecord {
                day_start_ms: now_ms,
                ..ActivationRecord::default()
            },
        }
    }

    /// Runtime of the current activation, zero when idle.
    pub fn current_runtime_ms(&self) -> u64 {
        self.record
            .active_since_ms
            .map_or(0, |since| self.now_ms.saturating_sub(since))
    }

    /// Milliseconds until another activation is allowed.
    pub fn interval_remaining_ms(&self) -> u64 {
        self.record.last_deactivation_ms.map_or(0, |end| {
            let ready_at = end.saturating_add(self.limits.min_interval_ms);
            ready_at.saturating_sub(self.now_ms)
        })
    }
}
