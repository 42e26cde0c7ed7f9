//! Concrete state handler functions and table builder.
//!
//! ```text
//!  IDLE ──[moisture < low]──────────────▶ ACTIVE
//!    ▲   ◀──[moisture ≥ high | ceiling | stop]──┘
//!    │                                     │
//!    │        [emergency stop]             │ [emergency stop]
//!    │               ▼                     ▼
//!    └──[reset]── LOCKOUT ◀────────────────┘
//! ```
//!
//! Update handlers only propose edges; the minimum-interval and lockout
//! rules are applied by the engine's guard.

use super::context::IrrigationContext;
use super::{Cause, StateDescriptor, StateId};
use log::{info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0: Idle
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        // Index 1: Active
        StateDescriptor {
            id: StateId::Active,
            name: "Active",
            on_enter: Some(active_enter),
            on_exit: Some(active_exit),
            on_update: active_update,
        },
        // Index 2: Lockout
        StateDescriptor {
            id: StateId::Lockout,
            name: "Lockout",
            on_enter: Some(lockout_enter),
            on_exit: Some(lockout_exit),
            on_update: lockout_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut IrrigationContext) {
    ctx.relay_on = false;
}

fn idle_update(ctx: &IrrigationContext) -> Option<(StateId, Cause)> {
    (ctx.moisture_pct < ctx.limits.moisture_low_pct).then_some((StateId::Active, Cause::MoistureLow))
}

// ═══════════════════════════════════════════════════════════════════════════
//  ACTIVE: relay energised, water flowing
// ═══════════════════════════════════════════════════════════════════════════

fn active_enter(ctx: &mut IrrigationContext) {
    ctx.relay_on = true;
    ctx.record.active_since_ms = Some(ctx.now_ms);
    ctx.record.last_activation_ms = Some(ctx.now_ms);
    info!(
        "ACTIVE: irrigating at {:.1}% moisture (ceiling {}s)",
        ctx.moisture_pct,
        ctx.limits.max_runtime_ms / 1000
    );
}

fn active_exit(ctx: &mut IrrigationContext) {
    let ran = ctx.current_runtime_ms();
    ctx.relay_on = false;
    ctx.record.active_since_ms = None;
    ctx.record.last_deactivation_ms = Some(ctx.now_ms);
    ctx.record.total_runtime_ms = ctx.record.total_runtime_ms.saturating_add(ran);
    ctx.record.activations_today = ctx.record.activations_today.saturating_add(1);
    ctx.record.activations_total = ctx.record.activations_total.saturating_add(1);
    info!("ACTIVE: stopped after {}ms", ran);
}

fn active_update(ctx: &IrrigationContext) -> Option<(StateId, Cause)> {
    // Ceiling first: it applies whatever the moisture reads.
    if ctx.current_runtime_ms() >= ctx.limits.max_runtime_ms {
        warn!(
            "ACTIVE: runtime ceiling {}ms reached, forcing stop",
            ctx.limits.max_runtime_ms
        );
        return Some((StateId::Idle, Cause::RuntimeCeiling));
    }
    if ctx.moisture_pct >= ctx.limits.moisture_high_pct {
        return Some((StateId::Idle, Cause::MoistureRestored));
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  LOCKOUT: valve held closed until an operator reset
// ═══════════════════════════════════════════════════════════════════════════

fn lockout_enter(ctx: &mut IrrigationContext) {
    ctx.relay_on = false;
    warn!("LOCKOUT: irrigation disabled until operator reset");
}

fn lockout_exit(_ctx: &mut IrrigationContext) {
    info!("LOCKOUT: operator reset, resuming threshold control");
}

fn lockout_update(_ctx: &IrrigationContext) -> Option<(StateId, Cause)> {
    None
}
