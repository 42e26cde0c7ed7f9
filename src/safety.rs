//! Irrigation transition guard.
//!
//! Every edge the FSM takes, whether proposed by a state's update handler
//! or requested by an operator command, passes through [`permit`] first.
//! The two hard limits live here:
//!
//! - **Minimum interval**: IDLE → ACTIVE is refused until
//!   `min_interval_ms` has elapsed since the previous activation ended.
//! - **Lockout**: from LOCKOUT the only accepted edge is an operator reset
//!   back to IDLE.
//!
//! The runtime ceiling is enforced by ACTIVE's update handler and by
//! [`IrrigationController::enforce_ceiling`](crate::irrigation::IrrigationController::enforce_ceiling);
//! an edge *out of* ACTIVE is never refused, so the ceiling can always
//! fire.

use log::warn;

use crate::error::Rejection;
use crate::fsm::context::IrrigationContext;
use crate::fsm::{Cause, StateId};

/// Decide whether `from → to` for `cause` is allowed right now.
pub fn permit(
    from: StateId,
    to: StateId,
    cause: Cause,
    ctx: &IrrigationContext,
) -> Result<(), Rejection> {
    match (from, to, cause) {
        // ── Into ACTIVE ───────────────────────────────────────────
        (StateId::Idle, StateId::Active, Cause::MoistureLow | Cause::ManualToggle) => {
            let remaining_ms = ctx.interval_remaining_ms();
            if remaining_ms > 0 {
                return Err(Rejection::IntervalNotElapsed { remaining_ms });
            }
            Ok(())
        }

        // ── Out of ACTIVE ─────────────────────────────────────────
        (
            StateId::Active,
            StateId::Idle,
            Cause::MoistureRestored | Cause::RuntimeCeiling | Cause::ManualStop | Cause::ManualToggle,
        ) => Ok(()),

        // ── Emergency stop ────────────────────────────────────────
        (StateId::Idle | StateId::Active, StateId::Lockout, Cause::EmergencyStop) => {
            warn!("SAFETY | emergency stop from {}", from.as_str());
            Ok(())
        }

        // ── Leaving LOCKOUT ───────────────────────────────────────
        (StateId::Lockout, StateId::Idle, Cause::OperatorReset) => Ok(()),
        (StateId::Lockout, _, _) => Err(Rejection::LockedOut),

        // ── Everything else ───────────────────────────────────────
        (StateId::Idle, StateId::Idle, Cause::ManualStop) => Err(Rejection::NotActive),
        (_, StateId::Idle, Cause::OperatorReset) => Err(Rejection::NotLockedOut),
        _ => Err(Rejection::NotPermitted),
    }
}
