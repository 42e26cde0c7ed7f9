//! Function-pointer finite state machine engine for the irrigation valve.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  StateTable                                              │
//! │  ┌─────────┬───────────┬──────────┬──────────────────┐   │
//! │  │ StateId │ on_enter  │ on_exit  │ on_update        │   │
//! │  ├─────────┼───────────┼──────────┼──────────────────┤   │
//! │  │ Idle    │ fn(ctx)   │ -        │ fn(ctx)->Option  │   │
//! │  │ Active  │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option  │   │
//! │  │ Lockout │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option  │   │
//! │  └─────────┴───────────┴──────────┴──────────────────┘   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** state. If
//! it proposes a `(next, cause)` pair, or a command requests one, the
//! engine first asks [`safety::permit`](crate::safety::permit) whether the
//! edge is allowed. Only then does it run `on_exit` for the current state
//! and `on_enter` for the next. The guard lives inside the transition
//! itself, so no caller can reach ACTIVE without passing it.

pub mod context;
pub mod states;

use context::IrrigationContext;
use log::{debug, info};

use crate::error::Rejection;
use crate::safety;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Irrigation states.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Idle = 0,
    Active = 1,
    Lockout = 2,
}

impl StateId {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 3;

    /// Convert an index back to `StateId`. Out-of-range indices map to
    /// `Lockout`, the state that keeps the valve closed.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::Active,
            2 => Self::Lockout,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Lockout
            }
        }
    }

    /// Upper-case wire name used in telemetry.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Active => "ACTIVE",
            Self::Lockout => "LOCKOUT",
        }
    }
}

/// What caused a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cause {
    /// Moisture fell below the low threshold.
    MoistureLow,
    /// Moisture reached the high threshold.
    MoistureRestored,
    /// Continuous runtime hit the ceiling.
    RuntimeCeiling,
    ManualToggle,
    ManualStop,
    EmergencyStop,
    OperatorReset,
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn = fn(&mut IrrigationContext);

/// Per-tick update handler. Returns the proposed edge, if any.
pub type StateUpdateFn = fn(&IrrigationContext) -> Option<(StateId, Cause)>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

/// A completed transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: StateId,
    pub to: StateId,
    pub cause: Cause,
    pub at_ms: u64,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct Fsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    /// Index of the currently active state.
    current: usize,
    /// Time the current state was entered.
    entered_at_ms: u64,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        debug_assert!(
            table.iter().enumerate().all(|(i, s)| s.id as usize == i),
            "state table out of order"
        );
        Self {
            table,
            current: initial as usize,
            entered_at_ms: 0,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    pub fn start(&mut self, ctx: &mut IrrigationContext) {
        info!("FSM starting in state: {}", self.table[self.current].name);
        self.entered_at_ms = ctx.now_ms;
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Evaluate the current state's update handler once.
    ///
    /// A proposed edge the guard refuses is not an error here: the state
    /// simply holds (e.g. dry soil inside the minimum interval).
    pub fn tick(&mut self, ctx: &mut IrrigationContext) -> Option<Transition> {
        let (next, cause) = (self.table[self.current].on_update)(ctx)?;
        match self.transition(next, cause, ctx) {
            Ok(t) => Some(t),
            Err(reason) => {
                debug!(
                    "FSM: {} -> {} held ({})",
                    self.table[self.current].name,
                    self.table[next as usize].name,
                    reason
                );
                None
            }
        }
    }

    /// Request an externally commanded transition.
    pub fn request(
        &mut self,
        next: StateId,
        cause: Cause,
        ctx: &mut IrrigationContext,
    ) -> Result<Transition, Rejection> {
        self.transition(next, cause, ctx)
    }

    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    pub fn entered_at_ms(&self) -> u64 {
        self.entered_at_ms
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(
        &mut self,
        next_id: StateId,
        cause: Cause,
        ctx: &mut IrrigationContext,
    ) -> Result<Transition, Rejection> {
        let from = self.current_state();
        safety::permit(from, next_id, cause, ctx)?;

        let next_idx = next_id as usize;
        info!(
            "FSM transition: {} -> {} ({:?})",
            self.table[self.current].name, self.table[next_idx].name, cause
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.entered_at_ms = ctx.now_ms;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }

        Ok(Transition {
            from,
            to: next_id,
            cause,
            at_ms: ctx.now_ms,
        })
    }
}
