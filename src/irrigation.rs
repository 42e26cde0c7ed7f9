//! Irrigation controller.
//!
//! Owns the irrigation FSM and is the only code that drives the relay. Each
//! entry point advances the controller clock, lets the FSM act, and then
//! brings the actuator in line with the commanded output before returning,
//! so the published state and the relay never disagree across a call.

use log::{error, info, warn};

use crate::app::commands::IrrigationCommand;
use crate::app::ports::IrrigationActuator;
use crate::config::IrrigationLimits;
use crate::error::Rejection;
use crate::fsm::context::IrrigationContext;
use crate::fsm::{states, Cause, Fsm, StateId, Transition};
use crate::sensors::SensorSnapshot;

/// Length of the activation-count day.
pub const DAY_MS: u64 = 86_400_000;

/// Published view of the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IrrigationState {
    pub phase: StateId,
    pub active: bool,
    pub active_since_ms: Option<u64>,
    pub current_runtime_ms: u64,
    pub total_runtime_ms: u64,
    pub last_activation_ms: Option<u64>,
    pub last_deactivation_ms: Option<u64>,
    pub activations_today: u32,
    /// Activations since boot; never reset by the day rollover.
    pub activations_total: u32,
    pub moisture_low_pct: f32,
    pub moisture_high_pct: f32,
    /// Timestamp of the sensor snapshot this state was decided from.
    pub decision_timestamp_ms: u64,
    /// Moisture of that snapshot.
    pub decision_moisture_pct: f32,
    /// Controller clock when the state was taken.
    pub observed_at_ms: u64,
}

impl Default for IrrigationState {
    fn default() -> Self {
        let limits = IrrigationLimits::default();
        Self {
            phase: StateId::Idle,
            active: false,
            active_since_ms: None,
            current_runtime_ms: 0,
            total_runtime_ms: 0,
            last_activation_ms: None,
            last_deactivation_ms: None,
            activations_today: 0,
            activations_total: 0,
            moisture_low_pct: limits.moisture_low_pct,
            moisture_high_pct: limits.moisture_high_pct,
            decision_timestamp_ms: 0,
            decision_moisture_pct: 0.0,
            observed_at_ms: 0,
        }
    }
}

pub struct IrrigationController {
    fsm: Fsm,
    ctx: IrrigationContext,
    decision_timestamp_ms: u64,
    decision_moisture_pct: f32,
    relay_faults: u32,
}

impl IrrigationController {
    pub fn new(limits: IrrigationLimits, now_ms: u64) -> Self {
        let mut ctx = IrrigationContext::new(limits, now_ms);
        let mut fsm = Fsm::new(states::build_state_table(), StateId::Idle);
        fsm.start(&mut ctx);
        Self {
            fsm,
            decision_timestamp_ms: 0,
            decision_moisture_pct: ctx.moisture_pct,
            ctx,
            relay_faults: 0,
        }
    }

    /// Force the actuator to the commanded (released) output at boot.
    pub fn start(&mut self, actuator: &mut impl IrrigationActuator) {
        actuator.set_irrigation(self.ctx.relay_on);
        self.verify_actuator(actuator);
    }

    /// Threshold evaluation against a fresh sensor snapshot.
    pub fn evaluate(
        &mut self,
        snapshot: &SensorSnapshot,
        now_ms: u64,
        actuator: &mut impl IrrigationActuator,
    ) -> Option<Transition> {
        self.advance_clock(now_ms);
        self.ctx.moisture_pct = snapshot.moisture_pct();
        self.decision_timestamp_ms = snapshot.timestamp_ms;
        self.decision_moisture_pct = snapshot.moisture_pct();

        let t = self.fsm.tick(&mut self.ctx);
        self.sync_actuator(actuator);
        t
    }

    /// Stop a running activation that has reached the runtime ceiling.
    ///
    /// Needs no sensor data, so it is safe to call from any wake-up.
    pub fn enforce_ceiling(
        &mut self,
        now_ms: u64,
        actuator: &mut impl IrrigationActuator,
    ) -> Option<Transition> {
        self.advance_clock(now_ms);
        if self.fsm.current_state() != StateId::Active
            || self.ctx.current_runtime_ms() < self.ctx.limits.max_runtime_ms
        {
            return None;
        }
        warn!(
            "IRRIGATION | runtime ceiling {}ms reached",
            self.ctx.limits.max_runtime_ms
        );
        let t = self
            .fsm
            .request(StateId::Idle, Cause::RuntimeCeiling, &mut self.ctx)
            .ok();
        self.sync_actuator(actuator);
        t
    }

    /// Execute an operator command. A rejection leaves everything as it was.
    pub fn command(
        &mut self,
        command: IrrigationCommand,
        now_ms: u64,
        actuator: &mut impl IrrigationActuator,
    ) -> Result<Transition, Rejection> {
        self.advance_clock(now_ms);
        let current = self.fsm.current_state();
        let (to, cause) = match command {
            IrrigationCommand::ManualToggle if current == StateId::Active => {
                (StateId::Idle, Cause::ManualToggle)
            }
            IrrigationCommand::ManualToggle => (StateId::Active, Cause::ManualToggle),
            IrrigationCommand::ManualStop => (StateId::Idle, Cause::ManualStop),
            IrrigationCommand::EmergencyStop => (StateId::Lockout, Cause::EmergencyStop),
            IrrigationCommand::Reset => (StateId::Idle, Cause::OperatorReset),
        };
        let res = self.fsm.request(to, cause, &mut self.ctx);
        if let Err(reason) = res {
            warn!("IRRIGATION | {} rejected: {}", command.name(), reason);
        }
        self.sync_actuator(actuator);
        res
    }

    pub fn phase(&self) -> StateId {
        self.fsm.current_state()
    }

    /// When the running activation must be cut off, if one is running.
    pub fn cutoff_deadline_ms(&self) -> Option<u64> {
        self.ctx
            .record
            .active_since_ms
            .map(|since| since.saturating_add(self.ctx.limits.max_runtime_ms))
    }

    pub fn relay_faults(&self) -> u32 {
        self.relay_faults
    }

    /// Snapshot of the controller as of its last clock update.
    pub fn state(&self) -> IrrigationState {
        let phase = self.fsm.current_state();
        let record = &self.ctx.record;
        IrrigationState {
            phase,
            active: phase == StateId::Active,
            active_since_ms: record.active_since_ms,
            current_runtime_ms: self.ctx.current_runtime_ms(),
            total_runtime_ms: record.total_runtime_ms,
            last_activation_ms: record.last_activation_ms,
            last_deactivation_ms: record.last_deactivation_ms,
            activations_today: record.activations_today,
            activations_total: record.activations_total,
            moisture_low_pct: self.ctx.limits.moisture_low_pct,
            moisture_high_pct: self.ctx.limits.moisture_high_pct,
            decision_timestamp_ms: self.decision_timestamp_ms,
            decision_moisture_pct: self.decision_moisture_pct,
            observed_at_ms: self.ctx.now_ms,
        }
    }

    // ── Internal ──────────────────────────────────────────────────

    fn advance_clock(&mut self, now_ms: u64) {
        // Time never runs backwards for the guard.
        self.ctx.now_ms = self.ctx.now_ms.max(now_ms);

        let record = &mut self.ctx.record;
        let elapsed = self.ctx.now_ms.saturating_sub(record.day_start_ms);
        if elapsed >= DAY_MS {
            record.day_start_ms += (elapsed / DAY_MS) * DAY_MS;
            info!(
                "IRRIGATION | day rollover, {} activations yesterday",
                record.activations_today
            );
            record.activations_today = 0;
        }
    }

    fn sync_actuator(&mut self, actuator: &mut impl IrrigationActuator) {
        if actuator.is_irrigating() != self.ctx.relay_on {
            actuator.set_irrigation(self.ctx.relay_on);
        }
        self.verify_actuator(actuator);
    }

    fn verify_actuator(&mut self, actuator: &mut impl IrrigationActuator) {
        let actual = actuator.is_irrigating();
        if actual != self.ctx.relay_on {
            self.relay_faults = self.relay_faults.saturating_add(1);
            error!(
                "RELAY | readback mismatch: commanded {}, reads {}",
                self.ctx.relay_on, actual
            );
        }
    }
}
