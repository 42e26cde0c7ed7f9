//! Control service, the hexagonal core of the acquisition task.
//!
//! [`ControlService`] owns the sensor acquisition pipeline and the
//! irrigation controller, and is the only producer for the shared store.
//! All I/O flows through port traits injected at call sites, so the whole
//! service is testable with mock adapters.
//!
//! ```text
//!  SoilProbePort ──▶ ┌──────────────────────────┐ ──▶ SharedTelemetryStore
//!   SystemProbe ──▶  │      ControlService      │ ──▶ EventSink
//! IrrigationActuator◀│ Acquisition · Irrigation │ ──▶ UpdateSignal
//!                    └──────────────────────────┘
//! ```

use std::sync::Arc;

use log::{debug, info};

use crate::config::ChangeThresholds;
use crate::error::{Rejection, StoreError};
use crate::fsm::{StateId, Transition};
use crate::irrigation::{IrrigationController, IrrigationState};
use crate::sensors::filter::Channel;
use crate::sensors::{SensorAcquisition, SensorSnapshot};
use crate::store::SharedTelemetryStore;

use super::channels::UpdateSignal;
use super::commands::IrrigationCommand;
use super::context::SystemContext;
use super::events::{AppEvent, StoreRegion};
use super::ports::{EventSink, IrrigationActuator, SoilProbePort, SystemProbe};

pub struct ControlService {
    acquisition: SensorAcquisition,
    irrigation: IrrigationController,
    thresholds: ChangeThresholds,
    store: Arc<SharedTelemetryStore>,
    updated: &'static UpdateSignal,
    /// Lockout blink phase, flipped once per full cycle.
    blink: bool,
    cycles: u64,
    /// Newest store version this service produced.
    latest_version: u64,
}

impl ControlService {
    /// Construct the service. Does not touch hardware; call [`start`] next.
    ///
    /// [`start`]: Self::start
    pub fn new(ctx: &SystemContext, updated: &'static UpdateSignal, now_ms: u64) -> Self {
        let config = ctx.config();
        Self {
            acquisition: SensorAcquisition::new(config),
            irrigation: IrrigationController::new(config.irrigation, now_ms),
            thresholds: config.change_thresholds,
            store: ctx.store(),
            updated,
            blink: false,
            cycles: 0,
            latest_version: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Release the relay, publish the initial irrigation state.
    pub fn start(&mut self, hw: &mut impl IrrigationActuator, sink: &mut impl EventSink) {
        self.irrigation.start(hw);
        hw.set_indicator(false);
        self.publish_irrigation(sink);
        sink.emit(&AppEvent::Started(self.irrigation.phase()));
        info!("ControlService started in {:?}", self.irrigation.phase());
    }

    // ── Per-cycle orchestration ───────────────────────────────

    /// One full acquisition cycle: read → filter → publish sensors →
    /// decide → publish irrigation → indicator → notify. Analog channels
    /// that moved past their change threshold are reported on the way.
    ///
    /// Never fails. A dropped sensor publish skips the irrigation publish
    /// for this cycle so readers never see a decision ahead of its input;
    /// the decision itself (and the relay) still goes ahead.
    pub fn run_cycle<H>(&mut self, hw: &mut H, now_ms: u64, sink: &mut impl EventSink) -> SensorSnapshot
    where
        H: SoilProbePort + IrrigationActuator + SystemProbe,
    {
        self.cycles += 1;
        let before = self.acquisition.last_snapshot().nutrients();

        let health = hw.sample_health(now_ms);
        let res = self.store.publish_health(&health);
        self.report(StoreRegion::Health, res, sink);

        let snapshot = self.acquisition.cycle(hw, now_ms);
        if snapshot.nutrients() != before {
            sink.emit(&AppEvent::NutrientChanged(snapshot.nutrients()));
        }
        self.detect_analog_changes(&snapshot, now_ms, sink);
        let sensors_published = self.publish_sensors(&snapshot, sink);

        if let Some(t) = self.irrigation.evaluate(&snapshot, now_ms, hw) {
            sink.emit(&AppEvent::IrrigationTransition(t));
        }
        if sensors_published {
            self.publish_irrigation(sink);
        } else {
            debug!("irrigation publish skipped: sensor publish dropped");
        }

        self.drive_indicator(hw);
        self.notify();
        snapshot
    }

    /// Fast path between full cycles: runtime ceiling, then the nutrient
    /// lines. Returns `true` if anything was published.
    pub fn run_fast_poll<H>(&mut self, hw: &mut H, now_ms: u64, sink: &mut impl EventSink) -> bool
    where
        H: SoilProbePort + IrrigationActuator,
    {
        let mut published = self.enforce_ceiling(hw, now_ms, sink);

        if let Some(snapshot) = self.acquisition.poll_nutrients(hw, now_ms) {
            sink.emit(&AppEvent::NutrientChanged(snapshot.nutrients()));
            published |= self.publish_sensors(&snapshot, sink);
        }

        if published {
            self.notify();
        }
        published
    }

    /// Cut a running activation off at the runtime ceiling. Returns `true`
    /// if the irrigation state was published.
    pub fn enforce_ceiling(
        &mut self,
        hw: &mut impl IrrigationActuator,
        now_ms: u64,
        sink: &mut impl EventSink,
    ) -> bool {
        match self.irrigation.enforce_ceiling(now_ms, hw) {
            Some(t) => {
                sink.emit(&AppEvent::IrrigationTransition(t));
                self.drive_indicator(hw);
                self.publish_irrigation(sink)
            }
            None => false,
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Execute an operator command. Rejections change nothing and are
    /// reported through the sink.
    pub fn handle_command(
        &mut self,
        command: IrrigationCommand,
        hw: &mut impl IrrigationActuator,
        now_ms: u64,
        sink: &mut impl EventSink,
    ) -> Result<Transition, Rejection> {
        match self.irrigation.command(command, now_ms, hw) {
            Ok(t) => {
                sink.emit(&AppEvent::IrrigationTransition(t));
                self.drive_indicator(hw);
                if self.publish_irrigation(sink) {
                    self.notify();
                }
                Ok(t)
            }
            Err(reason) => {
                sink.emit(&AppEvent::CommandRejected { command, reason });
                Err(reason)
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn phase(&self) -> StateId {
        self.irrigation.phase()
    }

    pub fn irrigation_state(&self) -> IrrigationState {
        self.irrigation.state()
    }

    pub fn last_snapshot(&self) -> SensorSnapshot {
        self.acquisition.last_snapshot()
    }

    /// When the running activation must be cut off, if any.
    pub fn cutoff_deadline_ms(&self) -> Option<u64> {
        self.irrigation.cutoff_deadline_ms()
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn relay_faults(&self) -> u32 {
        self.irrigation.relay_faults()
    }

    pub fn cadence_violations(&self) -> u32 {
        self.acquisition.cadence_violations()
    }

    // ── Internal ──────────────────────────────────────────────

    fn publish_sensors(&mut self, snapshot: &SensorSnapshot, sink: &mut impl EventSink) -> bool {
        let res = self.store.publish_sensor(snapshot);
        self.report(StoreRegion::Sensors, res, sink)
    }

    fn publish_irrigation(&mut self, sink: &mut impl EventSink) -> bool {
        let state = self.irrigation.state();
        let res = self.store.publish_irrigation(&state);
        self.report(StoreRegion::Irrigation, res, sink)
    }

    fn report(
        &mut self,
        region: StoreRegion,
        res: Result<u64, StoreError>,
        sink: &mut impl EventSink,
    ) -> bool {
        match res {
            Ok(version) => {
                self.latest_version = self.latest_version.max(version);
                true
            }
            Err(reason) => {
                sink.emit(&AppEvent::PublishDropped { region, reason });
                false
            }
        }
    }

    fn detect_analog_changes(
        &mut self,
        snapshot: &SensorSnapshot,
        now_ms: u64,
        sink: &mut impl EventSink,
    ) {
        for channel in [Channel::Ph, Channel::Temperature, Channel::Humidity] {
            let threshold = self.thresholds.for_channel(channel);
            if self.acquisition.changed(channel, threshold, now_ms) {
                sink.emit(&AppEvent::AnalogChanged {
                    channel,
                    value: snapshot.value(channel),
                });
            }
        }
    }

    /// On while irrigating, blinking while locked out, off otherwise.
    fn drive_indicator(&mut self, hw: &mut impl IrrigationActuator) {
        let lit = match self.irrigation.phase() {
            StateId::Active => true,
            StateId::Lockout => {
                self.blink = !self.blink;
                self.blink
            }
            StateId::Idle => false,
        };
        hw.set_indicator(lit);
    }

    /// Wake the distribution side with the newest store version.
    fn notify(&self) {
        self.updated.signal(self.latest_version);
    }
}
