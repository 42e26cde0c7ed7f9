//! Integration tests for the ControlService → store → actuator pipeline.
//!
//! Drive the acquisition cycle with a mock probe and check what ends up on
//! the relay, in the event stream and in the shared store.

use std::sync::Arc;

use embassy_sync::signal::Signal;

use crate::mock_hw::{ActuatorCall, MockHardware, RecordingSink};

use soilwatch::app::channels::UpdateSignal;
use soilwatch::app::commands::IrrigationCommand;
use soilwatch::app::context::SystemContext;
use soilwatch::app::events::AppEvent;
use soilwatch::app::service::ControlService;
use soilwatch::config::SystemConfig;
use soilwatch::error::Rejection;
use soilwatch::fsm::{Cause, StateId};
use soilwatch::sensors::filter::{Channel, FILTER_LEN};
use soilwatch::sensors::{ClimateReading, CHANGE_REFERENCE_MS};
use soilwatch::store::SharedTelemetryStore;

const PERIOD: u64 = 200;
const MINUTE: u64 = 60_000;

static NOTIFY: UpdateSignal = Signal::new();

struct Rig {
    svc: ControlService,
    hw: MockHardware,
    sink: RecordingSink,
    store: Arc<SharedTelemetryStore>,
    now: u64,
}

impl Rig {
    fn new() -> Self {
        Self::with(SystemConfig::default(), &NOTIFY)
    }

    fn with(config: SystemConfig, updated: &'static UpdateSignal) -> Self {
        let ctx = SystemContext::new(config).unwrap();
        let mut svc = ControlService::new(&ctx, updated, 0);
        let mut hw = MockHardware::new();
        let mut sink = RecordingSink::new();
        svc.start(&mut hw, &mut sink);
        Self {
            svc,
            hw,
            sink,
            store: ctx.store(),
            now: 0,
        }
    }

    /// One full cycle at the current time, then advance one period.
    fn cycle(&mut self) -> soilwatch::sensors::SensorSnapshot {
        let snap = self.svc.run_cycle(&mut self.hw, self.now, &mut self.sink);
        self.now += PERIOD;
        snap
    }

    /// Enough cycles to flush the filter.
    fn settle(&mut self) {
        for _ in 0..FILTER_LEN {
            self.cycle();
        }
    }

    fn command(&mut self, cmd: IrrigationCommand) -> Result<soilwatch::fsm::Transition, Rejection> {
        self.svc
            .handle_command(cmd, &mut self.hw, self.now, &mut self.sink)
    }

    /// Moisture low long enough to start irrigating.
    fn activate(&mut self) {
        self.hw.set_moisture(25.0);
        self.settle();
        assert_eq!(self.svc.phase(), StateId::Active);
    }
}

// ── Scenario A: pH conversion ─────────────────────────────────

#[test]
fn mid_scale_ph_code_reads_neutral() {
    let mut rig = Rig::new();
    rig.hw.ph_code = 2048;
    rig.settle();
    let published = rig.store.snapshot_all().unwrap().sensors;
    assert!((published.ph - 7.0).abs() <= 0.05, "pH was {}", published.ph);
    assert_eq!(published.read_count, FILTER_LEN as u32);
}

// ── Scenario B: dry soil after the interval → ACTIVE ──────────

#[test]
fn dry_soil_activates_once_interval_elapsed() {
    let mut rig = Rig::new();
    rig.activate();
    rig.command(IrrigationCommand::ManualStop).unwrap();
    let stopped_at = rig.now;

    // Still dry 30 s later: interval not elapsed, stays idle.
    rig.now = stopped_at + MINUTE / 2;
    rig.cycle();
    assert_eq!(rig.svc.phase(), StateId::Idle);
    assert!(!rig.hw.relay);

    // Five minutes after the last deactivation.
    rig.now = stopped_at + 5 * MINUTE;
    rig.cycle();
    assert_eq!(rig.svc.phase(), StateId::Active);
    assert!(rig.hw.relay);

    let last = *rig.sink.transitions().last().unwrap();
    assert_eq!((last.from, last.to, last.cause), (StateId::Idle, StateId::Active, Cause::MoistureLow));

    let published = rig.store.snapshot_all().unwrap().irrigation;
    assert!(published.active);
    assert_eq!(published.activations_today, 1);
}

// ── Scenario C: runtime ceiling ───────────────────────────────

#[test]
fn ceiling_forces_idle_regardless_of_moisture() {
    let mut rig = Rig::new();
    rig.activate();
    let since = rig.svc.irrigation_state().active_since_ms.unwrap();
    assert_eq!(rig.svc.cutoff_deadline_ms(), Some(since + 300_000));

    // Just before the ceiling the soil is still dry and the relay stays on.
    rig.now = since + 299_800;
    rig.cycle();
    assert_eq!(rig.svc.phase(), StateId::Active);

    rig.now = since + 300_000;
    rig.cycle();
    assert_eq!(rig.svc.phase(), StateId::Idle);
    assert!(!rig.hw.relay);
    let last = *rig.sink.transitions().last().unwrap();
    assert_eq!(last.cause, Cause::RuntimeCeiling);

    let state = rig.svc.irrigation_state();
    assert_eq!(state.total_runtime_ms, 300_000);
    assert_eq!(state.activations_today, 1);
}

#[test]
fn fast_poll_enforces_ceiling_between_cycles() {
    let mut rig = Rig::new();
    rig.activate();
    let since = rig.svc.irrigation_state().active_since_ms.unwrap();

    assert!(rig.svc.run_fast_poll(&mut rig.hw, since + 300_050, &mut rig.sink));
    assert_eq!(rig.svc.phase(), StateId::Idle);
    assert!(!rig.hw.relay);
    assert!(!rig.store.snapshot_all().unwrap().irrigation.active);
}

// ── Scenario D: lockout ignores manual toggle ─────────────────

#[test]
fn manual_toggle_ignored_in_lockout() {
    let mut rig = Rig::new();
    rig.activate();
    rig.command(IrrigationCommand::EmergencyStop).unwrap();
    assert_eq!(rig.svc.phase(), StateId::Lockout);
    assert!(!rig.hw.relay);

    let writes = rig.hw.relay_writes();
    assert_eq!(
        rig.command(IrrigationCommand::ManualToggle),
        Err(Rejection::LockedOut)
    );
    assert_eq!(rig.svc.phase(), StateId::Lockout);
    assert_eq!(rig.hw.relay_writes(), writes, "rejection must not touch the relay");
    assert!(rig.sink.events.contains(&AppEvent::CommandRejected {
        command: IrrigationCommand::ManualToggle,
        reason: Rejection::LockedOut,
    }));

    // Dry soil does not wake it either.
    rig.now += 10 * MINUTE;
    rig.settle();
    assert_eq!(rig.svc.phase(), StateId::Lockout);
    assert_eq!(rig.store.snapshot_all().unwrap().irrigation.phase, StateId::Lockout);

    rig.command(IrrigationCommand::Reset).unwrap();
    assert_eq!(rig.svc.phase(), StateId::Idle);
}

#[test]
fn emergency_stop_from_idle_locks_out() {
    let mut rig = Rig::new();
    rig.command(IrrigationCommand::EmergencyStop).unwrap();
    assert_eq!(rig.svc.phase(), StateId::Lockout);
    assert_eq!(
        rig.command(IrrigationCommand::ManualStop),
        Err(Rejection::LockedOut)
    );
}

#[test]
fn reset_outside_lockout_is_rejected() {
    let mut rig = Rig::new();
    assert_eq!(
        rig.command(IrrigationCommand::Reset),
        Err(Rejection::NotLockedOut)
    );
    assert_eq!(rig.svc.phase(), StateId::Idle);
}

// ── Scenario E: missing probe data ────────────────────────────

#[test]
fn missing_climate_holds_previous_values() {
    let mut rig = Rig::new();
    rig.hw.climate = ClimateReading {
        temperature_c: 19.0,
        humidity_pct: 55.0,
    };
    rig.settle();
    let before = rig.store.snapshot_all().unwrap().sensors;

    rig.hw.climate = ClimateReading::MISSING;
    let snap = rig.cycle();
    assert_eq!(snap.temperature_c, before.temperature_c);
    assert_eq!(snap.humidity_pct, before.humidity_pct);
    assert!(!snap.is_filtered(Channel::Temperature));

    let published = rig.store.snapshot_all().unwrap().sensors;
    assert!(!published.temperature_c.is_nan());
    assert_eq!(published.humidity_pct, before.humidity_pct);
    assert_eq!(published.read_count, before.read_count + 1);
}

// ── Ordering, indicator, faults ───────────────────────────────

#[test]
fn irrigation_never_published_ahead_of_sensors() {
    let mut rig = Rig::new();
    rig.hw.set_moisture(20.0);
    for _ in 0..20 {
        rig.cycle();
        let snap = rig.store.snapshot_all().unwrap();
        assert!(snap.irrigation.decision_timestamp_ms <= snap.sensors.timestamp_ms);
    }
    let snap = rig.store.snapshot_all().unwrap();
    assert_eq!(snap.irrigation.decision_timestamp_ms, snap.sensors.timestamp_ms);
}

#[test]
fn indicator_lit_while_active_and_blinks_in_lockout() {
    let mut rig = Rig::new();
    rig.activate();
    assert!(rig.hw.indicator);

    rig.command(IrrigationCommand::EmergencyStop).unwrap();
    rig.hw.calls.clear();
    for _ in 0..4 {
        rig.cycle();
    }
    let history = rig.hw.indicator_history();
    assert_eq!(history.len(), 4);
    assert!(history.windows(2).all(|w| w[0] != w[1]), "{history:?}");
}

#[test]
fn stuck_relay_is_counted() {
    let mut rig = Rig::new();
    rig.hw.relay_stuck = true;
    rig.hw.set_moisture(25.0);
    rig.settle();
    assert!(rig.svc.relay_faults() > 0);
    assert!(rig.hw.calls.contains(&ActuatorCall::SetIrrigation(true)));
}

#[test]
fn nutrient_edge_published_by_fast_poll() {
    let mut rig = Rig::new();
    rig.cycle();
    assert!(!rig.svc.run_fast_poll(&mut rig.hw, rig.now + 50, &mut rig.sink));

    rig.hw.nutrients.phosphorus = true;
    assert!(rig.svc.run_fast_poll(&mut rig.hw, rig.now + 100, &mut rig.sink));
    let sensors = rig.store.snapshot_all().unwrap().sensors;
    assert!(sensors.phosphorus);
    assert!(!sensors.potassium);
    assert_eq!(sensors.timestamp_ms, rig.now + 100);
    assert!(matches!(
        rig.sink.events.last(),
        Some(AppEvent::NutrientChanged(flags)) if flags.phosphorus
    ));
}

#[test]
fn each_cycle_signals_newest_version() {
    static UPDATED: UpdateSignal = Signal::new();
    let mut rig = Rig::with(SystemConfig::default(), &UPDATED);
    UPDATED.reset();
    rig.cycle();
    let version = UPDATED.try_take().unwrap();
    assert_eq!(version, rig.store.snapshot_all().unwrap().version);
    assert!(UPDATED.try_take().is_none());
}

#[test]
fn custom_thresholds_are_honoured() {
    let mut config = SystemConfig::default();
    config.irrigation.moisture_low_pct = 40.0;
    config.irrigation.moisture_high_pct = 70.0;
    let mut rig = Rig::with(config, &NOTIFY);

    rig.hw.set_moisture(38.0);
    rig.settle();
    assert_eq!(rig.svc.phase(), StateId::Active);

    rig.hw.set_moisture(65.0);
    rig.settle();
    assert_eq!(rig.svc.phase(), StateId::Active, "below the high threshold");

    rig.hw.set_moisture(72.0);
    rig.settle();
    assert_eq!(rig.svc.phase(), StateId::Idle);
    assert_eq!(
        rig.sink.transitions().last().map(|t| t.cause),
        Some(Cause::MoistureRestored)
    );
}

#[test]
fn analog_step_is_reported_and_signalled() {
    static UPDATED: UpdateSignal = Signal::new();
    let mut rig = Rig::with(SystemConfig::default(), &UPDATED);
    rig.settle();

    // Retake the change reference on steady readings.
    rig.now += CHANGE_REFERENCE_MS;
    rig.cycle();
    rig.sink.events.clear();
    UPDATED.reset();

    // 45 % → 47 % after one cycle at 55 %, past the default 1 % threshold.
    rig.hw.set_moisture(55.0);
    rig.cycle();
    let changes: Vec<_> = rig
        .sink
        .events
        .iter()
        .filter(|e| matches!(e, AppEvent::AnalogChanged { .. }))
        .copied()
        .collect();
    assert_eq!(
        changes,
        vec![AppEvent::AnalogChanged {
            channel: Channel::Humidity,
            value: 47.0
        }]
    );

    let published = rig.store.snapshot_all().unwrap();
    assert_eq!(UPDATED.try_take(), Some(published.version));
    assert_eq!(published.sensors.humidity_pct, 47.0);

    // Steady again: nothing further to report.
    rig.hw.set_moisture(47.0);
    rig.sink.events.clear();
    rig.cycle();
    assert!(!rig
        .sink
        .events
        .iter()
        .any(|e| matches!(e, AppEvent::AnalogChanged { .. })));
}
