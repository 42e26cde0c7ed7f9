//! Acquisition task wake-up handling: cadence, command draining, overruns
//! and cutoff-driven deadlines.

use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

use crate::mock_hw::{ManualClock, MockHardware, RecordingSink};

use soilwatch::app::channels::{submit_command, CommandChannel, UpdateSignal};
use soilwatch::app::commands::IrrigationCommand;
use soilwatch::app::context::SystemContext;
use soilwatch::app::events::AppEvent;
use soilwatch::config::SystemConfig;
use soilwatch::fsm::StateId;
use soilwatch::tasks::acquisition::AcquisitionTask;

type Task = AcquisitionTask<MockHardware, ManualClock, RecordingSink>;

fn make_task(
    commands: &'static CommandChannel,
    updated: &'static UpdateSignal,
) -> (Task, ManualClock) {
    let ctx = SystemContext::new(SystemConfig::default()).unwrap();
    let clock = ManualClock::at(0);
    let mut task = AcquisitionTask::new(
        &ctx,
        MockHardware::new(),
        clock.clone(),
        RecordingSink::new(),
        commands,
        updated,
    );
    task.start();
    (task, clock)
}

#[test]
fn first_wakeup_runs_a_cycle_then_polls() {
    static COMMANDS: CommandChannel = Channel::new();
    static UPDATED: UpdateSignal = Signal::new();
    let (mut task, clock) = make_task(&COMMANDS, &UPDATED);

    assert_eq!(task.step(), 50);
    assert_eq!(task.service().cycles(), 1);

    for t in [50, 100, 150] {
        clock.set(t);
        assert_eq!(task.step(), t + 50);
    }
    assert_eq!(task.service().cycles(), 1, "polls do not run full cycles");

    clock.set(200);
    task.step();
    assert_eq!(task.service().cycles(), 2);
}

#[test]
fn queued_commands_are_executed_on_next_wakeup() {
    static COMMANDS: CommandChannel = Channel::new();
    static UPDATED: UpdateSignal = Signal::new();
    let (mut task, clock) = make_task(&COMMANDS, &UPDATED);
    task.step();

    submit_command(&COMMANDS, IrrigationCommand::EmergencyStop).unwrap();
    submit_command(&COMMANDS, IrrigationCommand::ManualToggle).unwrap();
    clock.set(50);
    task.step();

    assert_eq!(task.service().phase(), StateId::Lockout);
    assert!(task.sink().events.iter().any(|e| matches!(
        e,
        AppEvent::CommandRejected {
            command: IrrigationCommand::ManualToggle,
            ..
        }
    )));
    assert!(COMMANDS.is_empty());
}

#[test]
fn late_wakeup_reports_overrun() {
    static COMMANDS: CommandChannel = Channel::new();
    static UPDATED: UpdateSignal = Signal::new();
    let (mut task, clock) = make_task(&COMMANDS, &UPDATED);
    task.step();

    clock.set(730);
    task.step();
    assert!(task
        .sink()
        .events
        .contains(&AppEvent::CycleOverrun { missed: 2 }));
    assert_eq!(task.scheduler().overruns(), 2);
    assert_eq!(task.service().cycles(), 2, "missed cycles are not replayed");
}

#[test]
fn cutoff_wakeup_stops_irrigation_on_time() {
    static COMMANDS: CommandChannel = Channel::new();
    static UPDATED: UpdateSignal = Signal::new();
    let config = SystemConfig {
        // Polls rarely so the cutoff is the nearest deadline.
        sample_period_ms: 10_000,
        nutrient_poll_ms: 5_000,
        watchdog_timeout_ms: 30_000,
        ..SystemConfig::default()
    };
    let ctx = SystemContext::new(config).unwrap();
    let clock = ManualClock::at(0);
    let mut task = AcquisitionTask::new(
        &ctx,
        MockHardware::new(),
        clock.clone(),
        RecordingSink::new(),
        &COMMANDS,
        &UPDATED,
    );
    task.start();
    task.step();

    submit_command(&COMMANDS, IrrigationCommand::ManualToggle).unwrap();
    clock.set(1_000);
    task.step();
    assert_eq!(task.service().phase(), StateId::Active);
    assert!(task.hw().relay);

    // Step through deadlines until the relay drops.
    let cutoff = 1_000 + 300_000;
    let mut wakeups = 0;
    while task.service().phase() == StateId::Active {
        let deadline = task.step();
        assert!(deadline <= cutoff, "deadline {deadline} overshoots the cutoff");
        clock.set(deadline);
        wakeups += 1;
        assert!(wakeups < 1_000);
    }
    assert!(!task.hw().relay);
    assert!(task.service().irrigation_state().last_deactivation_ms.unwrap() <= cutoff);
}
