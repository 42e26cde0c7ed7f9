//! Acquisition task: the high-priority, fixed-period loop.
//!
//! Every wake-up drains pending operator commands, runs whatever the
//! [`CycleScheduler`] says is due, feeds the task watchdog and sleeps
//! until the next deadline (poll grid, cycle grid or irrigation cutoff,
//! whichever comes first).

use std::io;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::app::channels::{try_recv_command, CommandChannel, UpdateSignal};
use crate::app::context::SystemContext;
use crate::app::events::AppEvent;
use crate::app::ports::{Clock, EventSink, IrrigationActuator, SoilProbePort, SystemProbe};
use crate::app::service::ControlService;
use crate::config::SystemConfig;
use crate::drivers::task_pin::{spawn_on_core, Core};
use crate::drivers::watchdog::Watchdog;
use crate::scheduler::CycleScheduler;

pub struct AcquisitionTask<H, K, E> {
    service: ControlService,
    scheduler: CycleScheduler,
    hw: H,
    clock: K,
    sink: E,
    commands: &'static CommandChannel,
}

impl<H, K, E> AcquisitionTask<H, K, E>
where
    H: SoilProbePort + IrrigationActuator + SystemProbe,
    K: Clock,
    E: EventSink,
{
    pub fn new(
        ctx: &SystemContext,
        hw: H,
        clock: K,
        sink: E,
        commands: &'static CommandChannel,
        updated: &'static UpdateSignal,
    ) -> Self {
        let now = clock.now_ms();
        let config = ctx.config();
        Self {
            service: ControlService::new(ctx, updated, now),
            scheduler: CycleScheduler::new(config.sample_period_ms, config.nutrient_poll_ms, now),
            hw,
            clock,
            sink,
            commands,
        }
    }

    /// Bring the relay to a known state and publish the initial state.
    pub fn start(&mut self) {
        self.service.start(&mut self.hw, &mut self.sink);
    }

    /// Handle one wake-up. Returns the deadline for the next one.
    pub fn step(&mut self) -> u64 {
        let now = self.clock.now_ms();

        while let Some(command) = try_recv_command(self.commands) {
            // Rejections are reported through the sink.
            let _ = self
                .service
                .handle_command(command, &mut self.hw, now, &mut self.sink);
        }

        let due = self.scheduler.due(now);
        if due.missed > 0 {
            self.sink.emit(&AppEvent::CycleOverrun { missed: due.missed });
        }

        if due.cycle {
            self.service.run_cycle(&mut self.hw, now, &mut self.sink);
        } else if due.poll {
            self.service.run_fast_poll(&mut self.hw, now, &mut self.sink);
        } else {
            // Woken for the irrigation cutoff.
            self.service.enforce_ceiling(&mut self.hw, now, &mut self.sink);
        }

        self.scheduler
            .next_deadline_ms(self.service.cutoff_deadline_ms())
    }

    /// Run forever.
    pub fn run(mut self, watchdog: &Watchdog) -> ! {
        self.start();
        loop {
            let deadline = self.step();
            watchdog.feed();
            let now = self.clock.now_ms();
            if deadline > now {
                std::thread::sleep(Duration::from_millis(deadline - now));
            }
        }
    }

    pub fn service(&self) -> &ControlService {
        &self.service
    }

    pub fn scheduler(&self) -> &CycleScheduler {
        &self.scheduler
    }

    pub fn hw(&self) -> &H {
        &self.hw
    }

    pub fn hw_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    pub fn sink(&self) -> &E {
        &self.sink
    }
}

/// Spawn the acquisition loop on the APP core.
///
/// The watchdog is subscribed from inside the new task, so it is the
/// acquisition task that gets supervised.
pub fn spawn<H, K, E>(
    task: AcquisitionTask<H, K, E>,
    config: &SystemConfig,
) -> io::Result<JoinHandle<()>>
where
    H: SoilProbePort + IrrigationActuator + SystemProbe + Send + 'static,
    K: Clock + Send + 'static,
    E: EventSink + Send + 'static,
{
    let timeout_ms = config.watchdog_timeout_ms;
    spawn_on_core(
        Core::App,
        config.acquisition_priority,
        config.acquisition_stack_kb,
        "acquire\0",
        move || {
            let watchdog = Watchdog::subscribe(timeout_ms);
            task.run(&watchdog)
        },
    )
}
