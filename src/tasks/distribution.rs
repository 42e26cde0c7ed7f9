//! Distribution task: async, reactor-driven telemetry pushes.
//!
//! Runs in a dedicated thread using `edge-executor` for cooperative
//! scheduling and `async-io-mini` for reactor-driven timers. Two
//! concurrent futures:
//!
//! 1. **Push** waits on the update signal raised by the acquisition
//!    task, delivers one JSON frame, then holds off for the telemetry
//!    interval. Updates raised meanwhile collapse into the newest version.
//! 2. **Console** pushes one console view every console interval, rotating
//!    Sensors → System → Network → All.
//!
//! ```text
//!  ┌─────────────────────────────────────────────────────┐
//!  │  Distribution thread (PRO core)                     │
//!  │  ┌───────────────────────────────────────────────┐  │
//!  │  │  edge_executor::LocalExecutor                 │  │
//!  │  │  ┌──────────────────┐  ┌──────────────────┐   │  │
//!  │  │  │ Push             │  │ Console          │   │  │
//!  │  │  │ wake-on-signal   │  │ 5 s ⏱            │   │  │
//!  │  │  └──────────────────┘  └──────────────────┘   │  │
//!  │  └───────────────────────────────────────────────┘  │
//!  └─────────────────────────────────────────────────────┘
//! ```

use core::cell::RefCell;
use core::time::Duration;
use std::io;
use std::rc::Rc;
use std::thread::JoinHandle;

use log::{info, warn};

use crate::app::channels::UpdateSignal;
use crate::app::context::SystemContext;
use crate::app::ports::TelemetrySink;
use crate::config::SystemConfig;
use crate::drivers::task_pin::{spawn_on_core, Core};
use crate::error::Error;
use crate::telemetry::{ConsoleView, TelemetryDistributor};

const CONSOLE_ROTATION: [ConsoleView; 4] = [
    ConsoleView::Sensors,
    ConsoleView::System,
    ConsoleView::Network,
    ConsoleView::All,
];

pub struct DistributionTask<T> {
    distributor: TelemetryDistributor,
    sink: T,
    updated: &'static UpdateSignal,
    telemetry_interval: Duration,
    console_interval: Duration,
    next_view: usize,
    pushed: u32,
}

impl<T: TelemetrySink> DistributionTask<T> {
    pub fn new(ctx: &SystemContext, sink: T, updated: &'static UpdateSignal) -> Self {
        let config = ctx.config();
        Self {
            distributor: TelemetryDistributor::new(ctx.store()),
            sink,
            updated,
            telemetry_interval: Duration::from_millis(u64::from(config.telemetry_interval_ms)),
            console_interval: Duration::from_millis(u64::from(config.console_interval_ms)),
            next_view: 0,
            pushed: 0,
        }
    }

    /// Pull, format and push one JSON frame. Returns the store version it
    /// was rendered from.
    pub fn deliver_once(&mut self) -> Result<u64, Error> {
        let frame = self
            .distributor
            .pull_and_format(ConsoleView::All)
            .inspect_err(|e| warn!("TELEMETRY | frame skipped: {}", e))?;
        self.sink.push_json(&frame);
        self.pushed = self.pushed.wrapping_add(1);
        Ok(frame.version)
    }

    /// Push the next console view in the rotation.
    pub fn console_once(&mut self) -> Result<ConsoleView, Error> {
        let view = CONSOLE_ROTATION[self.next_view];
        let frame = self.distributor.pull_and_format(view)?;
        self.sink.push_console(&frame.console);
        self.next_view = (self.next_view + 1) % CONSOLE_ROTATION.len();
        Ok(view)
    }

    /// JSON frames pushed so far.
    pub fn pushed(&self) -> u32 {
        self.pushed
    }

    pub fn sink(&self) -> &T {
        &self.sink
    }

    /// Drive both loops forever on the calling thread.
    pub fn run(self) {
        let executor: edge_executor::LocalExecutor<'_, 8> = edge_executor::LocalExecutor::new();
        let task = Rc::new(RefCell::new(self));

        executor.spawn(push_loop(task.clone())).detach();
        executor.spawn(console_loop(task)).detach();

        info!("Distribution task started (async, signal-driven)");
        futures_lite::future::block_on(executor.run(core::future::pending::<()>()));
    }
}

type SharedTask<T> = Rc<RefCell<DistributionTask<T>>>;

async fn push_loop<T: TelemetrySink>(task: SharedTask<T>) {
    let (updated, interval) = {
        let t = task.borrow();
        (t.updated, t.telemetry_interval)
    };
    loop {
        let _version = updated.wait().await;
        // Failure already logged; the next update retries.
        let _ = task.borrow_mut().deliver_once();
        async_io_mini::Timer::after(interval).await;
    }
}

async fn console_loop<T: TelemetrySink>(task: SharedTask<T>) {
    let interval = task.borrow().console_interval;
    loop {
        async_io_mini::Timer::after(interval).await;
        if let Err(e) = task.borrow_mut().console_once() {
            warn!("TELEMETRY | console line skipped: {}", e);
        }
    }
}

/// Spawn the distribution task on the PRO core, next to the network stack.
pub fn spawn<T>(task: DistributionTask<T>, config: &SystemConfig) -> io::Result<JoinHandle<()>>
where
    T: TelemetrySink + Send + 'static,
{
    spawn_on_core(
        Core::Pro,
        config.distribution_priority,
        config.distribution_stack_kb,
        "distrib\0",
        move || task.run(),
    )
}
