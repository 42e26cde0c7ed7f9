//! Inter-task channels.
//!
//! `embassy-sync` primitives bridge the synchronous acquisition loop and
//! the async distribution task without heap allocation.
//!
//! ```text
//! ┌──────────────┐  IrrigationCommand  ┌──────────────────┐
//! │  operators   │───────────────────▶│ Acquisition task │
//! └──────────────┘                     │  (sync, APP core)│
//!                                      └────────┬─────────┘
//!                                               │ store version
//!                                               ▼
//!                                      ┌──────────────────┐
//!                                      │ Distribution task│
//!                                      │ (async, PRO core)│
//!                                      └──────────────────┘
//! ```
//!
//! Tasks take `&'static` references so tests can declare their own
//! instances instead of sharing the process-wide ones.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use log::warn;

use super::commands::IrrigationCommand;

/// Command channel depth.
pub const COMMAND_DEPTH: usize = 4;

pub type CommandChannel = Channel<CriticalSectionRawMutex, IrrigationCommand, COMMAND_DEPTH>;

/// Latest published store version. Only the newest value matters, so a
/// `Signal` (overwrite) rather than a queue.
pub type UpdateSignal = Signal<CriticalSectionRawMutex, u64>;

/// Operator commands: any task → acquisition task.
pub static COMMAND_CHANNEL: CommandChannel = Channel::new();

/// "Store changed" notification: acquisition task → distribution task.
pub static TELEMETRY_UPDATED: UpdateSignal = Signal::new();

/// Queue `command` for the acquisition task. Hands the command back if the
/// channel is full.
pub fn submit_command(
    channel: &CommandChannel,
    command: IrrigationCommand,
) -> Result<(), IrrigationCommand> {
    channel.try_send(command).map_err(|_| {
        warn!("COMMAND | channel full, dropping {}", command.name());
        command
    })
}

/// Next pending command, if any.
pub fn try_recv_command(channel: &CommandChannel) -> Option<IrrigationCommand> {
    channel.try_receive().ok()
}
