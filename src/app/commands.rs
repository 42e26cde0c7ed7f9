//! Inbound operator commands.
//!
//! Submitted from any task through
//! [`submit_command`](super::channels::submit_command) and executed by the
//! acquisition task, which is the only owner of the irrigation controller.

/// Commands an operator (web UI, serial console) can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrrigationCommand {
    /// Start irrigating from IDLE, stop from ACTIVE.
    ManualToggle,
    /// Stop an active irrigation.
    ManualStop,
    /// Stop immediately and lock out until an operator reset.
    EmergencyStop,
    /// Leave LOCKOUT.
    Reset,
}

impl IrrigationCommand {
    pub fn name(self) -> &'static str {
        match self {
            Self::ManualToggle => "manual-toggle",
            Self::ManualStop => "manual-stop",
            Self::EmergencyStop => "emergency-stop",
            Self::Reset => "reset",
        }
    }
}
