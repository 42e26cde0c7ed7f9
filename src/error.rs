//! Unified error types for the SoilWatch firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! acquisition loop's error handling uniform. All variants are `Copy` so
//! they can be passed through the state machine and the store without
//! allocation. Nothing in here is fatal: every variant is recovered locally
//! by the caller (hold the prior value, skip the publish, reject the
//! command, or refuse to emit a truncated payload).

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A probe could not be read or returned implausible data.
    Sensor(SensorError),
    /// The shared telemetry store refused a read or write.
    Store(StoreError),
    /// The irrigation state machine refused a transition.
    Irrigation(Rejection),
    /// A telemetry payload did not fit its output buffer.
    Format(FormatError),
    /// Peripheral or task initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be parsed.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Store(e) => write!(f, "store: {e}"),
            Self::Irrigation(e) => write!(f, "irrigation: {e}"),
            Self::Format(e) => write!(f, "format: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The probe did not answer within its protocol timing.
    NoResponse,
    /// The probe answered but the frame checksum did not match.
    ChecksumMismatch,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoResponse => write!(f, "probe did not respond"),
            Self::ChecksumMismatch => write!(f, "probe checksum mismatch"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// The store lock could not be taken within the bounded wait.
    LockTimeout,
    /// An irrigation state was decided from a sensor snapshot newer than
    /// the one currently published.
    OutOfOrder,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LockTimeout => write!(f, "lock wait timed out"),
            Self::OutOfOrder => write!(f, "irrigation state newer than sensor snapshot"),
        }
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

// ---------------------------------------------------------------------------
// Irrigation rejections
// ---------------------------------------------------------------------------

/// Why the irrigation state machine refused a transition.
///
/// Rejections are reported as no-ops: the state and the actuator are left
/// exactly as they were.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Activation requested before the minimum inter-activation interval
    /// has elapsed since the last deactivation.
    IntervalNotElapsed { remaining_ms: u64 },
    /// The controller is locked out; only an operator reset is accepted.
    LockedOut,
    /// A stop was requested while irrigation is not running.
    NotActive,
    /// A reset was requested while the controller is not locked out.
    NotLockedOut,
    /// The requested edge does not exist in the state machine.
    NotPermitted,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IntervalNotElapsed { remaining_ms } => {
                write!(f, "minimum interval not elapsed ({remaining_ms} ms remaining)")
            }
            Self::LockedOut => write!(f, "locked out"),
            Self::NotActive => write!(f, "irrigation not active"),
            Self::NotLockedOut => write!(f, "not locked out"),
            Self::NotPermitted => write!(f, "transition not permitted"),
        }
    }
}

impl From<Rejection> for Error {
    fn from(e: Rejection) -> Self {
        Self::Irrigation(e)
    }
}

// ---------------------------------------------------------------------------
// Formatting errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatError {
    /// The rendered payload needs more room than the output buffer has.
    BufferTooSmall { capacity: usize },
    /// The serializer itself failed.
    Serialize,
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferTooSmall { capacity } => {
                write!(f, "output buffer too small ({capacity} bytes)")
            }
            Self::Serialize => write!(f, "serialization failed"),
        }
    }
}

impl From<FormatError> for Error {
    fn from(e: FormatError) -> Self {
        Self::Format(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_wrap_the_subsystem() {
        assert_eq!(
            Error::from(StoreError::LockTimeout),
            Error::Store(StoreError::LockTimeout)
        );
        assert_eq!(
            Error::from(Rejection::LockedOut),
            Error::Irrigation(Rejection::LockedOut)
        );
    }

    #[test]
    fn display_names_the_subsystem() {
        let e = Error::from(FormatError::BufferTooSmall { capacity: 16 });
        assert_eq!(e.to_string(), "format: output buffer too small (16 bytes)");
        let r = Error::from(Rejection::IntervalNotElapsed { remaining_ms: 1500 });
        assert!(r.to_string().contains("1500 ms remaining"));
    }
}
