//! Shared telemetry store.
//!
//! The only mutable object shared between the acquisition task and the
//! distribution task. It holds three disjoint regions, each written by
//! exactly one producer:
//!
//! | Region     | Producer                         |
//! |------------|----------------------------------|
//! | sensors    | `SensorAcquisition` (via service) |
//! | irrigation | `IrrigationController`           |
//! | health     | `HealthMonitor`                  |
//!
//! Every lock hold is a plain field copy: no formatting, no I/O. Lock
//! acquisition is bounded by `lock_timeout`; a writer that times out drops
//! its publish (the previous value stays visible), a reader that times out
//! gets `StoreError::LockTimeout` and serves its last good snapshot.

use core::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, TryLockError};
use std::time::{Duration, Instant};

use log::warn;

use crate::diagnostics::SystemHealth;
use crate::error::StoreError;
use crate::irrigation::IrrigationState;
use crate::sensors::SensorSnapshot;

/// Immutable composite copied out of the store under one lock hold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SharedTelemetrySnapshot {
    /// Bumped on every successful publish.
    pub version: u64,
    pub sensors: SensorSnapshot,
    pub irrigation: IrrigationState,
    pub health: SystemHealth,
}

/// Drop / timeout counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreCounters {
    pub dropped_writes: u32,
    pub read_timeouts: u32,
}

pub struct SharedTelemetryStore {
    cell: Mutex<SharedTelemetrySnapshot>,
    lock_timeout: Duration,
    dropped_writes: AtomicU32,
    read_timeouts: AtomicU32,
}

impl SharedTelemetryStore {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            cell: Mutex::new(SharedTelemetrySnapshot {
                version: 0,
                sensors: SensorSnapshot::default(),
                irrigation: IrrigationState::default(),
                health: SystemHealth::default(),
            }),
            lock_timeout,
            dropped_writes: AtomicU32::new(0),
            read_timeouts: AtomicU32::new(0),
        }
    }

    /// Replace the sensor region. Returns the new store version.
    pub fn publish_sensor(&self, snapshot: &SensorSnapshot) -> Result<u64, StoreError> {
        let mut cell = self.lock_for_write("sensor")?;
        cell.sensors = *snapshot;
        cell.version += 1;
        Ok(cell.version)
    }

    /// Replace the irrigation region.
    ///
    /// Refused with `OutOfOrder` if the state was decided from a sensor
    /// snapshot newer than the one currently published.
    pub fn publish_irrigation(&self, state: &IrrigationState) -> Result<u64, StoreError> {
        let mut cell = self.lock_for_write("irrigation")?;
        if state.decision_timestamp_ms > cell.sensors.timestamp_ms {
            let published = cell.sensors.timestamp_ms;
            drop(cell);
            self.dropped_writes.fetch_add(1, Ordering::Relaxed);
            warn!(
                "STORE | irrigation publish refused: decided at {}ms, sensors at {}ms",
                state.decision_timestamp_ms, published
            );
            return Err(StoreError::OutOfOrder);
        }
        cell.irrigation = *state;
        cell.version += 1;
        Ok(cell.version)
    }

    /// Replace the health region.
    pub fn publish_health(&self, health: &SystemHealth) -> Result<u64, StoreError> {
        let mut cell = self.lock_for_write("health")?;
        cell.health = *health;
        cell.version += 1;
        Ok(cell.version)
    }

    /// Copy out all three regions atomically.
    pub fn snapshot_all(&self) -> Result<SharedTelemetrySnapshot, StoreError> {
        match self.lock_bounded() {
            Ok(cell) => Ok(*cell),
            Err(e) => {
                self.read_timeouts.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    pub fn counters(&self) -> StoreCounters {
        StoreCounters {
            dropped_writes: self.dropped_writes.load(Ordering::Relaxed),
            read_timeouts: self.read_timeouts.load(Ordering::Relaxed),
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// Hold the store lock, simulating a stalled peer.
    #[cfg(test)]
    pub(crate) fn hold(&self) -> MutexGuard<'_, SharedTelemetrySnapshot> {
        self.cell
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    // ── Internal ──────────────────────────────────────────────────

    fn lock_for_write(
        &self,
        region: &'static str,
    ) -> Result<MutexGuard<'_, SharedTelemetrySnapshot>, StoreError> {
        self.lock_bounded().inspect_err(|e| {
            self.dropped_writes.fetch_add(1, Ordering::Relaxed);
            warn!("STORE | {} publish dropped: {}", region, e);
        })
    }

    /// `try_lock` until the deadline, yielding between attempts.
    ///
    /// A poisoned lock is recovered: every write is a whole-value copy, so
    /// the cell cannot be torn.
    fn lock_bounded(&self) -> Result<MutexGuard<'_, SharedTelemetrySnapshot>, StoreError> {
        let deadline = Instant::now() + self.lock_timeout;
        loop {
            match self.cell.try_lock() {
                Ok(guard) => return Ok(guard),
                Err(TryLockError::Poisoned(poisoned)) => {
                    warn!("STORE | recovered poisoned lock");
                    let guard = poisoned.into_inner();
                    self.cell.clear_poison();
                    return Ok(guard);
                }
                Err(TryLockError::WouldBlock) => {
                    if Instant::now() >= deadline {
                        return Err(StoreError::LockTimeout);
                    }
                    std::thread::yield_now();
                }
            }
        }
    }
}
