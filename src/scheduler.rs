//! Acquisition cadence.
//!
//! Decides, per wake-up of the acquisition task, whether a full cycle
//! and/or a nutrient fast poll is due. Deadlines are kept on a fixed grid
//! anchored at start-up; after an overrun the grid is resynchronised and
//! the missed periods are counted, never replayed back-to-back.
//!
//! ```text
//!  t ─┬────┬────┬────┬────┬────┬────┬────┬────┬──▶
//!     C    p    p    p    C    p    p    p    C      C = full cycle (200 ms)
//!                                                    p = nutrient poll (50 ms)
//! ```

use log::warn;

/// What to run on this wake-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Due {
    /// Full acquisition cycle.
    pub cycle: bool,
    /// Nutrient-only poll. Never set together with `cycle`: the full cycle
    /// reads the nutrient lines itself.
    pub poll: bool,
    /// Whole cycle periods skipped since the previous wake-up.
    pub missed: u32,
}

pub struct CycleScheduler {
    sample_period_ms: u64,
    poll_period_ms: u64,
    next_cycle_ms: u64,
    next_poll_ms: u64,
    overruns: u32,
}

impl CycleScheduler {
    /// First full cycle is due immediately.
    pub fn new(sample_period_ms: u32, poll_period_ms: u32, now_ms: u64) -> Self {
        let poll_period_ms = u64::from(poll_period_ms.max(1));
        Self {
            sample_period_ms: u64::from(sample_period_ms.max(1)),
            poll_period_ms,
            next_cycle_ms: now_ms,
            next_poll_ms: now_ms + poll_period_ms,
            overruns: 0,
        }
    }

    pub fn due(&mut self, now_ms: u64) -> Due {
        let mut due = Due::default();

        if now_ms >= self.next_cycle_ms {
            let late = now_ms - self.next_cycle_ms;
            let missed = late / self.sample_period_ms;
            if missed > 0 {
                let missed = u32::try_from(missed).unwrap_or(u32::MAX);
                warn!("SCHED | acquisition overrun, {} cycle(s) skipped", missed);
                self.overruns = self.overruns.saturating_add(missed);
                due.missed = missed;
            }
            self.next_cycle_ms += (late / self.sample_period_ms + 1) * self.sample_period_ms;
            due.cycle = true;
        }

        if now_ms >= self.next_poll_ms {
            let late = now_ms - self.next_poll_ms;
            self.next_poll_ms += (late / self.poll_period_ms + 1) * self.poll_period_ms;
            due.poll = !due.cycle;
        }

        due
    }

    /// Next instant the task must wake: the earlier of the next poll, the
    /// next cycle and the irrigation cutoff.
    pub fn next_deadline_ms(&self, cutoff_ms: Option<u64>) -> u64 {
        let grid = self.next_cycle_ms.min(self.next_poll_ms);
        cutoff_ms.map_or(grid, |c| grid.min(c))
    }

    /// Total skipped cycle periods.
    pub fn overruns(&self) -> u32 {
        self.overruns
    }
}
