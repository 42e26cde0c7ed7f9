//! Moving-average smoothing for the numeric channels.
//!
//! One fixed-size circular buffer per channel, all indexed by a single
//! rotating slot that advances once per acquisition cycle so the three
//! channels stay time-aligned. Owned exclusively by the acquisition task.

use log::warn;

/// Slots per channel.
pub const FILTER_LEN: usize = 5;

/// The filtered channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Channel {
    Ph = 0,
    Temperature = 1,
    Humidity = 2,
}

impl Channel {
    pub const COUNT: usize = 3;

    pub fn bit(self) -> u8 {
        1 << self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Ph => "ph",
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
        }
    }
}

pub struct FilterBank<const N: usize = FILTER_LEN> {
    slots: [[f32; N]; Channel::COUNT],
    index: usize,
    /// Channels written at the current index since the last `advance()`.
    applied: u8,
    cadence_violations: u32,
}

impl<const N: usize> FilterBank<N> {
    /// Every slot starts at the channel's seed value so the first outputs
    /// are not dragged towards zero.
    pub fn new(seeds: [f32; Channel::COUNT]) -> Self {
        Self {
            slots: seeds.map(|s| [s; N]),
            index: 0,
            applied: 0,
            cadence_violations: 0,
        }
    }

    /// Write `sample` into the current slot of `channel` and return the
    /// mean of all slots.
    ///
    /// Applying the same channel twice before [`advance`](Self::advance)
    /// overwrites the slot; it is counted and logged since it means the
    /// channel is being sampled faster than the cycle.
    pub fn apply(&mut self, channel: Channel, sample: f32) -> f32 {
        if self.applied & channel.bit() != 0 {
            self.cadence_violations = self.cadence_violations.saturating_add(1);
            warn!("FILTER | {} applied twice in one cycle", channel.name());
        }
        self.applied |= channel.bit();
        let buf = &mut self.slots[channel as usize];
        buf[self.index] = sample;
        buf.iter().sum::<f32>() / N as f32
    }

    /// Current mean of `channel` without writing a sample.
    pub fn mean(&self, channel: Channel) -> f32 {
        self.slots[channel as usize].iter().sum::<f32>() / N as f32
    }

    /// Move to the next slot. Called once per cycle after every channel has
    /// been applied.
    pub fn advance(&mut self) {
        self.index = (self.index + 1) % N;
        self.applied = 0;
    }

    pub fn cadence_violations(&self) -> u32 {
        self.cadence_violations
    }
}
