//! Sensor subsystem: individual probes and the acquisition cycle.
//!
//! [`SensorAcquisition`] owns the filter bank and all per-channel history.
//! Each cycle reads the probes through a [`SoilProbePort`], smooths the
//! numeric channels, converts to physical units and produces a fresh
//! [`SensorSnapshot`] that replaces the previous one wholesale.

pub mod climate;
pub mod filter;
pub mod nutrients;
pub mod ph;

use log::info;

use crate::app::ports::SoilProbePort;
use crate::config::SystemConfig;
use filter::{Channel, FilterBank};

// ── Values ────────────────────────────────────────────────────

/// Debounced nutrient presence flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NutrientFlags {
    pub phosphorus: bool,
    pub potassium: bool,
}

/// One environmental probe result. NaN on both fields means the probe did
/// not deliver a reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

impl ClimateReading {
    pub const MISSING: Self = Self {
        temperature_c: f32::NAN,
        humidity_pct: f32::NAN,
    };
}

/// Everything read from the hardware in one cycle, before filtering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorRawSample {
    /// Oversampled pH code, 0..=4095.
    pub ph_code: u16,
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub nutrients: NutrientFlags,
    pub timestamp_ms: u64,
}

/// Filter output for one cycle; still in raw units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilteredSample {
    pub ph_code: f32,
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub nutrients: NutrientFlags,
    pub timestamp_ms: u64,
    /// [`Channel::bit`] set for every channel that bypassed the filter.
    pub unfiltered: u8,
}

/// Physical-unit view published to the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSnapshot {
    /// 0.0..=14.0
    pub ph: f32,
    pub temperature_c: f32,
    /// Relative humidity, 0..=100 %. Also the moisture signal.
    pub humidity_pct: f32,
    pub phosphorus: bool,
    pub potassium: bool,
    /// Monotonic milliseconds at acquisition.
    pub timestamp_ms: u64,
    /// Full acquisition cycles completed.
    pub read_count: u32,
    pub unfiltered: u8,
}

impl SensorSnapshot {
    /// Pure unit conversion of a filtered sample.
    pub fn from_filtered(sample: &FilteredSample, read_count: u32) -> Self {
        Self {
            ph: ph::ph_from_code(sample.ph_code),
            temperature_c: sample.temperature_c,
            humidity_pct: sample.humidity_pct,
            phosphorus: sample.nutrients.phosphorus,
            potassium: sample.nutrients.potassium,
            timestamp_ms: sample.timestamp_ms,
            read_count,
            unfiltered: sample.unfiltered,
        }
    }

    /// Soil moisture used by the irrigation thresholds.
    pub fn moisture_pct(&self) -> f32 {
        self.humidity_pct
    }

    pub fn nutrients(&self) -> NutrientFlags {
        NutrientFlags {
            phosphorus: self.phosphorus,
            potassium: self.potassium,
        }
    }

    pub fn is_filtered(&self, channel: Channel) -> bool {
        self.unfiltered & channel.bit() == 0
    }

    /// Physical value of one analog channel.
    pub fn value(&self, channel: Channel) -> f32 {
        match channel {
            Channel::Ph => self.ph,
            Channel::Temperature => self.temperature_c,
            Channel::Humidity => self.humidity_pct,
        }
    }
}

impl Default for SensorSnapshot {
    fn default() -> Self {
        Self {
            ph: 7.0,
            temperature_c: DEFAULT_TEMPERATURE_C,
            humidity_pct: DEFAULT_HUMIDITY_PCT,
            phosphorus: false,
            potassium: false,
            timestamp_ms: 0,
            read_count: 0,
            unfiltered: 0,
        }
    }
}

/// Held until the probe delivers its first valid reading.
const DEFAULT_TEMPERATURE_C: f32 = 25.0;
const DEFAULT_HUMIDITY_PCT: f32 = 50.0;
/// Mid-scale code, pH 7.
const DEFAULT_PH_CODE: f32 = 2048.0;

/// How long a change-detection reference stays valid before it is retaken.
pub const CHANGE_REFERENCE_MS: u64 = 5_000;

/// Values [`SensorAcquisition::changed`] compares against.
struct ChangeReference {
    values: [f32; Channel::COUNT],
    taken_at_ms: Option<u64>,
}

// ── Acquisition cycle ─────────────────────────────────────────

pub struct SensorAcquisition {
    filters: FilterBank,
    temperature_range: (f32, f32),
    humidity_range: (f32, f32),
    last_valid_temperature: f32,
    last_valid_humidity: f32,
    last_raw: Option<SensorRawSample>,
    last: SensorSnapshot,
    read_count: u32,
    reference: ChangeReference,
}

impl SensorAcquisition {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            filters: FilterBank::new([DEFAULT_PH_CODE, DEFAULT_TEMPERATURE_C, DEFAULT_HUMIDITY_PCT]),
            temperature_range: config.temperature_range_c,
            humidity_range: config.humidity_range_pct,
            last_valid_temperature: DEFAULT_TEMPERATURE_C,
            last_valid_humidity: DEFAULT_HUMIDITY_PCT,
            last_raw: None,
            last: SensorSnapshot::default(),
            read_count: 0,
            reference: ChangeReference {
                values: [0.0; Channel::COUNT],
                taken_at_ms: None,
            },
        }
    }

    /// Run one full read → filter → convert pass.
    ///
    /// Never fails: a missing climate reading holds the previous valid
    /// value for that channel.
    pub fn cycle(&mut self, probe: &mut impl SoilProbePort, now_ms: u64) -> SensorSnapshot {
        let nutrients = probe.read_nutrients();
        let ph_code = probe.read_ph_raw();
        let climate = probe.read_climate(now_ms);

        let raw = SensorRawSample {
            ph_code,
            temperature_c: climate.temperature_c,
            humidity_pct: climate.humidity_pct,
            nutrients,
            timestamp_ms: now_ms,
        };
        let filtered = self.filter(&raw);
        self.filters.advance();

        self.log_nutrient_edges(nutrients);
        self.read_count = self.read_count.wrapping_add(1);
        self.last_raw = Some(raw);
        self.last = SensorSnapshot::from_filtered(&filtered, self.read_count);
        self.last
    }

    /// Re-check only the nutrient lines. Returns an updated snapshot when a
    /// flag changed, `None` otherwise.
    pub fn poll_nutrients(
        &mut self,
        probe: &mut impl SoilProbePort,
        now_ms: u64,
    ) -> Option<SensorSnapshot> {
        let nutrients = probe.read_nutrients();
        if nutrients == self.last.nutrients() {
            return None;
        }
        self.log_nutrient_edges(nutrients);
        self.last = SensorSnapshot {
            phosphorus: nutrients.phosphorus,
            potassium: nutrients.potassium,
            timestamp_ms: now_ms,
            ..self.last
        };
        Some(self.last)
    }

    /// Whether `channel` moved by more than `threshold` since the reference.
    ///
    /// The reference is retaken from the latest snapshot once it is older
    /// than [`CHANGE_REFERENCE_MS`]; that call reports no change. A reported
    /// change moves that channel's reference to the new value so the same
    /// step is reported once.
    pub fn changed(&mut self, channel: Channel, threshold: f32, now_ms: u64) -> bool {
        let fresh = self
            .reference
            .taken_at_ms
            .is_some_and(|t| now_ms.saturating_sub(t) <= CHANGE_REFERENCE_MS);
        if !fresh {
            self.reference = ChangeReference {
                values: [Channel::Ph, Channel::Temperature, Channel::Humidity]
                    .map(|c| self.last.value(c)),
                taken_at_ms: Some(now_ms),
            };
            return false;
        }

        let current = self.last.value(channel);
        let reference = &mut self.reference.values[channel as usize];
        if (current - *reference).abs() > threshold {
            *reference = current;
            true
        } else {
            false
        }
    }

    fn filter(&mut self, raw: &SensorRawSample) -> FilteredSample {
        let mut unfiltered = 0u8;

        let ph_code = self.filters.apply(Channel::Ph, f32::from(raw.ph_code));

        let (lo, hi) = self.temperature_range;
        let temperature_c = if raw.temperature_c.is_nan() {
            unfiltered |= Channel::Temperature.bit();
            self.last_valid_temperature
        } else if raw.temperature_c > lo && raw.temperature_c < hi {
            let t = self.filters.apply(Channel::Temperature, raw.temperature_c);
            self.last_valid_temperature = t;
            t
        } else {
            unfiltered |= Channel::Temperature.bit();
            raw.temperature_c
        };

        let (lo, hi) = self.humidity_range;
        let humidity_pct = if raw.humidity_pct.is_nan() {
            unfiltered |= Channel::Humidity.bit();
            self.last_valid_humidity
        } else if (lo..=hi).contains(&raw.humidity_pct) {
            let h = self.filters.apply(Channel::Humidity, raw.humidity_pct);
            self.last_valid_humidity = h;
            h
        } else {
            unfiltered |= Channel::Humidity.bit();
            raw.humidity_pct
        };

        FilteredSample {
            ph_code,
            temperature_c,
            humidity_pct,
            nutrients: raw.nutrients,
            timestamp_ms: raw.timestamp_ms,
            unfiltered,
        }
    }

    fn log_nutrient_edges(&self, now: NutrientFlags) {
        let before = self.last.nutrients();
        if now.phosphorus != before.phosphorus {
            info!(
                "NUTRIENT | phosphorus {}",
                if now.phosphorus { "present" } else { "absent" }
            );
        }
        if now.potassium != before.potassium {
            info!(
                "NUTRIENT | potassium {}",
                if now.potassium { "present" } else { "absent" }
            );
        }
    }

    pub fn last_snapshot(&self) -> SensorSnapshot {
        self.last
    }

    pub fn last_raw(&self) -> Option<SensorRawSample> {
        self.last_raw
    }

    pub fn read_count(&self) -> u32 {
        self.read_count
    }

    pub fn cadence_violations(&self) -> u32 {
        self.filters.cadence_violations()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeProbe {
        nutrients: NutrientFlags,
        ph_code: u16,
        climate: ClimateReading,
    }

    impl SoilProbePort for FakeProbe {
        fn read_nutrients(&mut self) -> NutrientFlags {
            self.nutrients
        }
        fn read_ph_raw(&mut self) -> u16 {
            self.ph_code
        }
        fn read_climate(&mut self, _now_ms: u64) -> ClimateReading {
            self.climate
        }
    }

    fn probe(t: f32, h: f32) -> FakeProbe {
        FakeProbe {
            nutrients: NutrientFlags::default(),
            ph_code: 2048,
            climate: ClimateReading {
                temperature_c: t,
                humidity_pct: h,
            },
        }
    }

    #[test]
    fn steady_inputs_converge() {
        let mut acq = SensorAcquisition::new(&SystemConfig::default());
        let mut p = probe(20.0, 40.0);
        let mut snap = SensorSnapshot::default();
        for i in 0..filter::FILTER_LEN as u64 {
            snap = acq.cycle(&mut p, i * 200);
        }
        assert!((snap.temperature_c - 20.0).abs() < 1e-4);
        assert!((snap.humidity_pct - 40.0).abs() < 1e-4);
        assert!((snap.ph - 7.0).abs() < 0.05);
        assert_eq!(snap.read_count, filter::FILTER_LEN as u32);
        assert_eq!(snap.timestamp_ms, 800);
    }

    #[test]
    fn nan_holds_previous_valid_value() {
        let mut acq = SensorAcquisition::new(&SystemConfig::default());
        let mut p = probe(22.0, 45.0);
        let good = acq.cycle(&mut p, 0);

        p.climate = ClimateReading::MISSING;
        let held = acq.cycle(&mut p, 200);
        assert_eq!(held.temperature_c, good.temperature_c);
        assert_eq!(held.humidity_pct, good.humidity_pct);
        assert!(!held.is_filtered(Channel::Temperature));
        assert!(!held.is_filtered(Channel::Humidity));
        assert!(held.is_filtered(Channel::Ph));
    }

    #[test]
    fn implausible_value_bypasses_filter() {
        let mut acq = SensorAcquisition::new(&SystemConfig::default());
        let mut p = probe(120.0, 50.0);
        let snap = acq.cycle(&mut p, 0);
        assert_eq!(snap.temperature_c, 120.0);
        assert!(!snap.is_filtered(Channel::Temperature));

        // The spike did not enter the rolling buffer.
        p.climate.temperature_c = 25.0;
        let snap = acq.cycle(&mut p, 200);
        assert!((snap.temperature_c - 25.0).abs() < 1e-4);
    }

    #[test]
    fn temperature_bounds_are_exclusive() {
        for edge in [-50.0, 100.0] {
            let mut acq = SensorAcquisition::new(&SystemConfig::default());
            let snap = acq.cycle(&mut probe(edge, 45.0), 0);
            assert!(!snap.is_filtered(Channel::Temperature), "{edge} was filtered");
            assert_eq!(snap.temperature_c, edge);
        }
        let mut acq = SensorAcquisition::new(&SystemConfig::default());
        let snap = acq.cycle(&mut probe(-49.9, 45.0), 0);
        assert!(snap.is_filtered(Channel::Temperature));
    }

    #[test]
    fn humidity_bounds_are_inclusive() {
        for edge in [0.0, 100.0] {
            let mut acq = SensorAcquisition::new(&SystemConfig::default());
            let snap = acq.cycle(&mut probe(22.0, edge), 0);
            assert!(snap.is_filtered(Channel::Humidity), "{edge} bypassed");
            // One new slot against four seed slots of 50 %.
            assert!((snap.humidity_pct - (edge + 4.0 * 50.0) / 5.0).abs() < 1e-4);
        }
    }

    #[test]
    fn implausible_humidity_stays_out_of_the_window() {
        let mut acq = SensorAcquisition::new(&SystemConfig::default());
        let mut p = probe(22.0, 120.0);
        let snap = acq.cycle(&mut p, 0);
        assert_eq!(snap.humidity_pct, 120.0);
        assert!(!snap.is_filtered(Channel::Humidity));

        // The 120 % slot would pull this to 63.
        p.climate.humidity_pct = 45.0;
        let mut snap = acq.cycle(&mut p, 200);
        assert!(snap.is_filtered(Channel::Humidity));
        assert!((snap.humidity_pct - 49.0).abs() < 1e-4, "got {}", snap.humidity_pct);
        for i in 2..=filter::FILTER_LEN as u64 {
            snap = acq.cycle(&mut p, i * 200);
        }
        assert!((snap.humidity_pct - 45.0).abs() < 1e-4, "got {}", snap.humidity_pct);
    }

    #[test]
    fn analog_change_measured_against_reference() {
        let mut acq = SensorAcquisition::new(&SystemConfig::default());
        let mut p = probe(22.0, 40.0);
        for i in 0..filter::FILTER_LEN as u64 {
            acq.cycle(&mut p, i * 200);
        }
        // First call only takes the reference.
        assert!(!acq.changed(Channel::Humidity, 1.0, 800));

        // 40 → 42 after one cycle at 50 %.
        p.climate.humidity_pct = 50.0;
        acq.cycle(&mut p, 1_000);
        assert!(acq.changed(Channel::Humidity, 1.0, 1_000));
        assert!(!acq.changed(Channel::Humidity, 1.0, 1_000), "reported twice");
        assert!(!acq.changed(Channel::Humidity, 5.0, 1_000));
        assert!(!acq.changed(Channel::Ph, 0.1, 1_000));

        // Past the refresh window the reference is retaken, no change.
        acq.cycle(&mut p, 1_200);
        let later = 800 + CHANGE_REFERENCE_MS + 1;
        assert!(!acq.changed(Channel::Humidity, 1.0, later));
        assert!(!acq.changed(Channel::Humidity, 1.0, later + 200));
    }

    #[test]
    fn fast_poll_reports_only_changes() {
        let mut acq = SensorAcquisition::new(&SystemConfig::default());
        let mut p = probe(22.0, 45.0);
        let base = acq.cycle(&mut p, 0);
        assert!(acq.poll_nutrients(&mut p, 50).is_none());

        p.nutrients.potassium = true;
        let snap = acq.poll_nutrients(&mut p, 100).unwrap();
        assert!(snap.potassium);
        assert_eq!(snap.timestamp_ms, 100);
        assert_eq!(snap.read_count, base.read_count);
        assert!(acq.poll_nutrients(&mut p, 150).is_none());
    }
}
