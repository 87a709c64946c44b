//! Time and voltage scale tables.
//!
//! Both tables are ordered, immutable `(units-per-division, label)` pairs.
//! The time scale also determines the operating mode, the sampling rate, and
//! the storage depth used while running.

use crate::error::{Result, ScopeError};
use crate::{DISPLAY_WIDTH, GRID_COLS};
use serde::Serialize;

/// Seconds per division, 8 ns/div through 40 s/div. Strictly increasing.
pub const TIME_SCALES: [(f32, &str); 30] = [
    (8e-9, "8ns"),
    (20e-9, "20ns"),
    (40e-9, "40ns"),
    (80e-9, "80ns"),
    (200e-9, "200ns"),
    (400e-9, "400ns"),
    (800e-9, "800ns"),
    (2e-6, "2us"),
    (4e-6, "4us"),
    (8e-6, "8us"),
    (20e-6, "20us"),
    (40e-6, "40us"),
    (80e-6, "80us"),
    (200e-6, "200us"),
    (400e-6, "400us"),
    (800e-6, "800us"),
    (2e-3, "2ms"),
    (4e-3, "4ms"),
    (8e-3, "8ms"),
    (20e-3, "20ms"),
    (40e-3, "40ms"),
    (80e-3, "80ms"),
    (200e-3, "200ms"),
    (400e-3, "400ms"),
    (800e-3, "800ms"),
    (2.0, "2s"),
    (4.0, "4s"),
    (8.0, "8s"),
    (20.0, "20s"),
    (40.0, "40s"),
];

/// Volts per division, 10 mV/div through 5 V/div. Strictly increasing.
pub const VOLT_SCALES: [(f32, &str); 9] = [
    (0.01, "10mV"),
    (0.02, "20mV"),
    (0.05, "50mV"),
    (0.1, "100mV"),
    (0.2, "200mV"),
    (0.5, "500mV"),
    (1.0, "1V"),
    (2.0, "2V"),
    (5.0, "5V"),
];

/// Time scales at or above this imply ROLL mode.
pub const ROLL_THRESHOLD_SECS: f32 = 200e-3;

/// Operating mode, derived from the time scale. `Single` exists for
/// single-shot capture at the UI boundary and is never derived here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OperatingMode {
    Normal,
    Roll,
    Single,
}

/// Validated index into [`TIME_SCALES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct TimeScale(usize);

impl TimeScale {
    pub const COUNT: usize = TIME_SCALES.len();

    /// Default setting at power-on: 2 ms/div.
    pub const DEFAULT: TimeScale = TimeScale(16);

    pub fn new(index: usize) -> Result<Self> {
        if index < Self::COUNT {
            Ok(Self(index))
        } else {
            Err(ScopeError::InvalidArgument("time scale index out of range"))
        }
    }

    pub fn index(self) -> usize {
        self.0
    }

    pub fn seconds_per_div(self) -> f32 {
        TIME_SCALES[self.0].0
    }

    pub fn label(self) -> &'static str {
        TIME_SCALES[self.0].1
    }

    pub fn operating_mode(self) -> OperatingMode {
        if self.seconds_per_div() >= ROLL_THRESHOLD_SECS {
            OperatingMode::Roll
        } else {
            OperatingMode::Normal
        }
    }

    /// Neighbor entry, or `None` at either end of the table.
    pub fn stepped(self, delta: isize) -> Option<Self> {
        let idx = self.0 as isize + delta;
        if (0..Self::COUNT as isize).contains(&idx) {
            Some(Self(idx as usize))
        } else {
            None
        }
    }

    /// Sampling rate tier for this scale. Targets [`DISPLAY_WIDTH`] samples
    /// across the visible window, capped at the converter's practical tiers.
    pub fn sample_rate_hz(self) -> u32 {
        let total_time = self.seconds_per_div() * GRID_COLS as f32;
        let required = DISPLAY_WIDTH as f32 / total_time;

        if required >= 500e3 {
            1_000_000
        } else if required >= 200e3 {
            500_000
        } else if required >= 100e3 {
            200_000
        } else if required >= 50e3 {
            100_000
        } else if required >= 10e3 {
            50_000
        } else if required >= 1e3 {
            10_000
        } else {
            1_000
        }
    }

    /// Storage depth tier: deep memory only pays off at slow scales.
    pub fn storage_depth(self) -> usize {
        let tpd = self.seconds_per_div();
        if tpd <= 800e-9 {
            1024
        } else if tpd <= 80e-6 {
            10_240
        } else if tpd <= 8e-3 {
            51_200
        } else {
            102_400
        }
    }
}

/// Validated index into [`VOLT_SCALES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct VoltScale(usize);

impl VoltScale {
    pub const COUNT: usize = VOLT_SCALES.len();

    /// Default setting at power-on: 1 V/div.
    pub const DEFAULT: VoltScale = VoltScale(6);

    pub fn new(index: usize) -> Result<Self> {
        if index < Self::COUNT {
            Ok(Self(index))
        } else {
            Err(ScopeError::InvalidArgument("volt scale index out of range"))
        }
    }

    pub fn index(self) -> usize {
        self.0
    }

    pub fn volts_per_div(self) -> f32 {
        VOLT_SCALES[self.0].0
    }

    pub fn label(self) -> &'static str {
        VOLT_SCALES[self.0].1
    }

    /// Smallest entry whose volts-per-division is at least `target`, falling
    /// back to the largest entry for signals beyond the table.
    pub fn best_fit(target_volts_per_div: f32) -> Self {
        for (i, (vpd, _)) in VOLT_SCALES.iter().enumerate() {
            if *vpd >= target_volts_per_div {
                return Self(i);
            }
        }
        Self(Self::COUNT - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_table_strictly_increasing() {
        for w in TIME_SCALES.windows(2) {
            assert!(w[0].0 < w[1].0, "{} !< {}", w[0].1, w[1].1);
        }
    }

    #[test]
    fn test_volt_table_strictly_increasing() {
        for w in VOLT_SCALES.windows(2) {
            assert!(w[0].0 < w[1].0, "{} !< {}", w[0].1, w[1].1);
        }
    }

    #[test]
    fn test_index_validation() {
        assert!(TimeScale::new(TimeScale::COUNT - 1).is_ok());
        assert!(TimeScale::new(TimeScale::COUNT).is_err());
        assert!(VoltScale::new(VoltScale::COUNT).is_err());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(TimeScale::DEFAULT.label(), "2ms");
        assert_eq!(VoltScale::DEFAULT.label(), "1V");
    }

    #[test]
    fn test_roll_mode_threshold() {
        for i in 0..TimeScale::COUNT {
            let ts = TimeScale::new(i).unwrap();
            let expected = if ts.seconds_per_div() >= ROLL_THRESHOLD_SECS {
                OperatingMode::Roll
            } else {
                OperatingMode::Normal
            };
            assert_eq!(ts.operating_mode(), expected, "at {}", ts.label());
        }
        // Boundary entry itself rolls.
        let boundary = TIME_SCALES.iter().position(|(s, _)| *s >= ROLL_THRESHOLD_SECS).unwrap();
        assert_eq!(
            TimeScale::new(boundary).unwrap().operating_mode(),
            OperatingMode::Roll
        );
    }

    #[test]
    fn test_sample_rate_monotonic_non_increasing() {
        let mut last = u32::MAX;
        for i in 0..TimeScale::COUNT {
            let rate = TimeScale::new(i).unwrap().sample_rate_hz();
            assert!(rate <= last);
            last = rate;
        }
    }

    #[test]
    fn test_fastest_scale_uses_top_tier() {
        assert_eq!(TimeScale::new(0).unwrap().sample_rate_hz(), 1_000_000);
        assert_eq!(TimeScale::new(TimeScale::COUNT - 1).unwrap().sample_rate_hz(), 1_000);
    }

    #[test]
    fn test_storage_depth_tiers() {
        assert_eq!(TimeScale::new(0).unwrap().storage_depth(), 1024);
        assert_eq!(TimeScale::DEFAULT.storage_depth(), 51_200);
        assert_eq!(
            TimeScale::new(TimeScale::COUNT - 1).unwrap().storage_depth(),
            102_400
        );
    }

    #[test]
    fn test_volt_best_fit() {
        assert_eq!(VoltScale::best_fit(0.1).label(), "100mV");
        assert_eq!(VoltScale::best_fit(0.11).label(), "200mV");
        assert_eq!(VoltScale::best_fit(0.005).label(), "10mV");
        assert_eq!(VoltScale::best_fit(100.0).label(), "5V");
    }

    #[test]
    fn test_stepped_bounds() {
        let first = TimeScale::new(0).unwrap();
        assert!(first.stepped(-1).is_none());
        assert_eq!(first.stepped(1), Some(TimeScale::new(1).unwrap()));
        let last = TimeScale::new(TimeScale::COUNT - 1).unwrap();
        assert!(last.stepped(1).is_none());
    }
}
