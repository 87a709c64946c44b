//! Captured waveform storage.
//!
//! Two slots live inside the controller: `captured` (refreshed on every tick
//! while running) and `frozen` (deep-copied exactly once when the scope
//! stops). Both remember the scale settings in effect at capture time so the
//! frozen trace can be re-navigated after the user changes scales.

use crate::error::{Result, ScopeError};
use crate::scope::scales::{TimeScale, VoltScale};

#[derive(Debug, Clone)]
pub struct Waveform {
    /// Calibrated voltage samples; only `..num_points` are valid.
    pub data: Vec<f32>,
    pub num_points: usize,
    pub storage_depth: usize,
    /// Seconds between consecutive samples.
    pub time_per_sample: f32,
    /// Sample index of the trigger point.
    pub trigger_position: usize,
    /// Time scale in effect when this trace was captured.
    pub time_scale: TimeScale,
    /// Voltage scale in effect when this trace was captured.
    pub volt_scale: VoltScale,
}

impl Waveform {
    pub fn with_depth(storage_depth: usize) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(storage_depth)
            .map_err(|_| ScopeError::AllocationFailed {
                bytes: storage_depth * std::mem::size_of::<f32>(),
            })?;
        data.resize(storage_depth, 0.0);
        Ok(Self {
            data,
            num_points: 0,
            storage_depth,
            time_per_sample: 0.0,
            trigger_position: 0,
            time_scale: TimeScale::DEFAULT,
            volt_scale: VoltScale::DEFAULT,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.num_points == 0
    }

    /// Total captured time in seconds.
    pub fn total_time(&self) -> f32 {
        self.num_points as f32 * self.time_per_sample
    }

    /// Grow storage to `storage_depth` if needed (never shrinks the arena).
    pub fn ensure_depth(&mut self, storage_depth: usize) -> Result<()> {
        if storage_depth > self.data.len() {
            let extra = storage_depth - self.data.len();
            self.data
                .try_reserve_exact(extra)
                .map_err(|_| ScopeError::AllocationFailed {
                    bytes: extra * std::mem::size_of::<f32>(),
                })?;
            self.data.resize(storage_depth, 0.0);
        }
        self.storage_depth = storage_depth;
        Ok(())
    }

    /// Deep-copy another waveform's valid samples and metadata.
    pub fn copy_from(&mut self, other: &Waveform) -> Result<()> {
        self.ensure_depth(other.num_points.max(self.storage_depth))?;
        self.data[..other.num_points].copy_from_slice(&other.data[..other.num_points]);
        self.num_points = other.num_points;
        self.time_per_sample = other.time_per_sample;
        self.trigger_position = other.trigger_position;
        self.time_scale = other.time_scale;
        self.volt_scale = other.volt_scale;
        Ok(())
    }

    /// Sample at a fractional position with linear interpolation between the
    /// two adjacent stored samples. `pos` must be within `0..num_points`.
    pub fn sample_at(&self, pos: f32) -> f32 {
        let base = pos.floor() as usize;
        if base + 1 >= self.num_points {
            return self.data[self.num_points - 1];
        }
        let frac = pos - base as f32;
        let a = self.data[base];
        let b = self.data[base + 1];
        a + (b - a) * frac
    }
}
