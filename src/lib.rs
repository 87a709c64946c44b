//! Scopecore - oscilloscope acquisition and processing core
//!
//! Two layers: the acquisition layer ([`acquisition`]) owns the analog
//! peripheral, a sampling thread, and a circular raw-code buffer; the
//! controller layer ([`scope`]) owns scales, offsets, trigger settings,
//! captured and frozen waveforms, display resampling, and measurements.
//!
//! The controller never touches hardware directly and the sampler knows
//! nothing about display geometry.

pub mod acquisition;
pub mod error;
pub mod scope;

pub use acquisition::adc::{raw_to_voltage, voltage_to_raw, AdcConfig, AdcDevice};
pub use acquisition::sampler::{Sampler, TriggerConfig};
pub use acquisition::sim::{SimAdc, SimWaveform};
pub use error::{Result, ScopeError};
pub use scope::core::{CoreState, ScopeCore};
pub use scope::events::{NullEvents, ScopeEvents};
pub use scope::measure::Measurements;
pub use scope::scales::{OperatingMode, TimeScale, VoltScale};
pub use scope::waveform::Waveform;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Horizontal resolution of the display window in pixels.
pub const DISPLAY_WIDTH: usize = 688;

/// Horizontal grid divisions across the display.
pub const GRID_COLS: usize = 16;

/// Vertical grid divisions across the display.
pub const GRID_ROWS: usize = 9;

/// Upper bound on the circular buffer capacity, in samples.
pub const MAX_STORAGE_DEPTH: usize = 128 * 1024;
