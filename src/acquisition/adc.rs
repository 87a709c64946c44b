//! Analog-input peripheral abstraction and raw-code calibration.
//!
//! The sampler drives whatever implements [`AdcDevice`]: real hardware on an
//! embedded target, or [`crate::acquisition::sim::SimAdc`] on a workstation.
//! Conversion from raw codes to volts is a pure linear map over the
//! peripheral's documented range and lives here so both the sampler and the
//! tests agree on the calibration constants.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Highest raw code produced by the 12-bit converter.
pub const ADC_RAW_MAX: u16 = 4095;

/// Peripheral input range in volts (raw 0 maps to the minimum).
pub const ADC_VOLTAGE_MIN: f32 = 0.0;
/// Peripheral midpoint in volts (raw 2048).
pub const ADC_VOLTAGE_MIDPOINT: f32 = 1.65;
/// Peripheral input range in volts (raw 4095 maps to the maximum).
pub const ADC_VOLTAGE_MAX: f32 = 3.3;

/// Instrument display range. Probes with external attenuation can report
/// voltages well beyond the converter's own input range.
pub const DISPLAY_VOLTAGE_MIN: f32 = -50.0;
pub const DISPLAY_VOLTAGE_MAX: f32 = 50.0;

/// Channel/range configuration applied at init and on every rate change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdcConfig {
    /// Input channel number.
    pub channel: u8,
    /// Converter resolution in bits.
    pub bit_width: u8,
    /// Input attenuation in dB (12 dB covers the full 0-3.3 V range).
    pub attenuation_db: f32,
    /// Requested sampling rate in Hz.
    pub sample_rate_hz: u32,
}

impl Default for AdcConfig {
    fn default() -> Self {
        Self {
            channel: 6,
            bit_width: 12,
            attenuation_db: 12.0,
            sample_rate_hz: 50_000,
        }
    }
}

/// One-shot analog sampling peripheral.
///
/// `configure` is called only during sampler init and rate changes;
/// `read_sample` is called continuously from the sampling thread and must
/// return promptly.
pub trait AdcDevice: Send {
    fn configure(&mut self, config: &AdcConfig) -> Result<()>;

    fn read_sample(&mut self) -> Result<u16>;
}

/// Convert a raw code to volts.
///
/// Exact at both endpoints: code 0 yields [`ADC_VOLTAGE_MIN`] and code
/// [`ADC_RAW_MAX`] yields [`ADC_VOLTAGE_MAX`]. No averaging or filtering.
pub fn raw_to_voltage(code: u16) -> f32 {
    let code = code.min(ADC_RAW_MAX);
    ADC_VOLTAGE_MIN + (code as f32 / ADC_RAW_MAX as f32) * (ADC_VOLTAGE_MAX - ADC_VOLTAGE_MIN)
}

/// Convert a voltage back to the nearest raw code, clamping to the
/// peripheral's input range. Used by the simulated device.
pub fn voltage_to_raw(volts: f32) -> u16 {
    let clamped = volts.clamp(ADC_VOLTAGE_MIN, ADC_VOLTAGE_MAX);
    let span = ADC_VOLTAGE_MAX - ADC_VOLTAGE_MIN;
    ((clamped - ADC_VOLTAGE_MIN) / span * ADC_RAW_MAX as f32).round() as u16
}
