//! Signal measurements computed from a captured waveform.
//!
//! A single pass tracks min, max, sum of squares, and zero-crossing count
//! (sign changes relative to 0 V, distinct from the mean-relative crossings
//! used by auto-adjust). Frequency is estimated from crossing pairs rather
//! than spectral analysis.

use crate::acquisition::adc::{DISPLAY_VOLTAGE_MAX, DISPLAY_VOLTAGE_MIN};
use crate::scope::waveform::Waveform;
use serde::Serialize;

/// Margin beyond the instrument range before measurements are declared
/// invalid. Guards against misconfigured scale math producing nonsense.
const RANGE_MARGIN_VOLTS: f32 = 5.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Measurements {
    /// Estimated frequency in Hz; 0.0 when fewer than two crossings exist.
    pub freq_hz: f32,
    pub vmax: f32,
    pub vmin: f32,
    pub vpp: f32,
    pub vrms: f32,
    /// False when the waveform fell outside the instrument's physical range;
    /// callers should display placeholders instead of the numbers.
    pub valid: bool,
}

/// Compute measurements over the waveform's valid samples. Returns `None`
/// when the waveform is empty.
pub(crate) fn compute(waveform: &Waveform) -> Option<Measurements> {
    if waveform.is_empty() {
        return None;
    }

    let samples = &waveform.data[..waveform.num_points];
    let mut vmax = samples[0];
    let mut vmin = samples[0];
    let mut sum_squares = 0.0f64;
    let mut zero_crossings = 0usize;
    let mut last_sign = 0i8;

    for &v in samples {
        if v > vmax {
            vmax = v;
        }
        if v < vmin {
            vmin = v;
        }
        sum_squares += (v as f64) * (v as f64);

        let sign: i8 = if v >= 0.0 { 1 } else { -1 };
        if last_sign != 0 && sign != last_sign {
            zero_crossings += 1;
        }
        last_sign = sign;
    }

    if vmax > DISPLAY_VOLTAGE_MAX + RANGE_MARGIN_VOLTS
        || vmin < DISPLAY_VOLTAGE_MIN - RANGE_MARGIN_VOLTS
    {
        tracing::warn!(vmax, vmin, "measurements outside instrument range, marking invalid");
        return Some(Measurements::default());
    }

    let vrms = (sum_squares / waveform.num_points as f64).sqrt() as f32;
    let freq_hz = if zero_crossings >= 2 {
        let periods = zero_crossings as f32 / 2.0;
        periods / waveform.total_time()
    } else {
        0.0
    };

    Some(Measurements {
        freq_hz,
        vmax,
        vmin,
        vpp: vmax - vmin,
        vrms,
        valid: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::scales::{TimeScale, VoltScale};
    use approx::assert_relative_eq;

    fn waveform_from(data: Vec<f32>, time_per_sample: f32) -> Waveform {
        let num_points = data.len();
        Waveform {
            storage_depth: num_points,
            num_points,
            data,
            time_per_sample,
            trigger_position: num_points / 2,
            time_scale: TimeScale::DEFAULT,
            volt_scale: VoltScale::DEFAULT,
        }
    }

    fn sine(freq_hz: f32, amplitude: f32, offset: f32, rate_hz: f32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| {
                offset + amplitude * (std::f32::consts::TAU * freq_hz * i as f32 / rate_hz).sin()
            })
            .collect()
    }

    #[test]
    fn test_empty_waveform() {
        let wf = waveform_from(vec![], 1e-3);
        assert!(compute(&wf).is_none());
    }

    #[test]
    fn test_sine_round_trip() {
        // 1 kHz sine, amplitude 1 V, 50 kSa/s, 8 full periods.
        let rate = 50_000.0;
        let wf = waveform_from(sine(1000.0, 1.0, 0.0, rate, 400), 1.0 / rate);
        let m = compute(&wf).unwrap();

        assert!(m.valid);
        assert_relative_eq!(m.vpp, 2.0, epsilon = 0.01);
        assert_relative_eq!(m.vrms, std::f32::consts::FRAC_1_SQRT_2, epsilon = 0.01);
        assert!((950.0..=1050.0).contains(&m.freq_hz), "freq {}", m.freq_hz);
    }

    #[test]
    fn test_dc_has_no_frequency() {
        let wf = waveform_from(vec![1.5; 1000], 1e-5);
        let m = compute(&wf).unwrap();
        assert!(m.valid);
        assert_eq!(m.freq_hz, 0.0);
        assert_relative_eq!(m.vpp, 0.0);
        assert_relative_eq!(m.vrms, 1.5, epsilon = 1e-4);
    }

    #[test]
    fn test_out_of_range_marks_invalid() {
        let wf = waveform_from(vec![0.0, 120.0, -3.0], 1e-3);
        let m = compute(&wf).unwrap();
        assert!(!m.valid);
        assert_eq!(m.vpp, 0.0);

        let wf = waveform_from(vec![0.0, -120.0], 1e-3);
        assert!(!compute(&wf).unwrap().valid);
    }

    #[test]
    fn test_within_margin_stays_valid() {
        let wf = waveform_from(vec![-54.0, 54.0], 1e-3);
        assert!(compute(&wf).unwrap().valid);
    }

    #[test]
    fn test_vmax_vmin_track_extremes() {
        let wf = waveform_from(vec![0.5, -1.25, 3.0, 2.0], 1e-3);
        let m = compute(&wf).unwrap();
        assert_relative_eq!(m.vmax, 3.0);
        assert_relative_eq!(m.vmin, -1.25);
        assert_relative_eq!(m.vpp, 4.25);
    }
}
