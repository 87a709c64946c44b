//! E2E tests for the acquisition layer.
//!
//! Runs the real sampling thread against a simulated analog front end and
//! verifies snapshot ordering, freezing on stop, and restart behavior.

use scopecore::{Sampler, ScopeError, SimAdc, SimWaveform};
use std::time::{Duration, Instant};

const VOLTS_PER_CODE: f32 = 3.3 / 4095.0;

fn wait_for_data(sampler: &Sampler) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !sampler.has_new_data() {
        assert!(Instant::now() < deadline, "sampler produced no data in 5s");
        std::thread::sleep(Duration::from_millis(5));
    }
}

/// A code ramp read back through the full stack must come out oldest to
/// newest: adjacent samples either step up by one code or drop a full scale
/// at the 4095 to 0 wrap.
#[test]
fn test_snapshot_is_time_ordered() {
    let adc = Box::new(SimAdc::new(SimWaveform::Ramp, 0.0, 0.0, 0.0));
    let mut sampler = Sampler::new(adc, 1_000_000, 4096).unwrap();
    sampler.start().unwrap();
    wait_for_data(&sampler);

    let mut out = vec![0.0f32; 2048];
    let count = sampler.get_data(&mut out).unwrap();
    assert!(count >= 1000, "expected a full snapshot, got {}", count);
    sampler.stop().unwrap();

    for (i, w) in out[..count].windows(2).enumerate() {
        let step = w[1] - w[0];
        let ascending = (step - VOLTS_PER_CODE).abs() < 1e-4;
        let wrapped = (step + 3.3).abs() < 0.01;
        assert!(
            ascending || wrapped,
            "samples {} and {} out of order: {} then {}",
            i,
            i + 1,
            w[0],
            w[1]
        );
    }
}

/// After stop, repeated reads return the identical frozen snapshot.
#[test]
fn test_stop_freezes_buffer() {
    let adc = Box::new(SimAdc::new(SimWaveform::Ramp, 0.0, 0.0, 0.0));
    let mut sampler = Sampler::new(adc, 1_000_000, 4096).unwrap();
    sampler.start().unwrap();
    wait_for_data(&sampler);
    sampler.stop().unwrap();

    let mut first = vec![0.0f32; 4096];
    let n1 = sampler.get_data(&mut first).unwrap();
    std::thread::sleep(Duration::from_millis(50));
    let mut second = vec![0.0f32; 4096];
    let n2 = sampler.get_data(&mut second).unwrap();

    assert_eq!(n1, n2, "frozen snapshot changed size");
    assert_eq!(first[..n1], second[..n2], "frozen snapshot changed content");
}

/// Restarting after a stop discards the old capture and fills fresh data.
#[test]
fn test_restart_after_stop() {
    let adc = Box::new(SimAdc::new(SimWaveform::Dc, 0.0, 0.0, 1.65));
    let mut sampler = Sampler::new(adc, 1_000_000, 2048).unwrap();

    sampler.start().unwrap();
    wait_for_data(&sampler);
    sampler.stop().unwrap();

    sampler.start().unwrap();
    wait_for_data(&sampler);
    let mut out = vec![0.0f32; 2048];
    let count = sampler.get_data(&mut out).unwrap();
    sampler.stop().unwrap();

    assert!(count >= 1000);
    for &v in &out[..count] {
        assert!((v - 1.65).abs() < 0.01, "dc sample off: {}", v);
    }
}

/// Changing the sampling rate while running restarts the thread and keeps
/// producing data at the new rate.
#[test]
fn test_rate_change_while_running() {
    let adc = Box::new(SimAdc::new(SimWaveform::Dc, 0.0, 0.0, 1.65));
    let mut sampler = Sampler::new(adc, 50_000, 2048).unwrap();
    sampler.start().unwrap();
    wait_for_data(&sampler);

    sampler.set_sample_rate(1_000_000).unwrap();
    assert!(sampler.is_running(), "rate change must preserve run state");
    assert_eq!(sampler.sample_rate_hz(), 1_000_000);

    wait_for_data(&sampler);
    let mut out = vec![0.0f32; 2048];
    assert!(sampler.get_data(&mut out).unwrap() >= 1000);
    sampler.stop().unwrap();
}

/// A snapshot request before the minimum sample threshold reports no data
/// rather than a short or zeroed buffer.
#[test]
fn test_no_partial_snapshot_before_threshold() {
    let adc = Box::new(SimAdc::new(SimWaveform::Dc, 0.0, 0.0, 1.65));
    let mut sampler = Sampler::new(adc, 1_000, 4096).unwrap();
    let mut out = vec![0.0f32; 4096];
    assert!(matches!(
        sampler.get_data(&mut out),
        Err(ScopeError::NotFound)
    ));
}
