//! E2E tests for the controller's display pipeline.
//!
//! Drives a full simulated acquisition through the core and verifies the
//! display window, preview, freeze-on-stop, and offset handling.

use scopecore::{CoreState, ScopeCore, SimAdc, SimWaveform, DISPLAY_WIDTH, GRID_COLS};
use std::time::{Duration, Instant};

fn running_core(waveform: SimWaveform, freq_hz: f32, amplitude: f32, offset: f32) -> ScopeCore {
    let adc = Box::new(SimAdc::new(waveform, freq_hz, amplitude, offset));
    let mut core = ScopeCore::new(adc).unwrap();
    core.start().unwrap();

    // Tick until a snapshot lands.
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        core.update().unwrap();
        if core.get_measurements().is_ok() {
            return core;
        }
        assert!(Instant::now() < deadline, "no capture within 5s");
        std::thread::sleep(Duration::from_millis(10));
    }
}

/// While running, the display window resamples the live capture into at most
/// DISPLAY_WIDTH points inside the converter's voltage range.
#[test]
fn test_live_display_window() {
    let mut core = running_core(SimWaveform::Sine, 1000.0, 0.5, 1.65);

    let mut out = vec![0.0f32; DISPLAY_WIDTH];
    let count = core.get_display_waveform(&mut out).unwrap();
    assert!(count > 0 && count <= DISPLAY_WIDTH);
    for &v in &out[..count] {
        assert!((0.0..=3.3).contains(&v), "display sample out of range: {}", v);
    }
    core.stop().unwrap();
}

/// Stopping freezes the trace: the display output stays identical across
/// reads, and starting again discards it.
#[test]
fn test_stop_freezes_display() {
    let mut core = running_core(SimWaveform::Sine, 1000.0, 0.5, 1.65);
    core.stop().unwrap();
    assert_eq!(core.state(), CoreState::Stopped);

    let mut first = vec![0.0f32; DISPLAY_WIDTH];
    let n1 = core.get_display_waveform(&mut first).unwrap();
    std::thread::sleep(Duration::from_millis(50));
    let mut second = vec![0.0f32; DISPLAY_WIDTH];
    let n2 = core.get_display_waveform(&mut second).unwrap();

    assert_eq!(n1, n2);
    assert_eq!(first[..n1], second[..n2], "frozen display changed");

    core.start().unwrap();
    assert_eq!(core.state(), CoreState::Running);
    core.stop().unwrap();
}

/// Changing the time scale while stopped zooms the frozen capture instead of
/// touching the sampler.
#[test]
fn test_frozen_zoom() {
    let mut core = running_core(SimWaveform::Sine, 1000.0, 0.5, 1.65);
    core.stop().unwrap();

    let mut wide = vec![0.0f32; DISPLAY_WIDTH];
    let n_wide = core.get_display_waveform(&mut wide).unwrap();
    assert_eq!(n_wide, DISPLAY_WIDTH);

    // 20 us/div: a much narrower window over the same frozen data.
    core.set_time_scale(10).unwrap();
    let mut narrow = vec![0.0f32; DISPLAY_WIDTH];
    let n_narrow = core.get_display_waveform(&mut narrow).unwrap();
    assert_eq!(n_narrow, DISPLAY_WIDTH);

    let (_, wide_fraction) = {
        core.set_time_scale(16).unwrap();
        core.get_preview_window().unwrap()
    };
    core.set_time_scale(10).unwrap();
    let (_, narrow_fraction) = core.get_preview_window().unwrap();
    assert!(
        narrow_fraction < wide_fraction,
        "zooming in must shrink the preview window ({} !< {})",
        narrow_fraction,
        wide_fraction
    );
}

/// The horizontal offset is clamped while stopped so the window never leaves
/// the frozen capture.
#[test]
fn test_x_offset_clamped_when_frozen() {
    let mut core = running_core(SimWaveform::Sine, 1000.0, 0.5, 1.65);
    core.stop().unwrap();

    core.set_x_offset(1000.0);
    let mut out = vec![0.0f32; DISPLAY_WIDTH];
    let count = core.get_display_waveform(&mut out).unwrap();
    assert!(count > 0, "clamped offset must still yield a window");

    let display_time = core.time_scale().seconds_per_div() * GRID_COLS as f32;
    // Capture is about a second deep at the default scale, so the clamp
    // lands well under a second.
    assert!(
        core.x_offset() < 1.0,
        "offset not clamped: {} (window {}s)",
        core.x_offset(),
        display_time
    );
}

/// The preview downsamples the whole capture and the window fractions stay
/// inside the unit interval.
#[test]
fn test_preview_and_window() {
    let mut core = running_core(SimWaveform::Sine, 1000.0, 0.5, 1.65);
    core.stop().unwrap();

    let mut preview = vec![0.0f32; 128];
    assert_eq!(core.get_preview_waveform(&mut preview).unwrap(), 128);
    for &v in &preview {
        assert!((0.0..=3.3).contains(&v));
    }

    let (start, width) = core.get_preview_window().unwrap();
    assert!((0.0..=1.0).contains(&start), "start fraction {}", start);
    assert!(width > 0.0 && width <= 1.0, "width fraction {}", width);
    assert!(start + width <= 1.0 + 1e-4);
}

/// Auto-adjust on a live sine picks scales that frame the signal.
#[test]
fn test_auto_adjust_live() {
    let mut core = running_core(SimWaveform::Sine, 1000.0, 0.5, 1.65);
    core.auto_adjust().unwrap();

    // 1 Vpp around a 1.65 V center: 200 mV/div frames it across ~5 divisions.
    let vpd = core.volt_scale().volts_per_div();
    assert!(
        (1.0 / vpd) >= 3.0 && (1.0 / vpd) <= 9.0,
        "vertical fit off: {} divisions",
        1.0 / vpd
    );

    let cycles = core.time_scale().seconds_per_div() * GRID_COLS as f32 * 1000.0;
    assert!(
        (1.0..=5.0).contains(&cycles),
        "{} cycles visible after adjust",
        cycles
    );
    core.stop().unwrap();
}
