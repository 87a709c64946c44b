//! Scope controller: run state, scales, offsets, display windows, and
//! measurements over the sampler's captured data.
//!
//! The controller is driven from a single logical thread: an external
//! scheduler calls [`ScopeCore::update`] periodically and the setter
//! operations on demand. The only state shared with the sampling thread is
//! the sample buffer inside the [`Sampler`], so no lock is needed here.

use crate::acquisition::adc::AdcDevice;
use crate::acquisition::sampler::{Sampler, TriggerConfig};
use crate::error::{Result, ScopeError};
use crate::scope::events::{NullEvents, ScopeEvents};
use crate::scope::measure::{self, Measurements};
use crate::scope::scales::{OperatingMode, TimeScale, VoltScale};
use crate::scope::waveform::Waveform;
use crate::{DISPLAY_WIDTH, GRID_COLS, GRID_ROWS, MAX_STORAGE_DEPTH};
use serde::Serialize;
use tracing::{debug, info};

/// Run state. `Waiting` is reserved for trigger-gated acquisition, which the
/// core does not currently enter (the trigger position is approximated as
/// the buffer midpoint).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CoreState {
    Running,
    Stopped,
    Waiting,
}

/// Signals smaller than this peak-to-peak are rejected by auto-adjust.
const NOISE_FLOOR_VOLTS: f32 = 0.01;

/// Auto-adjust aims for the signal to span about 6.5 of the 9 vertical
/// divisions.
const TARGET_DIVISIONS: f32 = 6.5;

/// Visible-cycle window auto-adjust steps the time scale toward.
const MIN_VISIBLE_CYCLES: f32 = 1.5;
const MAX_VISIBLE_CYCLES: f32 = 4.0;

/// Auto-adjust never pushes the trace more than this many divisions off
/// center.
const MAX_OFFSET_DIVISIONS: f32 = 3.0;

pub struct ScopeCore {
    sampler: Sampler,
    state: CoreState,
    mode: OperatingMode,
    time_scale: TimeScale,
    volt_scale: VoltScale,
    /// Horizontal offset in seconds.
    x_offset: f32,
    /// Vertical offset in volts.
    y_offset: f32,
    trigger: TriggerConfig,
    captured: Waveform,
    frozen: Waveform,
    has_frozen_data: bool,
    measurements: Option<Measurements>,
    events: Box<dyn ScopeEvents>,
}

impl ScopeCore {
    /// Build the controller and its sampler around an analog peripheral,
    /// with rate and depth derived from the default time scale.
    pub fn new(adc: Box<dyn AdcDevice>) -> Result<Self> {
        Self::with_events(adc, Box::new(NullEvents))
    }

    pub fn with_events(adc: Box<dyn AdcDevice>, events: Box<dyn ScopeEvents>) -> Result<Self> {
        let time_scale = TimeScale::DEFAULT;
        let volt_scale = VoltScale::DEFAULT;
        let depth = time_scale.storage_depth();
        let sampler = Sampler::new(adc, time_scale.sample_rate_hz(), depth)?;

        let core = Self {
            sampler,
            state: CoreState::Stopped,
            mode: time_scale.operating_mode(),
            time_scale,
            volt_scale,
            x_offset: 0.0,
            y_offset: 0.0,
            trigger: TriggerConfig::default(),
            captured: Waveform::with_depth(depth)?,
            frozen: Waveform::with_depth(depth)?,
            has_frozen_data: false,
            measurements: None,
            events,
        };
        info!(
            time_scale = core.time_scale.label(),
            volt_scale = core.volt_scale.label(),
            "scope core initialized"
        );
        Ok(core)
    }

    pub fn state(&self) -> CoreState {
        self.state
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    pub fn time_scale(&self) -> TimeScale {
        self.time_scale
    }

    pub fn volt_scale(&self) -> VoltScale {
        self.volt_scale
    }

    /// Display string for the current time scale, e.g. "2ms".
    pub fn time_scale_label(&self) -> &'static str {
        self.time_scale.label()
    }

    /// Display string for the current voltage scale, e.g. "1V".
    pub fn volt_scale_label(&self) -> &'static str {
        self.volt_scale.label()
    }

    pub fn x_offset(&self) -> f32 {
        self.x_offset
    }

    pub fn y_offset(&self) -> f32 {
        self.y_offset
    }

    pub fn trigger(&self) -> TriggerConfig {
        self.trigger
    }

    /// Start acquisition. No-op while already running. Discards any frozen
    /// trace from a previous stop.
    pub fn start(&mut self) -> Result<()> {
        if self.state == CoreState::Running {
            return Ok(());
        }
        self.sampler.start()?;
        self.state = CoreState::Running;
        self.has_frozen_data = false;
        self.events.on_state_changed(self.state);
        info!("scope started");
        Ok(())
    }

    /// Stop acquisition and freeze the captured waveform, recording the
    /// scale settings in effect at this instant.
    pub fn stop(&mut self) -> Result<()> {
        if self.state == CoreState::Stopped {
            return Ok(());
        }
        self.sampler.stop()?;
        self.state = CoreState::Stopped;

        if !self.captured.is_empty() {
            self.frozen.copy_from(&self.captured)?;
            self.frozen.time_scale = self.time_scale;
            self.frozen.volt_scale = self.volt_scale;
            self.has_frozen_data = true;
        }

        self.events.on_state_changed(self.state);
        info!(frozen = self.has_frozen_data, "scope stopped");
        Ok(())
    }

    /// Change the time scale. Derives the operating mode and, while running,
    /// pushes the matching sampling rate and storage depth to the sampler.
    pub fn set_time_scale(&mut self, index: usize) -> Result<()> {
        let ts = TimeScale::new(index)?;
        self.apply_time_scale(ts)
    }

    fn apply_time_scale(&mut self, ts: TimeScale) -> Result<()> {
        self.time_scale = ts;
        self.mode = ts.operating_mode();

        if self.state == CoreState::Running {
            self.sampler.set_sample_rate(ts.sample_rate_hz())?;
            let depth = ts.storage_depth();
            if depth != self.sampler.storage_depth() {
                self.sampler.set_storage_depth(depth)?;
                self.captured.ensure_depth(depth)?;
            }
        }
        Ok(())
    }

    /// Change the voltage scale. Display-only transform, so the sampler is
    /// untouched.
    pub fn set_volt_scale(&mut self, index: usize) -> Result<()> {
        self.volt_scale = VoltScale::new(index)?;
        Ok(())
    }

    /// Set the horizontal offset. While stopped with frozen data the offset
    /// is clamped so the window cannot leave the captured trace; while
    /// running it is stored verbatim since new data keeps arriving.
    pub fn set_x_offset(&mut self, offset_seconds: f32) {
        let mut offset = offset_seconds;
        if self.state == CoreState::Stopped && self.has_frozen_data {
            let total_time = self.frozen.total_time();
            let display_time = self.time_scale.seconds_per_div() * GRID_COLS as f32;
            let max_offset = ((total_time - display_time) / 2.0).max(0.0);
            offset = offset.clamp(-max_offset, max_offset);
        }
        self.x_offset = offset;
    }

    /// Set the vertical offset in volts. Stored verbatim.
    pub fn set_y_offset(&mut self, offset_volts: f32) {
        self.y_offset = offset_volts;
    }

    /// Replace the trigger configuration, mirroring it into the sampler.
    pub fn set_trigger(&mut self, trigger: TriggerConfig) -> Result<()> {
        self.sampler.set_trigger(trigger)?;
        self.trigger = trigger;
        Ok(())
    }

    /// Periodic tick. While running, pulls a full snapshot from the sampler
    /// into the captured waveform once enough data exists, and invalidates
    /// the measurement cache.
    pub fn update(&mut self) -> Result<()> {
        if self.state != CoreState::Running {
            return Ok(());
        }
        if !self.sampler.has_new_data() {
            return Ok(());
        }

        let depth = self.sampler.storage_depth();
        self.captured.ensure_depth(depth)?;
        let count = match self.sampler.get_data(&mut self.captured.data[..depth]) {
            Ok(count) => count,
            // Lost the race with a restart; routine, try again next tick.
            Err(ScopeError::NotFound) => return Ok(()),
            Err(e) => return Err(e),
        };

        self.captured.num_points = count;
        self.captured.time_per_sample = 1.0 / self.sampler.sample_rate_hz() as f32;
        // Midpoint approximation; no edge search is performed.
        self.captured.trigger_position = count / 2;
        self.captured.time_scale = self.time_scale;
        self.captured.volt_scale = self.volt_scale;
        self.measurements = None;

        self.events.on_capture(count);
        debug!(samples = count, "snapshot ingested");
        Ok(())
    }

    /// Load an externally supplied trace into the captured slot, as if it
    /// had just been ingested. Used for simulation and offline analysis.
    pub fn load_waveform(&mut self, data: &[f32], time_per_sample: f32) -> Result<()> {
        if data.is_empty() || data.len() > MAX_STORAGE_DEPTH {
            return Err(ScopeError::InvalidArgument(
                "waveform length out of range (1..=128K)",
            ));
        }
        if !(time_per_sample.is_finite() && time_per_sample > 0.0) {
            return Err(ScopeError::InvalidArgument("time per sample must be positive"));
        }

        self.captured.ensure_depth(data.len())?;
        self.captured.data[..data.len()].copy_from_slice(data);
        self.captured.num_points = data.len();
        self.captured.time_per_sample = time_per_sample;
        self.captured.trigger_position = data.len() / 2;
        self.captured.time_scale = self.time_scale;
        self.captured.volt_scale = self.volt_scale;
        self.measurements = None;
        Ok(())
    }

    /// The waveform all read paths operate on: the frozen trace while
    /// stopped with one available, otherwise the live capture.
    fn active_waveform(&self) -> &Waveform {
        if self.state == CoreState::Stopped && self.has_frozen_data {
            &self.frozen
        } else {
            &self.captured
        }
    }

    /// Resample the active waveform into a display-ready window.
    ///
    /// Writes up to `out.len().min(DISPLAY_WIDTH)` voltages, already shifted
    /// by the vertical offset, and returns how many were produced. The
    /// window is `time_per_div * GRID_COLS` seconds wide and centered on the
    /// trigger position plus the horizontal offset. While stopped, the
    /// window is re-derived from the current scale against the frozen
    /// capture, so changing the time scale zooms the frozen trace by the
    /// ratio of the capture-time scale to the current one. Fractional source
    /// positions are linearly interpolated. Returns a partial window when
    /// the source runs out of samples.
    pub fn get_display_waveform(&self, out: &mut [f32]) -> Result<usize> {
        let wf = self.active_waveform();
        if wf.is_empty() {
            return Err(ScopeError::NotFound);
        }

        let display_time = self.time_scale.seconds_per_div() * GRID_COLS as f32;
        let sample_step = (display_time / wf.time_per_sample) / DISPLAY_WIDTH as f32;

        let trigger_time = wf.trigger_position as f32 * wf.time_per_sample;
        let start_time = (trigger_time - display_time / 2.0 + self.x_offset).max(0.0);
        let start_pos = (start_time / wf.time_per_sample).min((wf.num_points - 1) as f32);

        let width = out.len().min(DISPLAY_WIDTH);
        let mut count = 0;
        for (i, slot) in out[..width].iter_mut().enumerate() {
            let pos = start_pos + i as f32 * sample_step;
            if pos >= wf.num_points as f32 {
                break;
            }
            *slot = wf.sample_at(pos) + self.y_offset;
            count += 1;
        }

        Ok(count)
    }

    /// Downsample the entire active waveform to `out.len()` points by
    /// nearest-index sampling, for rendering a minimap of the acquisition.
    pub fn get_preview_waveform(&self, out: &mut [f32]) -> Result<usize> {
        let wf = self.active_waveform();
        if wf.is_empty() {
            return Err(ScopeError::NotFound);
        }

        let preview_width = out.len();
        let step = wf.num_points as f32 / preview_width as f32;
        for (i, slot) in out.iter_mut().enumerate() {
            let src = ((i as f32 * step) as usize).min(wf.num_points - 1);
            *slot = wf.data[src];
        }
        Ok(preview_width)
    }

    /// Where the display window sits inside the full acquisition, as
    /// `(start_fraction, width_fraction)` for highlighting on the minimap.
    pub fn get_preview_window(&self) -> Result<(f32, f32)> {
        let wf = self.active_waveform();
        if wf.is_empty() {
            return Err(ScopeError::NotFound);
        }

        let total_time = wf.total_time();
        let display_time = self.time_scale.seconds_per_div() * GRID_COLS as f32;
        let width_fraction = (display_time / total_time).min(1.0);

        let trigger_time = wf.trigger_position as f32 * wf.time_per_sample;
        let start_time = (trigger_time - display_time / 2.0 + self.x_offset)
            .clamp(0.0, (total_time - display_time).max(0.0));

        Ok((start_time / total_time, width_fraction))
    }

    /// Pick scales and offsets that fit the current signal on screen.
    ///
    /// Scans the displayed window (scale-domain, offsets applied): rejects
    /// signals below the noise floor, fits the voltage scale so peak-to-peak
    /// spans about [`TARGET_DIVISIONS`] of the [`GRID_ROWS`] divisions,
    /// estimates the period from ascending crossings through the window
    /// mean, and walks the time scale one entry at a time until the visible
    /// cycle count lands in the target range. Recenters vertically and
    /// clears the horizontal offset.
    pub fn auto_adjust(&mut self) -> Result<()> {
        let mut window = vec![0.0f32; DISPLAY_WIDTH];
        let count = self.get_display_waveform(&mut window)?;
        let window = &window[..count];
        if window.is_empty() {
            return Err(ScopeError::NotFound);
        }

        let mut vmax = window[0];
        let mut vmin = window[0];
        let mut sum = 0.0f64;
        for &v in window {
            vmax = vmax.max(v);
            vmin = vmin.min(v);
            sum += v as f64;
        }
        let vpp = vmax - vmin;
        let center = (vmax + vmin) / 2.0;
        let mean = (sum / count as f64) as f32;

        if vpp < NOISE_FLOOR_VOLTS {
            return Err(ScopeError::InvalidArgument("signal below noise floor"));
        }

        self.volt_scale = VoltScale::best_fit(vpp / TARGET_DIVISIONS);

        // Period from ascending crossings of the window mean, averaged over
        // the crossing intervals. Pixel spacing maps back to seconds through
        // the window width in effect during the scan.
        let display_time = self.time_scale.seconds_per_div() * GRID_COLS as f32;
        let pixel_time = display_time / DISPLAY_WIDTH as f32;
        let mut last_crossing: Option<usize> = None;
        let mut interval_sum = 0usize;
        let mut intervals = 0usize;
        for i in 1..count {
            if window[i - 1] < mean && window[i] >= mean {
                if let Some(prev) = last_crossing {
                    interval_sum += i - prev;
                    intervals += 1;
                }
                last_crossing = Some(i);
            }
        }

        if intervals > 0 {
            let period = (interval_sum as f32 / intervals as f32) * pixel_time;
            let mut ts = self.time_scale;
            // One table entry per step toward the target cycle window, never
            // into ROLL territory.
            for _ in 0..TimeScale::COUNT {
                let cycles = ts.seconds_per_div() * GRID_COLS as f32 / period;
                let next = if cycles > MAX_VISIBLE_CYCLES {
                    ts.stepped(-1)
                } else if cycles < MIN_VISIBLE_CYCLES {
                    ts.stepped(1)
                } else {
                    None
                };
                match next {
                    Some(candidate) if candidate.operating_mode() == OperatingMode::Normal => {
                        ts = candidate;
                    }
                    _ => break,
                }
            }
            self.apply_time_scale(ts)?;
        }

        let max_offset = MAX_OFFSET_DIVISIONS * self.volt_scale.volts_per_div();
        self.y_offset = (self.y_offset - center).clamp(-max_offset, max_offset);
        self.x_offset = 0.0;

        info!(
            volt_scale = self.volt_scale.label(),
            time_scale = self.time_scale.label(),
            vpp,
            y_offset = self.y_offset,
            "auto-adjust complete"
        );
        Ok(())
    }

    /// Signal measurements over the active waveform, recomputed lazily and
    /// cached until the next ingested snapshot. `NotFound` when no waveform
    /// exists; an out-of-range trace comes back with `valid == false`.
    pub fn get_measurements(&mut self) -> Result<Measurements> {
        if let Some(m) = self.measurements {
            return Ok(m);
        }
        let m = measure::compute(self.active_waveform()).ok_or(ScopeError::NotFound)?;
        self.measurements = Some(m);
        Ok(m)
    }

    /// Vertical divisions available on screen.
    pub fn grid_rows(&self) -> usize {
        GRID_ROWS
    }
}
