//! Continuous acquisition into a circular raw-code buffer.
//!
//! The sampler owns the analog peripheral and a fixed-capacity
//! [`SampleBuffer`]. Once started, a dedicated thread reads one raw code at a
//! time and appends it under the buffer lock, independent of any consumer's
//! pace. Consumers only ever see the buffer through [`Sampler::get_data`],
//! which copies the newest samples out under the lock and converts them to
//! volts after releasing it.

use crate::acquisition::adc::{raw_to_voltage, AdcConfig, AdcDevice};
use crate::acquisition::buffer::SampleBuffer;
use crate::error::{Result, ScopeError};
use crate::MAX_STORAGE_DEPTH;
use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{info, warn};

/// Minimum samples written since start before a snapshot is meaningful.
pub const MIN_SAMPLES_FOR_SNAPSHOT: usize = 1000;

/// Rates below this are paced with an inter-sample sleep; at or above it the
/// thread free-runs and yields cooperatively.
const PACED_RATE_LIMIT_HZ: u32 = 10_000;

/// How often the free-running loop yields to the scheduler.
const YIELD_EVERY_SAMPLES: u64 = 100;

/// Edge-trigger configuration, mirrored from the controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// When false the scope free-runs (auto mode).
    pub enabled: bool,
    /// Trigger level in volts.
    pub level_voltage: f32,
    /// True for rising edge, false for falling.
    pub rising_edge: bool,
    /// Fraction of the capture kept before the trigger point, in [0, 1].
    pub pre_trigger_ratio: f32,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level_voltage: 0.0,
            rising_edge: true,
            pre_trigger_ratio: 0.5,
        }
    }
}

/// State shared with the sampling thread, all under one lock.
struct Shared {
    buffer: SampleBuffer,
    trigger: TriggerConfig,
}

pub struct Sampler {
    shared: Arc<Mutex<Shared>>,
    running: Arc<AtomicBool>,
    /// The peripheral, parked here while the thread is not running.
    adc: Option<Box<dyn AdcDevice>>,
    thread: Option<JoinHandle<Box<dyn AdcDevice>>>,
    stop_tx: Option<Sender<()>>,
    sample_rate_hz: u32,
    storage_depth: usize,
    /// Raw snapshot scratch, same size as the buffer. Codes are copied here
    /// under the lock so voltage conversion can happen outside it.
    scratch: Vec<u16>,
}

impl Sampler {
    /// Allocate buffers and configure the peripheral.
    ///
    /// Fatal on allocation or peripheral configuration failure; a sampler
    /// that failed to construct must not be used.
    pub fn new(mut adc: Box<dyn AdcDevice>, sample_rate_hz: u32, storage_depth: usize) -> Result<Self> {
        if sample_rate_hz == 0 {
            return Err(ScopeError::InvalidArgument("sample rate must be non-zero"));
        }
        if storage_depth == 0 || storage_depth > MAX_STORAGE_DEPTH {
            return Err(ScopeError::InvalidArgument(
                "storage depth out of range (1..=128K)",
            ));
        }

        let buffer = SampleBuffer::new(storage_depth)?;
        let scratch = alloc_scratch(storage_depth)?;

        adc.configure(&AdcConfig {
            sample_rate_hz,
            ..AdcConfig::default()
        })?;

        info!(
            rate_hz = sample_rate_hz,
            depth = storage_depth,
            "sampler initialized"
        );

        Ok(Self {
            shared: Arc::new(Mutex::new(Shared {
                buffer,
                trigger: TriggerConfig::default(),
            })),
            running: Arc::new(AtomicBool::new(false)),
            adc: Some(adc),
            thread: None,
            stop_tx: None,
            sample_rate_hz,
            storage_depth,
            scratch,
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    pub fn storage_depth(&self) -> usize {
        self.storage_depth
    }

    /// Start continuous sampling. No-op when already running. The write
    /// cursor and wrapped flag reset only on the stopped-to-running
    /// transition.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }

        let adc = self
            .adc
            .take()
            .ok_or_else(|| ScopeError::Adc("peripheral not available".into()))?;

        {
            let mut shared = self.shared.lock().expect("sampler lock poisoned");
            shared.buffer.reset();
        }

        let (stop_tx, stop_rx) = bounded::<()>(1);
        self.running.store(true, Ordering::Relaxed);

        let shared = Arc::clone(&self.shared);
        let running = Arc::clone(&self.running);
        let rate_hz = self.sample_rate_hz;

        let handle = std::thread::Builder::new()
            .name("scope-sampler".into())
            .spawn(move || sampling_loop(adc, shared, running, stop_rx, rate_hz))
            .map_err(|e| {
                self.running.store(false, Ordering::Relaxed);
                ScopeError::Thread(e.to_string())
            })?;

        self.thread = Some(handle);
        self.stop_tx = Some(stop_tx);
        info!(rate_hz = self.sample_rate_hz, "sampling started");
        Ok(())
    }

    /// Stop sampling and wait for the thread to exit. No-op when already
    /// stopped. Safe to call at any time, including right after `start`.
    pub fn stop(&mut self) -> Result<()> {
        if !self.is_running() && self.thread.is_none() {
            return Ok(());
        }

        self.running.store(false, Ordering::Relaxed);
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.try_send(());
        }
        if let Some(handle) = self.thread.take() {
            let adc = handle
                .join()
                .map_err(|_| ScopeError::Thread("sampling thread panicked".into()))?;
            self.adc = Some(adc);
        }

        info!("sampling stopped");
        Ok(())
    }

    /// Replace the trigger configuration atomically under the buffer lock.
    pub fn set_trigger(&self, trigger: TriggerConfig) -> Result<()> {
        if !(0.0..=1.0).contains(&trigger.pre_trigger_ratio) {
            return Err(ScopeError::InvalidArgument(
                "pre-trigger ratio must be in [0, 1]",
            ));
        }
        if !trigger.level_voltage.is_finite() {
            return Err(ScopeError::InvalidArgument("trigger level must be finite"));
        }
        let mut shared = self.shared.lock().expect("sampler lock poisoned");
        shared.trigger = trigger;
        Ok(())
    }

    pub fn trigger(&self) -> TriggerConfig {
        self.shared.lock().expect("sampler lock poisoned").trigger
    }

    /// Change the sampling rate, restarting the acquisition thread when one
    /// is running. The peripheral is reconfigured either way.
    pub fn set_sample_rate(&mut self, sample_rate_hz: u32) -> Result<()> {
        if sample_rate_hz == 0 {
            return Err(ScopeError::InvalidArgument("sample rate must be non-zero"));
        }

        let was_running = self.is_running();
        if was_running {
            self.stop()?;
        }

        self.sample_rate_hz = sample_rate_hz;
        if let Some(adc) = self.adc.as_mut() {
            adc.configure(&AdcConfig {
                sample_rate_hz,
                ..AdcConfig::default()
            })?;
        }

        if was_running {
            self.start()?;
        }

        info!(rate_hz = sample_rate_hz, "sample rate changed");
        Ok(())
    }

    /// Resize the circular buffer (and the snapshot scratch), restarting the
    /// acquisition thread when one is running.
    pub fn set_storage_depth(&mut self, storage_depth: usize) -> Result<()> {
        if storage_depth == 0 || storage_depth > MAX_STORAGE_DEPTH {
            return Err(ScopeError::InvalidArgument(
                "storage depth out of range (1..=128K)",
            ));
        }
        if storage_depth == self.storage_depth {
            return Ok(());
        }

        let was_running = self.is_running();
        if was_running {
            self.stop()?;
        }

        let buffer = SampleBuffer::new(storage_depth)?;
        let scratch = alloc_scratch(storage_depth)?;
        {
            let mut shared = self.shared.lock().expect("sampler lock poisoned");
            shared.buffer = buffer;
        }
        self.scratch = scratch;
        self.storage_depth = storage_depth;

        if was_running {
            self.start()?;
        }

        info!(depth = storage_depth, "storage depth changed");
        Ok(())
    }

    /// True once enough samples exist to form a meaningful snapshot: either
    /// the buffer has wrapped or at least [`MIN_SAMPLES_FOR_SNAPSHOT`] codes
    /// have been written since start.
    pub fn has_new_data(&self) -> bool {
        let shared = self.shared.lock().expect("sampler lock poisoned");
        shared.buffer.wrapped() || shared.buffer.write_idx() >= MIN_SAMPLES_FOR_SNAPSHOT
    }

    /// Copy the most recent `out.len().min(available)` samples into `out` as
    /// calibrated voltages, oldest to newest. Returns `NotFound` until the
    /// minimum sample threshold is reached; never blocks on the sampling
    /// thread beyond the copy itself.
    pub fn get_data(&mut self, out: &mut [f32]) -> Result<usize> {
        let count = {
            let shared = self.shared.lock().expect("sampler lock poisoned");
            if !shared.buffer.wrapped() && shared.buffer.write_idx() < MIN_SAMPLES_FOR_SNAPSHOT {
                return Err(ScopeError::NotFound);
            }
            let want = out.len().min(shared.buffer.available());
            shared.buffer.copy_recent(&mut self.scratch[..want])
        };

        // Conversion happens outside the lock.
        for (dst, &code) in out[..count].iter_mut().zip(&self.scratch[..count]) {
            *dst = raw_to_voltage(code);
        }
        Ok(count)
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn alloc_scratch(storage_depth: usize) -> Result<Vec<u16>> {
    let mut scratch = Vec::new();
    scratch
        .try_reserve_exact(storage_depth)
        .map_err(|_| ScopeError::AllocationFailed {
            bytes: storage_depth * std::mem::size_of::<u16>(),
        })?;
    scratch.resize(storage_depth, 0);
    Ok(scratch)
}

/// Sampling thread body. Reads one code at a time and appends it under the
/// buffer lock. Low rates pace with the stop channel's timeout so a stop
/// request interrupts the sleep; high rates free-run and yield every
/// [`YIELD_EVERY_SAMPLES`] iterations. Returns the peripheral to the sampler.
fn sampling_loop(
    mut adc: Box<dyn AdcDevice>,
    shared: Arc<Mutex<Shared>>,
    running: Arc<AtomicBool>,
    stop_rx: Receiver<()>,
    rate_hz: u32,
) -> Box<dyn AdcDevice> {
    let interval = if rate_hz < PACED_RATE_LIMIT_HZ {
        Some(Duration::from_secs_f64(1.0 / rate_hz as f64))
    } else {
        None
    };

    let mut sample_count: u64 = 0;
    let mut read_errors: u64 = 0;

    while running.load(Ordering::Relaxed) {
        match adc.read_sample() {
            Ok(code) => {
                let mut guard = shared.lock().expect("sampler lock poisoned");
                guard.buffer.push(code);
                drop(guard);
                sample_count += 1;
            }
            Err(e) => {
                read_errors += 1;
                if read_errors <= 5 {
                    warn!(error = %e, "adc read failed");
                }
            }
        }

        match interval {
            Some(iv) => {
                if stop_rx.recv_timeout(iv).is_ok() {
                    break;
                }
            }
            None => {
                if sample_count % YIELD_EVERY_SAMPLES == 0 {
                    if stop_rx.try_recv().is_ok() {
                        break;
                    }
                    std::thread::yield_now();
                }
            }
        }
    }

    adc
}
