//! Simulated analog source for demos and tests.
//!
//! Plays the role of a function generator wired to the input pin: sine,
//! square, and DC shapes with optional noise, plus a code ramp that sweeps
//! the full converter range one code per sample (useful for verifying
//! time-ordering across buffer wraparound).

use crate::acquisition::adc::{voltage_to_raw, AdcConfig, AdcDevice, ADC_RAW_MAX};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimWaveform {
    Sine,
    Square,
    Dc,
    /// Raw-code sawtooth: 0, 1, .., 4095, 0, ..
    Ramp,
}

#[derive(Debug)]
pub struct SimAdc {
    waveform: SimWaveform,
    frequency_hz: f32,
    /// Peak amplitude in volts.
    amplitude: f32,
    /// Center voltage in volts.
    offset: f32,
    sample_rate_hz: u32,
    noise_volts: f32,
    phase: f64,
    ramp_code: u16,
    rng_state: u32,
}

impl SimAdc {
    pub fn new(waveform: SimWaveform, frequency_hz: f32, amplitude: f32, offset: f32) -> Self {
        Self {
            waveform,
            frequency_hz,
            amplitude,
            offset,
            sample_rate_hz: AdcConfig::default().sample_rate_hz,
            noise_volts: 0.0,
            phase: 0.0,
            ramp_code: 0,
            rng_state: 0x2545_f491,
        }
    }

    /// Time base used to advance the phase between reads. Overridden by
    /// whatever rate the sampler configures.
    pub fn with_sample_rate(mut self, sample_rate_hz: u32) -> Self {
        self.sample_rate_hz = sample_rate_hz;
        self
    }

    /// Uniform noise of the given peak amplitude added to every sample.
    pub fn with_noise(mut self, noise_volts: f32) -> Self {
        self.noise_volts = noise_volts;
        self
    }

    fn next_noise(&mut self) -> f32 {
        if self.noise_volts == 0.0 {
            return 0.0;
        }
        // xorshift32, plenty for test noise
        let mut x = self.rng_state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng_state = x;
        let unit = (x as f32 / u32::MAX as f32) * 2.0 - 1.0;
        unit * self.noise_volts
    }
}

impl AdcDevice for SimAdc {
    fn configure(&mut self, config: &AdcConfig) -> Result<()> {
        if config.sample_rate_hz > 0 {
            self.sample_rate_hz = config.sample_rate_hz;
        }
        Ok(())
    }

    fn read_sample(&mut self) -> Result<u16> {
        if self.waveform == SimWaveform::Ramp {
            let code = self.ramp_code;
            self.ramp_code = if code >= ADC_RAW_MAX { 0 } else { code + 1 };
            return Ok(code);
        }

        let shape = match self.waveform {
            SimWaveform::Sine => (self.phase * std::f64::consts::TAU).sin() as f32,
            SimWaveform::Square => {
                if self.phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            SimWaveform::Dc => 0.0,
            SimWaveform::Ramp => unreachable!(),
        };

        let noise = self.next_noise();
        let volts = self.offset + self.amplitude * shape + noise;

        self.phase += self.frequency_hz as f64 / self.sample_rate_hz as f64;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }

        Ok(voltage_to_raw(volts))
    }
}
