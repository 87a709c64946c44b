//! Scopecore demo binary.
//!
//! Runs the full acquisition stack against a simulated analog front end and
//! prints periodic measurements, either human-readable or as JSON lines.

use anyhow::Result;
use scopecore::{ScopeCore, SimAdc, SimWaveform};
use std::time::Duration;
use tracing::info;

struct Options {
    waveform: SimWaveform,
    frequency_hz: f32,
    amplitude: f32,
    offset: f32,
    duration_secs: f32,
    auto_adjust: bool,
    json: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            waveform: SimWaveform::Sine,
            frequency_hz: 1000.0,
            amplitude: 0.5,
            offset: 1.65,
            duration_secs: 3.0,
            auto_adjust: false,
            json: false,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("scopecore=info".parse().unwrap()),
        )
        .init();

    let opts = match parse_args() {
        Some(opts) => opts,
        None => return Ok(()),
    };

    println!("scopecore v{} - simulated acquisition demo", scopecore::VERSION);
    println!();

    let adc = Box::new(
        SimAdc::new(opts.waveform, opts.frequency_hz, opts.amplitude, opts.offset)
            .with_noise(0.002),
    );
    let mut core = ScopeCore::new(adc)?;
    core.start()?;
    info!(
        freq_hz = opts.frequency_hz,
        amplitude = opts.amplitude,
        "acquisition running"
    );

    let mut adjusted = false;
    let ticks = (opts.duration_secs / 0.1).ceil() as u32;
    let mut last_status = String::new();
    for _ in 0..ticks {
        std::thread::sleep(Duration::from_millis(100));
        core.update()?;

        if opts.auto_adjust && !adjusted && core.get_measurements().is_ok() {
            core.auto_adjust()?;
            adjusted = true;
        }

        let m = match core.get_measurements() {
            Ok(m) => m,
            Err(_) => continue,
        };

        if opts.json {
            println!("{}", serde_json::to_string(&m)?);
            continue;
        }

        let status_line = if m.valid {
            format!(
                "{:>8} / {:<6} | Freq: {:>9.1} Hz | Vpp: {:>6.3} V | Vrms: {:>6.3} V | Range: {:>6.2}..{:<6.2} V",
                core.time_scale_label(),
                core.volt_scale_label(),
                m.freq_hz,
                m.vpp,
                m.vrms,
                m.vmin,
                m.vmax
            )
        } else {
            "signal out of range".to_string()
        };
        if status_line != last_status {
            println!("{}", status_line);
            last_status = status_line;
        }
    }

    core.stop()?;
    let frozen = core.get_measurements()?;
    println!();
    println!(
        "Frozen capture: freq {:.1} Hz, vpp {:.3} V",
        frozen.freq_hz, frozen.vpp
    );

    Ok(())
}

fn parse_args() -> Option<Options> {
    let args: Vec<String> = std::env::args().collect();
    let mut opts = Options::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--version" | "-v" => {
                println!("scopecore {}", scopecore::VERSION);
                return None;
            }
            "--help" | "-h" => {
                print_help();
                return None;
            }
            "--json" => {
                opts.json = true;
            }
            "--auto" | "-a" => {
                opts.auto_adjust = true;
            }
            "--waveform" | "-w" => {
                let value = take_value(&args, i, "--waveform")?;
                opts.waveform = match value.as_str() {
                    "sine" => SimWaveform::Sine,
                    "square" => SimWaveform::Square,
                    "ramp" => SimWaveform::Ramp,
                    "dc" => SimWaveform::Dc,
                    other => {
                        eprintln!("Error: unknown waveform '{}'", other);
                        return None;
                    }
                };
                i += 2;
                continue;
            }
            "--freq" | "-f" => {
                opts.frequency_hz = parse_value(&args, i, "--freq")?;
                i += 2;
                continue;
            }
            "--amplitude" => {
                opts.amplitude = parse_value(&args, i, "--amplitude")?;
                i += 2;
                continue;
            }
            "--offset" => {
                opts.offset = parse_value(&args, i, "--offset")?;
                i += 2;
                continue;
            }
            "--duration" => {
                opts.duration_secs = parse_value(&args, i, "--duration")?;
                i += 2;
                continue;
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                return None;
            }
        }
        i += 1;
    }

    Some(opts)
}

fn take_value(args: &[String], i: usize, flag: &str) -> Option<String> {
    if i + 1 >= args.len() {
        eprintln!("Error: {} requires a value", flag);
        return None;
    }
    Some(args[i + 1].clone())
}

fn parse_value(args: &[String], i: usize, flag: &str) -> Option<f32> {
    let raw = take_value(args, i, flag)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            eprintln!("Error: invalid value for {}: {}", flag, raw);
            None
        }
    }
}

fn print_help() {
    println!("Usage: scopecore [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -w, --waveform KIND  Simulated waveform: sine, square, ramp, dc (default: sine)");
    println!("  -f, --freq HZ        Signal frequency in Hz (default: 1000)");
    println!("      --amplitude V    Signal amplitude in volts (default: 0.5)");
    println!("      --offset V       DC offset in volts (default: 1.65)");
    println!("      --duration SECS  How long to run (default: 3)");
    println!("  -a, --auto           Run auto-adjust once data is available");
    println!("      --json           Emit measurements as JSON lines");
    println!("  -v, --version        Show version");
    println!("  -h, --help           Show this help");
}
