use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use tone_core::audio::sample::WORD_MASK;
use tone_core::logging::{LogConfig, LogLevel};
use tone_core::platform::SimPlatform;
use tone_core::{Design, DesignConfig, ToneDesign};

#[derive(Parser)]
#[command(about = "Run the I2S tone design on a simulated iCEBreaker")]
struct Args {
    /// JSON design configuration; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tone frequency in Hz
    #[arg(long)]
    tone_hz: Option<f64>,

    /// PLL output frequency in Hz
    #[arg(long)]
    pll_hz: Option<f64>,

    /// Sample width in bits (16 or 24)
    #[arg(long)]
    width: Option<u32>,

    /// Number of stereo frames to run
    #[arg(long, default_value_t = 8)]
    frames: u32,

    /// Resume from a save-state written by --save with the same configuration
    #[arg(long)]
    load: Option<PathBuf>,

    /// Dump save-state to this file as JSON
    #[arg(long)]
    save: Option<PathBuf>,

    /// Write pin transitions to this file as JSON
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Include MCLK in the trace
    #[arg(long, default_value_t = false)]
    trace_mclk: bool,

    /// Core log level: off, error, warn, info, debug, trace
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Send core logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Suppress per-frame output (still writes --save and --trace)
    #[arg(long, default_value_t = false)]
    quiet: bool,
}

const TRACE_CAPACITY: usize = 1_000_000;

fn load_config(args: &Args) -> Result<DesignConfig> {
    let mut config = match args.config.as_ref() {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            DesignConfig::from_json(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => DesignConfig::default(),
    };
    if let Some(hz) = args.tone_hz {
        config.tone_hz = hz;
    }
    if let Some(hz) = args.pll_hz {
        config.pll_output_hz = hz;
    }
    if let Some(bits) = args.width {
        config.sample_width = bits;
    }
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let level = LogLevel::from_str(&args.log_level)
        .with_context(|| format!("unknown log level '{}'", args.log_level))?;
    let log_config = LogConfig::global();
    log_config.set_global_level(level);
    if let Some(path) = args.log_file.as_ref() {
        log_config
            .set_log_file(path.clone())
            .with_context(|| format!("opening log file {}", path.display()))?;
    }

    let config = load_config(&args)?;
    let mut platform = SimPlatform::icebreaker();
    let mut design = ToneDesign::build(&config, &mut platform)?;
    if let Some(path) = args.load.as_ref() {
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let state: serde_json::Value = serde_json::from_str(&text)?;
        design
            .restore_state(&state)
            .with_context(|| format!("loading save-state {}", path.display()))?;
        info!("resumed at {} ps", design.now_ps());
    }
    if args.trace.is_some() {
        design.enable_trace(TRACE_CAPACITY, args.trace_mclk);
    }

    let validated = design.config();
    info!(
        "PLL {:?} -> {:.3} MHz, divisor threshold {}",
        validated.pll,
        validated.pll_output_hz / 1e6,
        validated.tone_ticks
    );
    for c in platform.constraints() {
        info!("constraint {} {:.3} ns", c.clock, c.period_ns);
    }

    for fnum in 1..=args.frames {
        let frame = design.step_frame()?;
        if args.quiet {
            continue;
        }
        println!(
            "Frame {:>4} @ {:>12} ps: L={:>9} ({:06X})  R={:>9} ({:06X})",
            fnum,
            design.now_ps(),
            frame.left,
            frame.left as u32 & WORD_MASK,
            frame.right,
            frame.right as u32 & WORD_MASK
        );
    }

    if let Some(path) = args.save.as_ref() {
        let state = design.save_state();
        let mut f = File::create(path)?;
        write!(f, "{}", serde_json::to_string_pretty(&state)?)?;
    }

    if let (Some(path), Some(trace)) = (args.trace.as_ref(), design.trace()) {
        if trace.truncated() {
            warn!("trace hit {} transitions and was truncated", TRACE_CAPACITY);
        }
        let mut f = File::create(path)?;
        write!(f, "{}", trace.to_json()?)?;
    }

    log_config.clear_log_file();
    Ok(())
}
