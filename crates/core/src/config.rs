//! Design parameters and their setup-time validation.
//!
//! Nothing here is checked while the design runs. Every frequency ratio and
//! register width is resolved once by [`DesignConfig::validate`]; a config
//! that gets past it cannot produce a wrapped divisor or an out-of-range PLL.

use crate::audio::sample::SampleWidth;
use crate::audio::tone::ToneConfig;
use crate::clocking::pll::PllConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Setup-time configuration errors
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Reference clock {0} Hz is outside the PLL input range")]
    ReferenceOutOfRange(f64),
    #[error("PLL target must be positive and finite, got {0}")]
    InvalidPllTarget(f64),
    #[error("PLL cannot reach {target_hz} Hz within tolerance (closest legal output: {best_hz:?})")]
    PllTargetUnreachable {
        target_hz: f64,
        best_hz: Option<f64>,
    },
    #[error("PLL parameter {name}={value} is outside {min}..={max}")]
    PllParameter {
        name: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },
    #[error("PLL {stage} frequency {hz} Hz is outside {min_hz}..={max_hz} Hz")]
    PllFrequency {
        stage: &'static str,
        hz: f64,
        min_hz: f64,
        max_hz: f64,
    },
    #[error("PLL lock time must be at least one reference tick")]
    ZeroLockTicks,
    #[error("Tone frequency must be positive and finite, got {0}")]
    InvalidToneFrequency(f64),
    #[error("Tone rate parameter {name} must be positive and finite, got {value}")]
    InvalidToneRate { name: &'static str, value: f64 },
    #[error("Tone frequency {0} Hz is too high for the divider")]
    ToneTooHigh(f64),
    #[error("Tone divisor threshold {ticks} does not fit a {bits}-bit register")]
    DivisorOverflow { ticks: f64, bits: u32 },
    #[error("Unsupported sample width: {0} bits (expected 16 or 24)")]
    UnsupportedSampleWidth(u32),
    #[error("Sample {value} does not fit in {bits} bits")]
    SampleOutOfRange { value: i32, bits: u32 },
}

/// Raw configuration, as read from JSON or assembled from CLI flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignConfig {
    /// Oscillator feeding the PLL and the power-on reset counter
    pub reference_hz: f64,
    /// Requested PLL output for the system and transmit domains
    pub pll_output_hz: f64,
    /// Reference ticks the VCO needs before lock is reported
    pub pll_lock_ticks: u32,
    pub tone_hz: f64,
    /// Numerator of the tone divider formula
    pub tone_reference_rate: f64,
    /// Clock period scale of the tone divider formula
    pub clock_period_scale: f64,
    pub sample_width: u32,
}

impl Default for DesignConfig {
    fn default() -> Self {
        Self {
            reference_hz: 12e6,
            pll_output_hz: 50e6,
            pll_lock_ticks: 600,
            tone_hz: 880.0,
            tone_reference_rate: 500e6,
            clock_period_scale: 1e9 / 100e6,
            sample_width: 24,
        }
    }
}

/// Configuration that passed validation; the only way to build a design
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedConfig {
    pub reference_hz: f64,
    pub pll: PllConfig,
    pub pll_output_hz: f64,
    pub pll_lock_ticks: u32,
    pub tone: ToneConfig,
    pub tone_ticks: u64,
    pub sample_width: SampleWidth,
}

impl DesignConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<ValidatedConfig, ConfigError> {
        let pll = PllConfig::for_target(self.reference_hz, self.pll_output_hz)?;
        let pll_output_hz = pll.output_hz(self.reference_hz)?;
        if self.pll_lock_ticks == 0 {
            return Err(ConfigError::ZeroLockTicks);
        }

        let tone = ToneConfig {
            tone_hz: self.tone_hz,
            reference_rate: self.tone_reference_rate,
            clock_period_scale: self.clock_period_scale,
        };
        let tone_ticks = tone.divisor_threshold()?;
        let sample_width = SampleWidth::from_bits(self.sample_width)?;

        Ok(ValidatedConfig {
            reference_hz: self.reference_hz,
            pll,
            pll_output_hz,
            pll_lock_ticks: self.pll_lock_ticks,
            tone,
            tone_ticks,
            sample_width,
        })
    }
}
