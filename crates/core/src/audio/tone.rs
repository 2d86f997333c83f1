//! Tone sample generator.
//!
//! A divide-by-N counter in the system domain advances an 8-bit phase index
//! through the wave table. The left channel plays the table at the index, the
//! right channel 63 entries further on, roughly a quarter period ahead.
//!
//! The divider threshold is
//! `ticks = floor(reference_rate / (tone_hz * 256 * clock_period_scale)) - 1`
//! and the index advances once every `ticks + 1` system ticks.

use super::sample::{Sample, SampleWidth};
use super::wave_table::{WaveTable, WAVE_TABLE_LEN};
use crate::config::ConfigError;
use crate::logging::{log, LogCategory, LogLevel};
use crate::state::StateError;
use serde::{Deserialize, Serialize};

/// Width of the divisor register.
pub const DIVISOR_BITS: u32 = 48;

/// Table offset of the right channel.
pub const QUADRATURE_OFFSET: usize = 63;

/// Tones above this are past what the frame rate can carry cleanly.
pub const NOMINAL_MAX_TONE_HZ: f64 = 12_000.0;

/// Inputs of the divider formula
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToneConfig {
    pub tone_hz: f64,
    pub reference_rate: f64,
    pub clock_period_scale: f64,
}

fn positive(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidToneRate { name, value })
    }
}

impl ToneConfig {
    /// Compute the divider threshold, refusing anything that would be
    /// negative or overflow the divisor register.
    pub fn divisor_threshold(&self) -> Result<u64, ConfigError> {
        if !(self.tone_hz.is_finite() && self.tone_hz > 0.0) {
            return Err(ConfigError::InvalidToneFrequency(self.tone_hz));
        }
        let rate = positive("reference_rate", self.reference_rate)?;
        let scale = positive("clock_period_scale", self.clock_period_scale)?;

        let ticks = (rate / (self.tone_hz * WAVE_TABLE_LEN as f64 * scale)).floor() - 1.0;
        if ticks < 0.0 {
            return Err(ConfigError::ToneTooHigh(self.tone_hz));
        }
        if ticks >= (1u64 << DIVISOR_BITS) as f64 {
            return Err(ConfigError::DivisorOverflow {
                ticks,
                bits: DIVISOR_BITS,
            });
        }
        if self.tone_hz > NOMINAL_MAX_TONE_HZ {
            log(LogCategory::Tone, LogLevel::Warn, || {
                format!(
                    "tone {} Hz is above the nominal {} Hz limit",
                    self.tone_hz, NOMINAL_MAX_TONE_HZ
                )
            });
        }
        Ok(ticks as u64)
    }
}

/// Registers of the generator, everything a save-state needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ToneState {
    pub divisor: u64,
    pub index: u8,
    /// Index the current samples were read from
    pub sample_index: u8,
    pub left: Sample,
    pub right: Sample,
}

#[derive(Debug, Clone)]
pub struct ToneSampleGenerator {
    table: WaveTable,
    width: SampleWidth,
    ticks: u64,
    state: ToneState,
}

impl ToneSampleGenerator {
    pub fn new(config: &ToneConfig, width: SampleWidth) -> Result<Self, ConfigError> {
        let ticks = config.divisor_threshold()?;
        log(LogCategory::Tone, LogLevel::Info, || {
            format!("tone {} Hz, divisor threshold {}", config.tone_hz, ticks)
        });
        Ok(Self::with_threshold(WaveTable::sine(), ticks, width))
    }

    /// Build from an already validated threshold.
    pub fn with_threshold(table: WaveTable, ticks: u64, width: SampleWidth) -> Self {
        Self {
            table,
            width,
            ticks,
            state: Self::reset_state(width),
        }
    }

    fn reset_state(width: SampleWidth) -> ToneState {
        ToneState {
            left: Sample::silence(width),
            right: Sample::silence(width),
            ..ToneState::default()
        }
    }

    /// Put every register back to its reset value.
    pub fn reset(&mut self) {
        self.state = Self::reset_state(self.width);
    }

    /// One system-domain tick. Returns true when the phase index advanced.
    pub fn tick(&mut self, reset: bool) -> bool {
        if reset {
            self.reset();
            return false;
        }

        if self.state.divisor != self.ticks {
            self.state.divisor += 1;
            return false;
        }

        let index = self.state.index;
        self.state.divisor = 0;
        self.state.index = index.wrapping_add(1);
        self.state.sample_index = index;
        self.state.left = Sample::from_24_bit(self.table.get(index as usize), self.width);
        self.state.right = Sample::from_24_bit(
            self.table.get(Self::right_index_for(index) as usize),
            self.width,
        );
        true
    }

    /// Right-channel table index for a left-channel index.
    pub fn right_index_for(left_index: u8) -> u8 {
        ((left_index as usize + QUADRATURE_OFFSET) % WAVE_TABLE_LEN) as u8
    }

    pub fn left(&self) -> Sample {
        self.state.left
    }

    pub fn right(&self) -> Sample {
        self.state.right
    }

    pub fn index(&self) -> u8 {
        self.state.index
    }

    pub fn left_index(&self) -> u8 {
        self.state.sample_index
    }

    pub fn right_index(&self) -> u8 {
        Self::right_index_for(self.state.sample_index)
    }

    /// Scope trigger: high while the phase index is at the start of the table.
    pub fn trigger(&self) -> bool {
        self.state.index == 0
    }

    pub fn threshold(&self) -> u64 {
        self.ticks
    }

    pub fn width(&self) -> SampleWidth {
        self.width
    }

    pub fn state(&self) -> ToneState {
        self.state
    }

    pub fn restore(&mut self, state: ToneState) -> Result<(), StateError> {
        if state.divisor > self.ticks {
            return Err(StateError::DivisorPastThreshold {
                divisor: state.divisor,
                threshold: self.ticks,
            });
        }
        for sample in [state.left, state.right] {
            if sample.width() != self.width {
                return Err(StateError::WidthMismatch {
                    expected: self.width.bits(),
                    actual: sample.width().bits(),
                });
            }
        }
        self.state = state;
        Ok(())
    }
}
