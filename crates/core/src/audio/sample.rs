//! Signed PCM samples of 16 or 24 bits and their 24-bit left-justified form.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};

/// Width of the shift register and of every serialised channel word.
pub const WORD_BITS: u32 = 24;

/// Mask for a 24-bit word.
pub const WORD_MASK: u32 = (1 << WORD_BITS) - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SampleWidth {
    Bits16,
    #[default]
    Bits24,
}

impl SampleWidth {
    /// Only 16 and 24 bit samples can be carried by a 24-bit channel word.
    pub fn from_bits(bits: u32) -> Result<Self, ConfigError> {
        match bits {
            16 => Ok(SampleWidth::Bits16),
            24 => Ok(SampleWidth::Bits24),
            other => Err(ConfigError::UnsupportedSampleWidth(other)),
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            SampleWidth::Bits16 => 16,
            SampleWidth::Bits24 => 24,
        }
    }

    /// Zero bits appended below the sample to fill a channel word.
    pub fn padding(self) -> u32 {
        WORD_BITS - self.bits()
    }

    fn min(self) -> i32 {
        -(1 << (self.bits() - 1))
    }

    fn max(self) -> i32 {
        (1 << (self.bits() - 1)) - 1
    }
}

/// A sample value together with the width it was produced at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sample {
    value: i32,
    width: SampleWidth,
}

impl Sample {
    pub fn new(value: i32, width: SampleWidth) -> Result<Self, ConfigError> {
        if value < width.min() || value > width.max() {
            return Err(ConfigError::SampleOutOfRange {
                value,
                bits: width.bits(),
            });
        }
        Ok(Self { value, width })
    }

    pub fn silence(width: SampleWidth) -> Self {
        Self { value: 0, width }
    }

    /// Narrow a 24-bit table value to `width`, keeping the top bits.
    pub fn from_24_bit(value: i32, width: SampleWidth) -> Self {
        let clamped = value.clamp(SampleWidth::Bits24.min(), SampleWidth::Bits24.max());
        Self {
            value: clamped >> width.padding(),
            width,
        }
    }

    pub fn value(self) -> i32 {
        self.value
    }

    pub fn width(self) -> SampleWidth {
        self.width
    }

    /// The 24-bit channel word: sample in the top bits, zeros below.
    pub fn left_justified(self) -> u32 {
        ((self.value as u32) << self.width.padding()) & WORD_MASK
    }

    /// Sign-extend a 24-bit channel word back to an integer.
    pub fn word_to_i32(word: u32) -> i32 {
        (((word & WORD_MASK) << 8) as i32) >> 8
    }
}
