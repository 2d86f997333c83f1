//! Frame-clock sample latch.
//!
//! The generator updates its samples on system clock edges whenever the divider
//! fires. The transmitter must never see that happen halfway through a word, so
//! both channels are copied into this latch on LRCLK rising edges only. The
//! transmitter reloads from the latch one SCLK period after that edge, when the
//! latch has been stable for a full bit time.

use super::sample::{Sample, SampleWidth};
use crate::logging::{log, LogCategory, LogLevel};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameLatch {
    left: Sample,
    right: Sample,
}

impl FrameLatch {
    pub fn new(width: SampleWidth) -> Self {
        Self {
            left: Sample::silence(width),
            right: Sample::silence(width),
        }
    }

    /// One frame-clock edge.
    pub fn clock(&mut self, left: Sample, right: Sample) {
        self.left = left;
        self.right = right;
        log(LogCategory::Tone, LogLevel::Trace, || {
            format!("latched L={} R={}", left.value(), right.value())
        });
    }

    pub fn left(&self) -> Sample {
        self.left
    }

    pub fn right(&self) -> Sample {
        self.right
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_silent() {
        let latch = FrameLatch::new(SampleWidth::Bits16);
        assert_eq!(latch.left(), Sample::silence(SampleWidth::Bits16));
        assert_eq!(latch.right().value(), 0);
    }

    #[test]
    fn test_holds_until_clocked() {
        let mut latch = FrameLatch::new(SampleWidth::Bits24);
        let a = Sample::new(100, SampleWidth::Bits24).unwrap();
        let b = Sample::new(-100, SampleWidth::Bits24).unwrap();
        latch.clock(a, b);
        assert_eq!((latch.left(), latch.right()), (a, b));

        let c = Sample::new(5, SampleWidth::Bits24).unwrap();
        latch.clock(c, c);
        assert_eq!(latch.left(), c);
        assert_eq!(latch.right(), c);
    }
}
