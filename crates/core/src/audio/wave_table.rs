//! One period of a sine wave as 256 signed 24-bit samples.

use std::f64::consts::PI;
use std::ops::Index;

/// Number of entries in the table; phase indices wrap at this value.
pub const WAVE_TABLE_LEN: usize = 256;

/// Full-scale positive 24-bit sample.
pub const FULL_SCALE_24: i32 = 0x7F_FFFF;

/// Immutable sine lookup table.
///
/// Entry `i` is `trunc(8388607 * sin(2π·i/256))`. The table is built once and
/// only ever read; there is no way to mutate it after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaveTable {
    samples: [i32; WAVE_TABLE_LEN],
}

impl WaveTable {
    pub fn sine() -> Self {
        let mut samples = [0i32; WAVE_TABLE_LEN];
        for (i, sample) in samples.iter_mut().enumerate() {
            let x = 2.0 * PI * (i as f64 / WAVE_TABLE_LEN as f64);
            *sample = (FULL_SCALE_24 as f64 * x.sin()) as i32;
        }
        Self { samples }
    }

    /// Sample at `index`, taken modulo the table length.
    pub fn get(&self, index: usize) -> i32 {
        self.samples[index % WAVE_TABLE_LEN]
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.samples
    }
}

impl Default for WaveTable {
    fn default() -> Self {
        Self::sine()
    }
}

impl Index<usize> for WaveTable {
    type Output = i32;

    fn index(&self, index: usize) -> &i32 {
        &self.samples[index % WAVE_TABLE_LEN]
    }
}
