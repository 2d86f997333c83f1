//! Audio path: wave table, tone generation, frame latch and I2S output.
//!
//! ## Components
//!
//! - **WaveTable**: 256-entry signed 24-bit sine, read-only after construction
//! - **Sample**: 16 or 24 bit value, left-justified into a 24-bit word
//! - **ToneSampleGenerator**: divider-driven phase index, quadrature stereo
//! - **FrameLatch**: double buffer clocked by LRCLK
//! - **I2sTransmitter**: MCLK/SCLK/LRCLK/SDO from counters

pub mod i2s;
pub mod latch;
pub mod sample;
pub mod tone;
pub mod wave_table;

pub use i2s::{Channel, FrameState, I2sPins, I2sTransmitter, TxEvents};
pub use latch::FrameLatch;
pub use sample::{Sample, SampleWidth};
pub use tone::{ToneConfig, ToneSampleGenerator, ToneState};
pub use wave_table::WaveTable;
