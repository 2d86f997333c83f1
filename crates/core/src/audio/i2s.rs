//! Output-only I2S transmitter built entirely from counters.
//!
//! Every transmit-domain tick:
//! - MCLK toggles, so MCLK runs at half the transmit clock.
//! - On ticks where MCLK was low, `sticks` advances. Wrapping from 7 to 0
//!   toggles SCLK, so one SCLK period is 32 ticks.
//! - On SCLK falling edges `shift_count` advances; wrapping from 23 to 0
//!   toggles LRCLK. One channel is therefore exactly 24 bits long.
//! - On the same falling edge the shift register either reloads (when
//!   `shift_count` was 0) or rotates left by one.
//!
//! SDO is the MSB of the shift register and is the only output that is not a
//! register of its own. The reload lands one SCLK after the LRCLK edge, which
//! gives the standard one-bit I2S data delay.
//!
//! With a 50 MHz transmit clock MCLK is 25 MHz and a stereo frame takes 1536
//! ticks (a 768x MCLK ratio), about 32.55 kHz.

use super::sample::{Sample, WORD_BITS, WORD_MASK};
use crate::logging::{log, LogCategory, LogLevel};
use crate::state::StateError;
use serde::{Deserialize, Serialize};

/// Highest `sticks` value before SCLK toggles.
pub const LAST_STICK: u8 = 7;
/// Highest `shift_count` value before LRCLK toggles.
pub const LAST_BIT: u8 = (WORD_BITS - 1) as u8;
/// Transmit ticks per SCLK period.
pub const TICKS_PER_SCLK: u32 = 2 * 2 * (LAST_STICK as u32 + 1);
/// Transmit ticks per LRCLK half-period (one channel).
pub const TICKS_PER_CHANNEL: u32 = TICKS_PER_SCLK * WORD_BITS;
/// Transmit ticks per stereo frame.
pub const TICKS_PER_FRAME: u32 = 2 * TICKS_PER_CHANNEL;
/// MCLK periods per LRCLK period.
pub const MCLK_PER_FRAME: u32 = TICKS_PER_FRAME / 2;

/// Counters that derive SCLK and LRCLK from the transmit clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FrameState {
    pub sticks: u8,
    pub shift_count: u8,
    pub lrclk: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channel {
    Left,
    Right,
}

/// Levels of the four I2S lines after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct I2sPins {
    pub mclk: bool,
    pub sclk: bool,
    pub lrclk: bool,
    pub sdo: bool,
}

/// What happened on one transmit tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TxEvents {
    pub sclk_rise: bool,
    pub sclk_fall: bool,
    /// New LRCLK level when it toggled
    pub lrclk_toggle: Option<bool>,
    /// Channel whose word was loaded into the shift register
    pub reload: Option<Channel>,
}

impl TxEvents {
    pub fn lrclk_rose(&self) -> bool {
        self.lrclk_toggle == Some(true)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct I2sTransmitter {
    frame: FrameState,
    mclk: bool,
    sclk: bool,
    shift_reg: u32,
}

impl I2sTransmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear every register to its reset value.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// One transmit-domain tick. `left` and `right` are the latched words the
    /// shift register may reload from; they are read only on a reload.
    pub fn tick(&mut self, reset: bool, left: Sample, right: Sample) -> TxEvents {
        let mut events = TxEvents::default();
        if reset {
            self.reset();
            return events;
        }

        let mclk = self.mclk;
        self.mclk = !mclk;
        if mclk {
            return events;
        }

        if self.frame.sticks != LAST_STICK {
            self.frame.sticks += 1;
            return events;
        }
        self.frame.sticks = 0;

        let sclk = self.sclk;
        self.sclk = !sclk;
        if !sclk {
            events.sclk_rise = true;
            return events;
        }
        events.sclk_fall = true;

        let count = self.frame.shift_count;
        let lrclk = self.frame.lrclk;
        if count == LAST_BIT {
            self.frame.shift_count = 0;
            self.frame.lrclk = !lrclk;
            events.lrclk_toggle = Some(!lrclk);
        } else {
            self.frame.shift_count = count + 1;
        }

        if count == 0 {
            let (channel, sample) = if lrclk {
                (Channel::Left, left)
            } else {
                (Channel::Right, right)
            };
            self.shift_reg = sample.left_justified();
            events.reload = Some(channel);
            log(LogCategory::I2s, LogLevel::Trace, || {
                format!("reload {:?} = {:06X}", channel, self.shift_reg)
            });
        } else {
            let msb = self.shift_reg >> (WORD_BITS - 1);
            self.shift_reg = ((self.shift_reg << 1) | msb) & WORD_MASK;
        }
        events
    }

    /// Serial data out: MSB of the shift register.
    pub fn sdo(&self) -> bool {
        (self.shift_reg >> (WORD_BITS - 1)) & 1 != 0
    }

    pub fn pins(&self) -> I2sPins {
        I2sPins {
            mclk: self.mclk,
            sclk: self.sclk,
            lrclk: self.frame.lrclk,
            sdo: self.sdo(),
        }
    }

    pub fn frame(&self) -> FrameState {
        self.frame
    }

    pub fn shift_register(&self) -> u32 {
        self.shift_reg
    }

    /// Restore registers from a save-state, refusing counter values the
    /// hardware could never hold.
    pub fn restore(&mut self, state: I2sTransmitter) -> Result<(), StateError> {
        if state.frame.sticks > LAST_STICK {
            return Err(StateError::CounterOutOfRange {
                name: "sticks",
                value: state.frame.sticks as u64,
                max: LAST_STICK as u64,
            });
        }
        if state.frame.shift_count > LAST_BIT {
            return Err(StateError::CounterOutOfRange {
                name: "shift_count",
                value: state.frame.shift_count as u64,
                max: LAST_BIT as u64,
            });
        }
        if state.shift_reg > WORD_MASK {
            return Err(StateError::RegisterTooWide {
                name: "shift_reg",
                value: state.shift_reg as u64,
                bits: WORD_BITS,
            });
        }
        *self = state;
        Ok(())
    }
}
