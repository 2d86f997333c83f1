//! Save-state validation errors.
//!
//! A save-state is plain JSON and can be edited by hand, so every register is
//! range-checked on the way back in. Anything real hardware could not hold is
//! refused before the design is touched.

use crate::clocking::ClockDomain;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("Unsupported save-state version {0}")]
    Version(u32),
    #[error("Counter {name}={value} is past its maximum {max}")]
    CounterOutOfRange {
        name: &'static str,
        value: u64,
        max: u64,
    },
    #[error("Register {name}={value:#X} is wider than {bits} bits")]
    RegisterTooWide {
        name: &'static str,
        value: u64,
        bits: u32,
    },
    #[error("Tone divisor {divisor} is past its threshold {threshold}")]
    DivisorPastThreshold { divisor: u64, threshold: u64 },
    #[error("Sample width {actual} bits does not match the configured {expected} bits")]
    WidthMismatch { expected: u32, actual: u32 },
    #[error("{0:?} clock does not match this configuration")]
    ClockMismatch(ClockDomain),
    #[error("{0:?} clock appears more than once")]
    DuplicateClock(ClockDomain),
    #[error("{domain:?} edge at {next_edge_ps} ps is outside ({now_ps}, {now_ps} + {period_ps}] ps")]
    EdgeOutOfWindow {
        domain: ClockDomain,
        next_edge_ps: u64,
        now_ps: u64,
        period_ps: u64,
    },
}
