//! Clock generation and reset sequencing.
//!
//! - **PowerOnReset**: one-shot countdown on the reference clock
//! - **PllClockGenerator**: derived system/transmit clocks and lock indicator
//! - **ResetSynchronizer**: per-domain reset gated on POR done and PLL lock
//! - **EdgeScheduler**: picosecond timeline that clocks each domain

pub mod pll;
pub mod por;
pub mod reset_sync;
pub mod scheduler;

pub use pll::{PllClockGenerator, PllConfig, PllState};
pub use por::PowerOnReset;
pub use reset_sync::ResetSynchronizer;
pub use scheduler::{ClockDomain, EdgeScheduler, Edges};
