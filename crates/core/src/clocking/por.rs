//! Power-on reset countdown.
//!
//! A 16-bit register loaded with 65535 at power-up and decremented once per
//! reference clock tick. When a tick finds it at zero, `done` latches and the
//! counter stops. At 12 MHz that is roughly 5.5 ms of reset after power-up.
//!
//! There is no way to re-arm the sequencer short of [`PowerOnReset::power_cycle`],
//! which stands in for removing power from the board.

use crate::logging::{log, LogCategory, LogLevel};
use serde::{Deserialize, Serialize};

pub const POR_INITIAL_COUNT: u16 = u16::MAX;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerOnReset {
    count: u16,
    done: bool,
}

impl PowerOnReset {
    pub fn new() -> Self {
        Self {
            count: POR_INITIAL_COUNT,
            done: false,
        }
    }

    /// One reference-clock tick.
    pub fn tick(&mut self) -> bool {
        if self.done {
            return true;
        }
        if self.count == 0 {
            self.done = true;
            log(LogCategory::Reset, LogLevel::Info, || {
                "power-on reset released".to_string()
            });
        } else {
            self.count -= 1;
        }
        self.done
    }

    pub fn done(&self) -> bool {
        self.done
    }

    pub fn count(&self) -> u16 {
        self.count
    }

    pub fn power_cycle(&mut self) {
        *self = Self::new();
    }
}

impl Default for PowerOnReset {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_releases_after_65536_ticks() {
        let mut por = PowerOnReset::new();
        for tick in 1..=65535u32 {
            assert!(!por.tick(), "released early at tick {}", tick);
        }
        assert_eq!(por.count(), 0);
        assert!(por.tick());
        assert!(por.done());
    }

    #[test]
    fn test_counts_down_monotonically() {
        let mut por = PowerOnReset::new();
        let mut last = por.count();
        for _ in 0..1000 {
            por.tick();
            assert_eq!(por.count(), last - 1);
            last = por.count();
        }
    }

    #[test]
    fn test_never_underflows_or_rearms() {
        let mut por = PowerOnReset::new();
        for _ in 0..70_000 {
            por.tick();
        }
        assert!(por.done());
        assert_eq!(por.count(), 0);

        for _ in 0..10 {
            assert!(por.tick());
            assert_eq!(por.count(), 0);
        }
    }

    #[test]
    fn test_power_cycle_rearms() {
        let mut por = PowerOnReset::new();
        for _ in 0..65536 {
            por.tick();
        }
        assert!(por.done());
        por.power_cycle();
        assert!(!por.done());
        assert_eq!(por.count(), POR_INITIAL_COUNT);
    }
}
