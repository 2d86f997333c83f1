//! Simple-feedback PLL: divider search, validation, derived clocks and lock.
//!
//! The output frequency is `f_ref * (DIVF + 1) / ((DIVR + 1) * 2^DIVQ)`. Each
//! intermediate frequency has a legal window; a configuration outside any of
//! them is refused before a clock is ever handed to the design.

use crate::config::ConfigError;
use crate::logging::{log, LogCategory, LogLevel};
use crate::platform::{ClockSignal, Platform, PlatformError};
use serde::{Deserialize, Serialize};

const REF_MIN_HZ: f64 = 10e6;
const REF_MAX_HZ: f64 = 133e6;
const PFD_MIN_HZ: f64 = 10e6;
const PFD_MAX_HZ: f64 = 133e6;
const VCO_MIN_HZ: f64 = 533e6;
const VCO_MAX_HZ: f64 = 1066e6;
const OUT_MIN_HZ: f64 = 16e6;
const OUT_MAX_HZ: f64 = 275e6;

const DIVR_MAX: u32 = 15;
const DIVF_MAX: u32 = 127;
const DIVQ_MIN: u32 = 1;
const DIVQ_MAX: u32 = 6;

/// Largest relative distance between the requested and the achieved output.
pub const MAX_OUTPUT_ERROR: f64 = 0.01;

/// Divider settings of the PLL block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PllConfig {
    /// Reference divider, divides by `divr + 1`
    pub divr: u32,
    /// Feedback divider, multiplies by `divf + 1`
    pub divf: u32,
    /// Output divider, divides by `2^divq`
    pub divq: u32,
    /// Loop filter setting, chosen from the PFD frequency
    pub filter_range: u32,
}

fn check_param(name: &'static str, value: u32, min: u32, max: u32) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::PllParameter {
            name,
            value,
            min,
            max,
        })
    }
}

fn check_freq(stage: &'static str, hz: f64, min_hz: f64, max_hz: f64) -> Result<(), ConfigError> {
    if hz >= min_hz && hz <= max_hz {
        Ok(())
    } else {
        Err(ConfigError::PllFrequency {
            stage,
            hz,
            min_hz,
            max_hz,
        })
    }
}

fn filter_range_for(pfd_hz: f64) -> u32 {
    match pfd_hz {
        f if f < 17e6 => 1,
        f if f < 26e6 => 2,
        f if f < 44e6 => 3,
        f if f < 66e6 => 4,
        f if f < 101e6 => 5,
        _ => 6,
    }
}

fn check_reference(reference_hz: f64) -> Result<(), ConfigError> {
    if reference_hz.is_finite() && (REF_MIN_HZ..=REF_MAX_HZ).contains(&reference_hz) {
        Ok(())
    } else {
        Err(ConfigError::ReferenceOutOfRange(reference_hz))
    }
}

impl PllConfig {
    /// Search every legal divider combination for the output closest to
    /// `target_hz`. Ties go to the smallest reference divider.
    pub fn for_target(reference_hz: f64, target_hz: f64) -> Result<Self, ConfigError> {
        check_reference(reference_hz)?;
        if !(target_hz.is_finite() && target_hz > 0.0) {
            return Err(ConfigError::InvalidPllTarget(target_hz));
        }

        let mut best: Option<(PllConfig, f64)> = None;
        for divr in 0..=DIVR_MAX {
            let pfd = reference_hz / (divr + 1) as f64;
            if !(PFD_MIN_HZ..=PFD_MAX_HZ).contains(&pfd) {
                continue;
            }
            for divq in DIVQ_MIN..=DIVQ_MAX {
                let mult = (target_hz * (1u32 << divq) as f64 / pfd).round();
                if mult < 1.0 || mult > (DIVF_MAX + 1) as f64 {
                    continue;
                }
                let candidate = PllConfig {
                    divr,
                    divf: mult as u32 - 1,
                    divq,
                    filter_range: filter_range_for(pfd),
                };
                let Ok(out) = candidate.output_hz(reference_hz) else {
                    continue;
                };
                let better = match best {
                    None => true,
                    Some((_, best_out)) => (out - target_hz).abs() < (best_out - target_hz).abs(),
                };
                if better {
                    best = Some((candidate, out));
                }
            }
        }

        match best {
            Some((config, out)) if ((out - target_hz) / target_hz).abs() <= MAX_OUTPUT_ERROR => {
                Ok(config)
            }
            other => Err(ConfigError::PllTargetUnreachable {
                target_hz,
                best_hz: other.map(|(_, out)| out),
            }),
        }
    }

    /// Validate every parameter and frequency window and return `f_out`.
    pub fn output_hz(&self, reference_hz: f64) -> Result<f64, ConfigError> {
        check_param("DIVR", self.divr, 0, DIVR_MAX)?;
        check_param("DIVF", self.divf, 0, DIVF_MAX)?;
        check_param("DIVQ", self.divq, DIVQ_MIN, DIVQ_MAX)?;
        check_param("FILTER_RANGE", self.filter_range, 0, 7)?;
        check_reference(reference_hz)?;

        let pfd = reference_hz / (self.divr + 1) as f64;
        check_freq("PFD", pfd, PFD_MIN_HZ, PFD_MAX_HZ)?;
        let vco = pfd * (self.divf + 1) as f64;
        check_freq("VCO", vco, VCO_MIN_HZ, VCO_MAX_HZ)?;
        let out = vco / (1u32 << self.divq) as f64;
        check_freq("output", out, OUT_MIN_HZ, OUT_MAX_HZ)?;
        Ok(out)
    }
}

/// Registered lock status, the only part of the PLL that changes at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PllState {
    pub locked: bool,
    pub lock_count: u32,
}

/// PLL with two global outputs: one for the system domain, one for the
/// transmit domain, both at the configured output frequency.
#[derive(Debug, Clone)]
pub struct PllClockGenerator {
    config: PllConfig,
    output_hz: f64,
    lock_ticks: u32,
    state: PllState,
}

impl PllClockGenerator {
    pub fn new(config: PllConfig, reference_hz: f64, lock_ticks: u32) -> Result<Self, ConfigError> {
        let output_hz = config.output_hz(reference_hz)?;
        if lock_ticks == 0 {
            return Err(ConfigError::ZeroLockTicks);
        }
        log(LogCategory::Clock, LogLevel::Info, || {
            format!(
                "PLL DIVR={} DIVF={} DIVQ={} FILTER_RANGE={}: {:.3} MHz -> {:.3} MHz",
                config.divr,
                config.divf,
                config.divq,
                config.filter_range,
                reference_hz / 1e6,
                output_hz / 1e6
            )
        });
        Ok(Self {
            config,
            output_hz,
            lock_ticks,
            state: PllState::default(),
        })
    }

    pub fn config(&self) -> PllConfig {
        self.config
    }

    pub fn output_hz(&self) -> f64 {
        self.output_hz
    }

    pub fn sys_clock(&self) -> ClockSignal {
        ClockSignal::new("sys", self.output_hz)
    }

    pub fn i2s_clock(&self) -> ClockSignal {
        ClockSignal::new("i2s", self.output_hz)
    }

    /// Tell the build side about both derived clocks.
    pub fn declare_constraints(&self, platform: &mut dyn Platform) -> Result<(), PlatformError> {
        for clock in [self.sys_clock(), self.i2s_clock()] {
            platform.declare_clock_period(&clock, clock.period_ns())?;
        }
        platform.set_default_clock_period(1e9 / self.output_hz);
        Ok(())
    }

    /// One reference-clock tick. `resetb` is the active-low PLL reset.
    pub fn tick(&mut self, resetb: bool) -> bool {
        if !resetb {
            if self.state.locked {
                log(LogCategory::Clock, LogLevel::Warn, || {
                    "PLL held in reset, lock lost".to_string()
                });
            }
            self.state = PllState::default();
            return false;
        }

        if !self.state.locked {
            self.state.lock_count += 1;
            if self.state.lock_count >= self.lock_ticks {
                self.state.locked = true;
                log(LogCategory::Clock, LogLevel::Info, || {
                    format!("PLL locked after {} reference ticks", self.state.lock_count)
                });
            }
        }
        self.state.locked
    }

    pub fn locked(&self) -> bool {
        self.state.locked
    }

    pub fn state(&self) -> PllState {
        self.state
    }

    pub fn restore(&mut self, state: PllState) {
        self.state = state;
    }

    /// Back to the unlocked power-on state.
    pub fn power_cycle(&mut self) {
        self.state = PllState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::SimPlatform;

    #[test]
    fn test_search_picks_closest_legal_dividers() {
        let cfg = PllConfig::for_target(12e6, 50e6).unwrap();
        assert_eq!((cfg.divr, cfg.divf, cfg.divq, cfg.filter_range), (0, 66, 4, 1));
        assert!((cfg.output_hz(12e6).unwrap() - 50.25e6).abs() < 1.0);
    }

    #[test]
    fn test_search_exact_when_possible() {
        let cfg = PllConfig::for_target(12e6, 48e6).unwrap();
        assert_eq!((cfg.divr, cfg.divf, cfg.divq), (0, 63, 4));
        assert!((cfg.output_hz(12e6).unwrap() - 48e6).abs() < 1.0);
    }

    #[test]
    fn test_search_results_are_always_legal() {
        for mhz in (20..=200).step_by(7) {
            let target = mhz as f64 * 1e6;
            let cfg = PllConfig::for_target(12e6, target).unwrap();
            let out = cfg.output_hz(12e6).unwrap();
            assert!(((out - target) / target).abs() <= MAX_OUTPUT_ERROR, "{} MHz", mhz);
        }
    }

    #[test]
    fn test_rejects_unreachable_targets() {
        assert!(matches!(
            PllConfig::for_target(12e6, 5e6),
            Err(ConfigError::PllTargetUnreachable { .. })
        ));
        assert!(matches!(
            PllConfig::for_target(12e6, 400e6),
            Err(ConfigError::PllTargetUnreachable { .. })
        ));
        assert_eq!(
            PllConfig::for_target(12e6, 0.0),
            Err(ConfigError::InvalidPllTarget(0.0))
        );
        assert_eq!(
            PllConfig::for_target(200e6, 50e6),
            Err(ConfigError::ReferenceOutOfRange(200e6))
        );
    }

    #[test]
    fn test_rejects_vco_out_of_window() {
        // 12 MHz / 3 * 50 = 200 MHz VCO, far below the window.
        let cfg = PllConfig {
            divr: 2,
            divf: 49,
            divq: 2,
            filter_range: 1,
        };
        assert!(matches!(
            cfg.output_hz(12e6),
            Err(ConfigError::PllFrequency { stage: "PFD", .. })
        ));

        let cfg = PllConfig {
            divr: 0,
            divf: 39,
            divq: 2,
            filter_range: 1,
        };
        assert!(matches!(
            cfg.output_hz(12e6),
            Err(ConfigError::PllFrequency { stage: "VCO", .. })
        ));
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let cfg = PllConfig {
            divr: 16,
            divf: 49,
            divq: 2,
            filter_range: 1,
        };
        assert!(matches!(
            cfg.output_hz(12e6),
            Err(ConfigError::PllParameter { name: "DIVR", .. })
        ));

        let cfg = PllConfig {
            divr: 0,
            divf: 66,
            divq: 0,
            filter_range: 1,
        };
        assert!(matches!(
            cfg.output_hz(12e6),
            Err(ConfigError::PllParameter { name: "DIVQ", .. })
        ));
    }

    fn pll(lock_ticks: u32) -> PllClockGenerator {
        let cfg = PllConfig::for_target(12e6, 50e6).unwrap();
        PllClockGenerator::new(cfg, 12e6, lock_ticks).unwrap()
    }

    #[test]
    fn test_lock_after_configured_ticks() {
        let mut pll = pll(10);
        for _ in 0..9 {
            assert!(!pll.tick(true));
        }
        assert!(pll.tick(true));
        assert!(pll.locked());
        assert_eq!(pll.state().lock_count, 10);
    }

    #[test]
    fn test_reset_drops_lock_and_restarts_countdown() {
        let mut pll = pll(3);
        for _ in 0..3 {
            pll.tick(true);
        }
        assert!(pll.locked());

        assert!(!pll.tick(false));
        assert_eq!(pll.state(), PllState::default());

        assert!(!pll.tick(true));
        assert!(!pll.tick(true));
        assert!(pll.tick(true));
    }

    #[test]
    fn test_zero_lock_time_rejected() {
        let cfg = PllConfig::for_target(12e6, 50e6).unwrap();
        assert_eq!(
            PllClockGenerator::new(cfg, 12e6, 0).err(),
            Some(ConfigError::ZeroLockTicks)
        );
    }

    #[test]
    fn test_declares_both_domains() {
        let cfg = PllConfig::for_target(12e6, 48e6).unwrap();
        let pll = PllClockGenerator::new(cfg, 12e6, 600).unwrap();
        let mut platform = SimPlatform::new();
        pll.declare_constraints(&mut platform).unwrap();

        let names: Vec<_> = platform.constraints().iter().map(|c| c.clock.as_str()).collect();
        assert_eq!(names, ["sys", "i2s"]);
        let period = 1e9 / 48e6;
        for c in platform.constraints() {
            assert!((c.period_ns - period).abs() < 1e-9);
        }
        assert_eq!(platform.default_clock_period_ns(), Some(period));
    }
}
