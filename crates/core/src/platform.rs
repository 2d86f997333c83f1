//! Board collaborator: named I/O line acquisition and clock constraints.
//!
//! The design never touches pins directly. It asks a [`Platform`] for a line by
//! name and index, gets back a [`Signal`] describing its width and direction,
//! and tells the platform about every clock it derives so the build side can
//! close timing.

use crate::logging::{log, LogCategory, LogLevel};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Errors raised while acquiring board resources
#[derive(Debug, Error, PartialEq)]
pub enum PlatformError {
    #[error("Unknown resource: {name}:{index}")]
    UnknownResource { name: String, index: u32 },
    #[error("Resource already requested: {name}:{index}")]
    AlreadyRequested { name: String, index: u32 },
    #[error("Resource {name}:{index} is {actual:?}, expected {expected:?}")]
    WrongDirection {
        name: String,
        index: u32,
        expected: Direction,
        actual: Direction,
    },
    #[error("Resource {name}:{index} is {actual} bit(s) wide, expected {expected}")]
    WrongWidth {
        name: String,
        index: u32,
        expected: u32,
        actual: u32,
    },
    #[error("Invalid clock period for {0}: {1} ns")]
    InvalidPeriod(String, f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Input,
    Output,
    /// Usable as either; the PMOD headers are wired this way.
    InOut,
}

impl Direction {
    fn satisfies(self, wanted: Direction) -> bool {
        self == wanted || self == Direction::InOut
    }
}

/// A line handed out by the platform
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signal {
    pub name: String,
    pub index: u32,
    pub width: u32,
    pub direction: Direction,
}

impl Signal {
    pub fn id(&self) -> String {
        format!("{}:{}", self.name, self.index)
    }

    /// Check that this line can carry `width` bits in `direction`.
    pub fn expect(&self, direction: Direction, width: u32) -> Result<(), PlatformError> {
        if !self.direction.satisfies(direction) {
            return Err(PlatformError::WrongDirection {
                name: self.name.clone(),
                index: self.index,
                expected: direction,
                actual: self.direction,
            });
        }
        if self.width != width {
            return Err(PlatformError::WrongWidth {
                name: self.name.clone(),
                index: self.index,
                expected: width,
                actual: self.width,
            });
        }
        Ok(())
    }
}

/// A clock net the design derives (or receives) and constrains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockSignal {
    pub name: String,
    pub frequency_hz: f64,
}

impl ClockSignal {
    pub fn new(name: &str, frequency_hz: f64) -> Self {
        Self {
            name: name.to_string(),
            frequency_hz,
        }
    }

    pub fn period_ns(&self) -> f64 {
        1e9 / self.frequency_hz
    }
}

/// A timing constraint as recorded for the build collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockConstraint {
    pub clock: String,
    pub period_ns: f64,
}

/// Capability the design consumes from the board
pub trait Platform {
    /// Acquire a named line. Each (name, index) pair can be requested once.
    fn request(&mut self, name: &str, index: u32) -> Result<Signal, PlatformError>;

    /// Record a required period for a clock net.
    fn declare_clock_period(
        &mut self,
        clock: &ClockSignal,
        period_ns: f64,
    ) -> Result<(), PlatformError>;

    /// Period used for clocks nobody constrained explicitly.
    fn set_default_clock_period(&mut self, period_ns: f64);
}

/// One row of the board resource table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub index: u32,
    pub width: u32,
    pub direction: Direction,
}

impl Resource {
    pub fn new(name: &str, index: u32, width: u32, direction: Direction) -> Self {
        Self {
            name: name.to_string(),
            index,
            width,
            direction,
        }
    }
}

/// In-memory board used for simulation: a resource table plus the
/// constraints declared against it.
#[derive(Debug, Clone, Default)]
pub struct SimPlatform {
    resources: Vec<Resource>,
    claimed: HashSet<(String, u32)>,
    constraints: Vec<ClockConstraint>,
    default_clock_period_ns: Option<f64>,
}

impl SimPlatform {
    /// Empty board; add lines with [`SimPlatform::add_extension`].
    pub fn new() -> Self {
        Self::default()
    }

    /// 12 MHz oscillator, the user button and two 8-pin PMOD headers.
    pub fn icebreaker() -> Self {
        let mut platform = Self::new();
        platform.add_extension(vec![
            Resource::new("clk12", 0, 1, Direction::Input),
            Resource::new("user_btn_n", 0, 1, Direction::Input),
        ]);
        for header in ["pmod1", "pmod2"] {
            platform.add_extension(
                (0..8)
                    .map(|pin| Resource::new(&format!("{}_{}", header, pin), 0, 1, Direction::InOut))
                    .collect(),
            );
        }
        platform
    }

    pub fn add_extension(&mut self, resources: Vec<Resource>) {
        self.resources.extend(resources);
    }

    pub fn constraints(&self) -> &[ClockConstraint] {
        &self.constraints
    }

    pub fn default_clock_period_ns(&self) -> Option<f64> {
        self.default_clock_period_ns
    }

    pub fn is_claimed(&self, name: &str, index: u32) -> bool {
        self.claimed.contains(&(name.to_string(), index))
    }
}

impl Platform for SimPlatform {
    fn request(&mut self, name: &str, index: u32) -> Result<Signal, PlatformError> {
        let resource = self
            .resources
            .iter()
            .find(|r| r.name == name && r.index == index)
            .ok_or_else(|| PlatformError::UnknownResource {
                name: name.to_string(),
                index,
            })?;

        if !self.claimed.insert((name.to_string(), index)) {
            return Err(PlatformError::AlreadyRequested {
                name: name.to_string(),
                index,
            });
        }

        log(LogCategory::Platform, LogLevel::Debug, || {
            format!("claimed {}:{} ({:?})", name, index, resource.direction)
        });

        Ok(Signal {
            name: resource.name.clone(),
            index: resource.index,
            width: resource.width,
            direction: resource.direction,
        })
    }

    fn declare_clock_period(
        &mut self,
        clock: &ClockSignal,
        period_ns: f64,
    ) -> Result<(), PlatformError> {
        if !(period_ns.is_finite() && period_ns > 0.0) {
            return Err(PlatformError::InvalidPeriod(clock.name.clone(), period_ns));
        }
        log(LogCategory::Clock, LogLevel::Info, || {
            format!("period constraint {} = {:.3} ns", clock.name, period_ns)
        });
        self.constraints.push(ClockConstraint {
            clock: clock.name.clone(),
            period_ns,
        });
        Ok(())
    }

    fn set_default_clock_period(&mut self, period_ns: f64) {
        self.default_clock_period_ns = Some(period_ns);
    }
}
