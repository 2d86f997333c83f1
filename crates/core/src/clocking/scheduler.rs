//! Shared timeline for every clock domain.
//!
//! Each domain clock has an integer period in picoseconds. [`EdgeScheduler::advance`]
//! jumps to the earliest pending rising edge and reports every domain whose edge
//! lands on that instant, so coincident edges are handled as one step.

use crate::state::StateError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClockDomain {
    /// Raw oscillator: power-on reset and PLL lock counters
    Reference,
    /// PLL output A: tone generation
    System,
    /// PLL output B: I2S transmitter
    Transmit,
}

impl ClockDomain {
    fn bit(self) -> u8 {
        match self {
            ClockDomain::Reference => 1,
            ClockDomain::System => 2,
            ClockDomain::Transmit => 4,
        }
    }
}

/// Domains that have an edge at the current instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Edges(u8);

impl Edges {
    pub fn contains(self, domain: ClockDomain) -> bool {
        self.0 & domain.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

pub fn period_ps(frequency_hz: f64) -> u64 {
    (1e12 / frequency_hz).round().max(1.0) as u64
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct DomainClock {
    domain: ClockDomain,
    period_ps: u64,
    next_edge_ps: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EdgeScheduler {
    now_ps: u64,
    clocks: Vec<DomainClock>,
}

impl EdgeScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a domain; its first edge is one period after time zero.
    pub fn add_clock(&mut self, domain: ClockDomain, frequency_hz: f64) {
        let period_ps = period_ps(frequency_hz);
        self.clocks.push(DomainClock {
            domain,
            period_ps,
            next_edge_ps: self.now_ps + period_ps,
        });
    }

    /// Move to the next edge instant and return the domains clocked there.
    pub fn advance(&mut self) -> Edges {
        let Some(next) = self.clocks.iter().map(|c| c.next_edge_ps).min() else {
            return Edges::default();
        };
        self.now_ps = next;

        let mut edges = Edges::default();
        for clock in self.clocks.iter_mut().filter(|c| c.next_edge_ps == next) {
            edges.0 |= clock.domain.bit();
            clock.next_edge_ps += clock.period_ps;
        }
        edges
    }

    pub fn now_ps(&self) -> u64 {
        self.now_ps
    }

    pub fn period_of(&self, domain: ClockDomain) -> Option<u64> {
        self.clocks
            .iter()
            .find(|c| c.domain == domain)
            .map(|c| c.period_ps)
    }

    /// Check a timeline read back from a save-state. Each domain may appear
    /// once, and its next edge must lie within one period after `now_ps`.
    pub fn check(&self) -> Result<(), StateError> {
        for (i, clock) in self.clocks.iter().enumerate() {
            if self.clocks[..i].iter().any(|c| c.domain == clock.domain) {
                return Err(StateError::DuplicateClock(clock.domain));
            }
            let window_end = self.now_ps.saturating_add(clock.period_ps);
            if clock.next_edge_ps <= self.now_ps || clock.next_edge_ps > window_end {
                return Err(StateError::EdgeOutOfWindow {
                    domain: clock.domain,
                    next_edge_ps: clock.next_edge_ps,
                    now_ps: self.now_ps,
                    period_ps: clock.period_ps,
                });
            }
        }
        Ok(())
    }

    /// Back to time zero with the same clocks.
    pub fn rewind(&mut self) {
        self.now_ps = 0;
        for clock in &mut self.clocks {
            clock.next_edge_ps = clock.period_ps;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_rounding() {
        assert_eq!(period_ps(50e6), 20_000);
        assert_eq!(period_ps(12e6), 83_333);
        assert_eq!(period_ps(48e6), 20_833);
    }

    #[test]
    fn test_empty_scheduler_does_nothing() {
        let mut sched = EdgeScheduler::new();
        assert!(sched.advance().is_empty());
        assert_eq!(sched.now_ps(), 0);
    }

    #[test]
    fn test_coincident_edges_reported_together() {
        let mut sched = EdgeScheduler::new();
        sched.add_clock(ClockDomain::System, 50e6);
        sched.add_clock(ClockDomain::Transmit, 50e6);

        let edges = sched.advance();
        assert!(edges.contains(ClockDomain::System));
        assert!(edges.contains(ClockDomain::Transmit));
        assert!(!edges.contains(ClockDomain::Reference));
        assert_eq!(sched.now_ps(), 20_000);
    }

    #[test]
    fn test_edge_counts_follow_frequency_ratio() {
        let mut sched = EdgeScheduler::new();
        sched.add_clock(ClockDomain::Reference, 10e6);
        sched.add_clock(ClockDomain::System, 50e6);

        let (mut reference, mut system) = (0, 0);
        while sched.now_ps() < 1_000_000 {
            let edges = sched.advance();
            reference += edges.contains(ClockDomain::Reference) as u32;
            system += edges.contains(ClockDomain::System) as u32;
        }
        assert_eq!(reference, 10);
        assert_eq!(system, 50);
    }

    #[test]
    fn test_check_accepts_live_timelines() {
        let mut sched = EdgeScheduler::new();
        sched.add_clock(ClockDomain::Reference, 12e6);
        sched.add_clock(ClockDomain::System, 50e6);
        assert_eq!(sched.check(), Ok(()));
        for _ in 0..1000 {
            sched.advance();
            assert_eq!(sched.check(), Ok(()));
        }
    }

    #[test]
    fn test_check_rejects_edges_in_the_past() {
        let mut sched = EdgeScheduler::new();
        sched.add_clock(ClockDomain::System, 50e6);
        sched.advance();
        sched.advance();

        sched.clocks[0].next_edge_ps = 1;
        assert!(matches!(
            sched.check(),
            Err(StateError::EdgeOutOfWindow { domain: ClockDomain::System, next_edge_ps: 1, .. })
        ));

        // Coinciding with now would never fire again.
        sched.clocks[0].next_edge_ps = sched.now_ps();
        assert!(sched.check().is_err());
    }

    #[test]
    fn test_check_rejects_edges_too_far_ahead() {
        let mut sched = EdgeScheduler::new();
        sched.add_clock(ClockDomain::Transmit, 50e6);
        sched.clocks[0].next_edge_ps = 20_001;
        assert!(matches!(sched.check(), Err(StateError::EdgeOutOfWindow { .. })));
        sched.clocks[0].next_edge_ps = 20_000;
        assert_eq!(sched.check(), Ok(()));
    }

    #[test]
    fn test_check_rejects_duplicate_domains() {
        let mut sched = EdgeScheduler::new();
        sched.add_clock(ClockDomain::System, 50e6);
        sched.add_clock(ClockDomain::System, 48e6);
        assert_eq!(
            sched.check(),
            Err(StateError::DuplicateClock(ClockDomain::System))
        );
    }

    #[test]
    fn test_rewind() {
        let mut sched = EdgeScheduler::new();
        sched.add_clock(ClockDomain::Reference, 12e6);
        sched.advance();
        sched.advance();
        sched.rewind();
        assert_eq!(sched.now_ps(), 0);
        sched.advance();
        assert_eq!(sched.now_ps(), 83_333);
        assert_eq!(sched.period_of(ClockDomain::Reference), Some(83_333));
        assert_eq!(sched.period_of(ClockDomain::System), None);
    }
}
