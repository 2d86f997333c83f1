//! Pin transition recorder, the software stand-in for a logic analyser.
//!
//! Only changes are stored. MCLK toggles on every transmit tick and would
//! swamp everything else, so it is left out unless asked for.

use crate::audio::I2sPins;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pin {
    Mclk,
    Sclk,
    Lrclk,
    Sdo,
    Trigger,
}

/// Everything the design drives, sampled after a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PinLevels {
    pub i2s: I2sPins,
    pub trigger: bool,
}

impl PinLevels {
    fn level(&self, pin: Pin) -> bool {
        match pin {
            Pin::Mclk => self.i2s.mclk,
            Pin::Sclk => self.i2s.sclk,
            Pin::Lrclk => self.i2s.lrclk,
            Pin::Sdo => self.i2s.sdo,
            Pin::Trigger => self.trigger,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinEdge {
    pub time_ps: u64,
    pub pin: Pin,
    pub level: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveTrace {
    include_mclk: bool,
    capacity: usize,
    #[serde(skip)]
    last: Option<PinLevels>,
    edges: Vec<PinEdge>,
    truncated: bool,
}

impl WaveTrace {
    /// Record at most `capacity` transitions.
    pub fn new(capacity: usize, include_mclk: bool) -> Self {
        Self {
            include_mclk,
            capacity,
            last: None,
            edges: Vec::new(),
            truncated: false,
        }
    }

    pub fn record(&mut self, time_ps: u64, levels: PinLevels) {
        let previous = self.last.replace(levels).unwrap_or_default();
        let pins = [Pin::Mclk, Pin::Sclk, Pin::Lrclk, Pin::Sdo, Pin::Trigger];
        for pin in pins {
            if pin == Pin::Mclk && !self.include_mclk {
                continue;
            }
            let level = levels.level(pin);
            if level == previous.level(pin) {
                continue;
            }
            if self.edges.len() >= self.capacity {
                self.truncated = true;
                return;
            }
            self.edges.push(PinEdge {
                time_ps,
                pin,
                level,
            });
        }
    }

    pub fn edges(&self) -> &[PinEdge] {
        &self.edges
    }

    /// Transitions of a single pin, in time order.
    pub fn edges_of(&self, pin: Pin) -> impl Iterator<Item = &PinEdge> + '_ {
        self.edges.iter().filter(move |e| e.pin == pin)
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }

    pub fn clear(&mut self) {
        self.last = None;
        self.edges.clear();
        self.truncated = false;
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(sclk: bool, sdo: bool, mclk: bool) -> PinLevels {
        PinLevels {
            i2s: I2sPins {
                mclk,
                sclk,
                lrclk: false,
                sdo,
            },
            trigger: false,
        }
    }

    #[test]
    fn test_records_only_changes() {
        let mut trace = WaveTrace::new(100, false);
        trace.record(10, levels(false, false, true));
        trace.record(20, levels(true, false, false));
        trace.record(30, levels(true, true, true));
        trace.record(40, levels(true, true, false));

        let edges = trace.edges();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0], PinEdge { time_ps: 20, pin: Pin::Sclk, level: true });
        assert_eq!(edges[1], PinEdge { time_ps: 30, pin: Pin::Sdo, level: true });
    }

    #[test]
    fn test_mclk_opt_in() {
        let mut trace = WaveTrace::new(100, true);
        trace.record(1, levels(false, false, true));
        trace.record(2, levels(false, false, false));
        assert_eq!(trace.edges_of(Pin::Mclk).count(), 2);
    }

    #[test]
    fn test_capacity_truncates() {
        let mut trace = WaveTrace::new(3, false);
        for t in 0..10u64 {
            trace.record(t, levels(t % 2 == 1, false, false));
        }
        assert_eq!(trace.edges().len(), 3);
        assert!(trace.truncated());

        trace.clear();
        assert!(trace.edges().is_empty());
        assert!(!trace.truncated());
    }

    #[test]
    fn test_json_output() {
        let mut trace = WaveTrace::new(10, false);
        trace.record(5, levels(true, false, false));
        let json = trace.to_json().unwrap();
        assert!(json.contains("\"Sclk\""));
        assert!(json.contains("\"time_ps\": 5"));
    }
}
