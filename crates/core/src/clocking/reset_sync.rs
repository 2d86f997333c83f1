//! Reset synchronizer for one clock domain.
//!
//! Reset asserts asynchronously: the moment the release condition drops, both
//! stages are forced high and the domain sees reset on its very next edge.
//! Deassertion walks through two registered stages, so the domain leaves reset
//! two of its own edges after the condition became true.

use crate::logging::{log, LogCategory, LogLevel};
use serde::{Deserialize, Serialize};

/// Registered stages between the release condition and the domain reset.
pub const SYNC_STAGES: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetSynchronizer {
    name: String,
    stages: [bool; SYNC_STAGES],
}

impl ResetSynchronizer {
    /// A synchronizer starts with reset asserted.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            stages: [true; SYNC_STAGES],
        }
    }

    /// Release condition for a design domain.
    pub fn release_condition(por_done: bool, pll_locked: bool) -> bool {
        por_done && pll_locked
    }

    /// One edge of the owning domain. Returns the reset level the domain's
    /// registers see on this edge.
    pub fn tick(&mut self, release: bool) -> bool {
        if !release {
            if !self.stages[SYNC_STAGES - 1] {
                log(LogCategory::Reset, LogLevel::Warn, || {
                    format!("{} domain reset re-asserted", self.name)
                });
            }
            self.stages = [true; SYNC_STAGES];
            return true;
        }

        let seen = self.stages[SYNC_STAGES - 1];
        self.stages.rotate_right(1);
        self.stages[0] = false;
        if seen && !self.stages[SYNC_STAGES - 1] {
            log(LogCategory::Reset, LogLevel::Info, || {
                format!("{} domain out of reset", self.name)
            });
        }
        seen
    }

    /// Current output of the last stage.
    pub fn is_asserted(&self) -> bool {
        self.stages[SYNC_STAGES - 1]
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn power_cycle(&mut self) {
        self.stages = [true; SYNC_STAGES];
    }
}
