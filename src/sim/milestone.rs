//! Score milestones
//!
//! A milestone fires the first time the score reaches or passes its
//! threshold in a round, and never again until the round is reset.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneTracker {
    /// Sorted ascending, deduplicated, zero excluded
    thresholds: Vec<u32>,
    /// Highest score already checked this round
    checked_up_to: u32,
}

impl MilestoneTracker {
    pub fn new(mut thresholds: Vec<u32>) -> Self {
        thresholds.retain(|&t| t > 0);
        thresholds.sort_unstable();
        thresholds.dedup();
        Self {
            thresholds,
            checked_up_to: 0,
        }
    }

    pub fn thresholds(&self) -> &[u32] {
        &self.thresholds
    }

    /// Thresholds crossed since the last call, in ascending order
    pub fn check(&mut self, score: u32) -> Vec<u32> {
        if score <= self.checked_up_to {
            return Vec::new();
        }
        let prev = self.checked_up_to;
        self.checked_up_to = score;
        self.thresholds
            .iter()
            .copied()
            .filter(|&t| t > prev && t <= score)
            .collect()
    }

    /// Re-arm every threshold for a new round
    pub fn reset(&mut self) {
        self.checked_up_to = 0;
    }
}
