//! Simulated duel opponent
//!
//! A duel is requested against a named opponent, accepted after a short
//! delay, and becomes active on the next round start. While the round is
//! playing the opponent's score ticks up on its own timer.

use rand::Rng;
use serde::{Deserialize, Serialize};

pub const DUEL_ACCEPT_DELAY_MS: u64 = 2_000;
pub const DUEL_TICK_MS: u64 = 1_500;
pub const DUEL_SCORE_CHANCE: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuelStatus {
    /// Waiting for the opponent to accept
    Pending { accept_at_ms: u64 },
    /// Accepted; starts with the next round
    Accepted,
    /// Round in progress
    Active,
    /// Round over
    Finished(DuelOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuelOutcome {
    Won,
    Lost,
    Draw,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuelEvent {
    Requested { opponent: String },
    Accepted { opponent: String },
    OpponentScored { score: u32 },
    Finished {
        outcome: DuelOutcome,
        player_score: u32,
        opponent_score: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Duel {
    pub opponent_name: String,
    pub opponent_score: u32,
    pub status: DuelStatus,
}

impl Duel {
    pub fn request(opponent_name: &str, now_ms: u64) -> Self {
        Self {
            opponent_name: opponent_name.to_string(),
            opponent_score: 0,
            status: DuelStatus::Pending {
                accept_at_ms: now_ms + DUEL_ACCEPT_DELAY_MS,
            },
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == DuelStatus::Active
    }

    /// Pending -> Accepted once the delay has passed
    pub fn poll_accept(&mut self, now_ms: u64) -> Option<DuelEvent> {
        match self.status {
            DuelStatus::Pending { accept_at_ms } if now_ms >= accept_at_ms => {
                self.status = DuelStatus::Accepted;
                Some(DuelEvent::Accepted {
                    opponent: self.opponent_name.clone(),
                })
            }
            _ => None,
        }
    }

    /// Accepted -> Active at round start. Returns false unless the duel went live;
    /// the session then drops it.
    pub fn on_round_begin(&mut self) -> bool {
        if self.status == DuelStatus::Accepted {
            self.status = DuelStatus::Active;
            self.opponent_score = 0;
            true
        } else {
            false
        }
    }

    /// One opponent timer tick
    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<DuelEvent> {
        if !self.is_active() {
            return None;
        }
        if rng.random_bool(DUEL_SCORE_CHANCE) {
            self.opponent_score += 1;
            Some(DuelEvent::OpponentScored {
                score: self.opponent_score,
            })
        } else {
            None
        }
    }

    /// Active -> Finished with the player's final score
    pub fn on_round_end(&mut self, player_score: u32) -> Option<DuelEvent> {
        if !self.is_active() {
            return None;
        }
        let outcome = match player_score.cmp(&self.opponent_score) {
            std::cmp::Ordering::Greater => DuelOutcome::Won,
            std::cmp::Ordering::Less => DuelOutcome::Lost,
            std::cmp::Ordering::Equal => DuelOutcome::Draw,
        };
        self.status = DuelStatus::Finished(outcome);
        Some(DuelEvent::Finished {
            outcome,
            player_score,
            opponent_score: self.opponent_score,
        })
    }
}
