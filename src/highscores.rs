//! High score leaderboards
//!
//! A local top-10 of finished rounds, persisted under its own key, and a
//! simulated global board that slots the player in among fixed rivals.

use serde::{Deserialize, Serialize};

use crate::platform::storage::{KeyValueStore, StoreError};

/// Maximum number of high scores to keep
pub const MAX_HIGH_SCORES: usize = 10;

/// Rows shown on the global board
pub const GLOBAL_BOARD_SIZE: usize = 5;

/// Rivals on the simulated global board
pub const RIVALS: [(&str, u32); 4] = [
    ("SkyWalker99", 102),
    ("BirdMaster", 89),
    ("FlapKing", 76),
    ("NoobSlayer", 45),
];

/// A single high score entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    /// Round score
    pub score: u32,
    /// Theme the round finished in
    pub theme: String,
    /// Unix timestamp (ms) when achieved
    pub timestamp_ms: u64,
}

/// Local high score leaderboard
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HighScores {
    pub entries: Vec<HighScoreEntry>,
}

impl HighScores {
    /// Storage key
    pub const STORAGE_KEY: &'static str = "skyflap-leaderboard";

    /// Create empty leaderboard
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Check if a score qualifies for the leaderboard
    pub fn qualifies(&self, score: u32) -> bool {
        if score == 0 {
            return false;
        }
        if self.entries.len() < MAX_HIGH_SCORES {
            return true;
        }
        self.entries.last().map(|e| score > e.score).unwrap_or(true)
    }

    /// Get the rank a score would achieve (1-indexed, None if doesn't qualify)
    pub fn potential_rank(&self, score: u32) -> Option<usize> {
        if !self.qualifies(score) {
            return None;
        }
        let rank = self.entries.iter().position(|e| score > e.score);
        Some(rank.unwrap_or(self.entries.len()) + 1)
    }

    /// Add a new score to the leaderboard (if it qualifies)
    /// Returns the rank achieved (1-indexed) or None if didn't qualify
    pub fn add_score(&mut self, score: u32, theme: &str, timestamp_ms: u64) -> Option<usize> {
        if !self.qualifies(score) {
            return None;
        }

        let entry = HighScoreEntry {
            score,
            theme: theme.to_string(),
            timestamp_ms,
        };

        // Sorted descending; ties keep the older entry first
        let pos = self.entries.iter().position(|e| score > e.score);
        let rank = match pos {
            Some(i) => {
                self.entries.insert(i, entry);
                i + 1
            }
            None => {
                self.entries.push(entry);
                self.entries.len()
            }
        };

        self.entries.truncate(MAX_HIGH_SCORES);

        Some(rank)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top_score(&self) -> Option<u32> {
        self.entries.first().map(|e| e.score)
    }

    /// Load the leaderboard from a store
    pub fn load(store: &dyn KeyValueStore) -> Self {
        if let Ok(Some(json)) = store.get(Self::STORAGE_KEY) {
            if let Ok(scores) = serde_json::from_str::<HighScores>(&json) {
                log::info!("Loaded {} high scores", scores.entries.len());
                return scores;
            }
            log::warn!("Corrupt leaderboard, starting fresh");
        }
        log::info!("No high scores found, starting fresh");
        Self::new()
    }

    /// Save the leaderboard to a store
    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), StoreError> {
        let json =
            serde_json::to_string(self).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        store.set(Self::STORAGE_KEY, &json)?;
        log::info!("High scores saved ({} entries)", self.entries.len());
        Ok(())
    }
}

/// One row of the simulated global board
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardRow {
    pub name: String,
    pub score: u32,
}

/// Top rows of the global board with the player inserted.
/// A player named like a rival replaces nothing; the rival keeps the row.
pub fn global_leaderboard(player_name: &str, player_score: u32) -> Vec<BoardRow> {
    let name = if player_name.trim().is_empty() {
        "You"
    } else {
        player_name
    };
    let mut rows: Vec<BoardRow> = RIVALS
        .iter()
        .map(|&(name, score)| BoardRow {
            name: name.to_string(),
            score,
        })
        .collect();
    if !rows.iter().any(|r| r.name == name) {
        rows.push(BoardRow {
            name: name.to_string(),
            score: player_score,
        });
    }
    rows.sort_by(|a, b| b.score.cmp(&a.score));
    rows.truncate(GLOBAL_BOARD_SIZE);
    rows
}

/// Format a timestamp as a relative date string
pub fn format_age(timestamp_ms: u64, now_ms: u64) -> String {
    let diff_mins = now_ms.saturating_sub(timestamp_ms) / 60_000;
    let diff_hours = diff_mins / 60;
    let diff_days = diff_hours / 24;

    if diff_days >= 1 {
        match diff_days {
            1 => "Yesterday".to_string(),
            d if d < 7 => format!("{d} days ago"),
            d => format!("{} weeks ago", d / 7),
        }
    } else if diff_hours >= 1 {
        if diff_hours == 1 {
            "1 hour ago".to_string()
        } else {
            format!("{diff_hours} hours ago")
        }
    } else if diff_mins >= 1 {
        if diff_mins == 1 {
            "1 min ago".to_string()
        } else {
            format!("{diff_mins} mins ago")
        }
    } else {
        "Just now".to_string()
    }
}
