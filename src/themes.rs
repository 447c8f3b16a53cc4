//! Cosmetic themes keyed by score milestones

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Theme {
    pub id: &'static str,
    pub name: &'static str,
    /// Score that switches to this theme (0 = round default)
    pub unlock_score: u32,
    /// Skin granted the first time this theme is reached
    pub reward_skin: Option<&'static str>,
}

pub const DEFAULT_THEME: &str = "day";

pub static THEMES: [Theme; 3] = [
    Theme {
        id: DEFAULT_THEME,
        name: "Day",
        unlock_score: 0,
        reward_skin: None,
    },
    Theme {
        id: "sunset",
        name: "Sunset",
        unlock_score: 10,
        reward_skin: Some("red"),
    },
    Theme {
        id: "night",
        name: "Night",
        unlock_score: 25,
        reward_skin: Some("blue"),
    },
];

/// Milestone thresholds for the round simulation
pub fn milestone_thresholds() -> Vec<u32> {
    THEMES
        .iter()
        .map(|t| t.unlock_score)
        .filter(|&s| s > 0)
        .collect()
}

pub fn by_id(id: &str) -> Option<&'static Theme> {
    THEMES.iter().find(|t| t.id == id)
}

/// Theme unlocked at exactly this threshold
pub fn for_threshold(threshold: u32) -> Option<&'static Theme> {
    THEMES.iter().find(|t| t.unlock_score == threshold && t.unlock_score > 0)
}
