//! One-of-one reward skins
//!
//! A round that beats [`UNIQUE_SKIN_MIN_SCORE`] earns a unique skin from an
//! external generator. The generator only proposes a name, pattern and value;
//! the session assigns the id, clamps the value and owns the result. A failed
//! or malformed proposal simply means no reward.

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Deserialize;
use thiserror::Error;

use crate::market::catalog::{Pattern, Rarity, Skin};

/// Scores strictly above this earn a unique skin
pub const UNIQUE_SKIN_MIN_SCORE: u32 = 100;
pub const UNIQUE_PRICE_MIN: u64 = 5_000;
pub const UNIQUE_PRICE_MAX: u64 = 20_000;
/// Used when the generator returns a blank name
pub const FALLBACK_SKIN_NAME: &str = "Mythic Flyer";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MintError {
    #[error("skin generation timed out")]
    Timeout,

    #[error("skin generation service error: {0}")]
    Service(String),

    #[error("malformed skin proposal: {0}")]
    Malformed(String),
}

/// What a generator proposes
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SkinDraft {
    pub name: String,
    #[serde(default)]
    pub pattern: Pattern,
    pub price: u64,
}

impl SkinDraft {
    /// Parse a generator's JSON reply
    pub fn from_json(text: &str) -> Result<Self, MintError> {
        serde_json::from_str(text.trim()).map_err(|e| MintError::Malformed(e.to_string()))
    }

    /// Turn the proposal into a catalog skin under `id`
    pub fn into_skin(self, id: String) -> Skin {
        let name = self.name.trim();
        Skin {
            id,
            name: if name.is_empty() {
                FALLBACK_SKIN_NAME.to_string()
            } else {
                name.to_string()
            },
            rarity: Rarity::Unique,
            pattern: self.pattern,
            price: self.price.clamp(UNIQUE_PRICE_MIN, UNIQUE_PRICE_MAX),
        }
    }
}

pub fn earns_unique_skin(score: u32) -> bool {
    score > UNIQUE_SKIN_MIN_SCORE
}

/// Prompt sent to the skin generator
pub fn prompt_for(score: u32) -> String {
    format!(
        "Generate a valid JSON object representing a unique, 1-of-1 limited edition bird skin.\n\
         This skin is a reward for a high score of {score}.\n\
         Use exactly this structure with no markdown:\n\
         {{\"name\": string, \"pattern\": \"Solid\" | \"Gradient\" | \"Striped\" | \"Dots\" | \"Checkered\", \
         \"price\": number between {UNIQUE_PRICE_MIN} and {UNIQUE_PRICE_MAX}}}"
    )
}

/// Message shown instead of commentary after a successful mint
pub fn unlock_message(skin_name: &str) -> String {
    format!("UNBELIEVABLE! You unlocked a world-unique skin: {skin_name}")
}

/// Skin generator keyed by score
pub trait SkinMinter {
    fn mint(&mut self, score: u32) -> Result<SkinDraft, MintError>;
}

const TITLES: [&str; 6] = ["Aurora", "Obsidian", "Solar", "Tempest", "Crystal", "Ember"];
const KINDS: [&str; 5] = ["Wraith", "Seraph", "Comet", "Sovereign", "Drifter"];
const PATTERNS: [Pattern; 5] = [
    Pattern::Solid,
    Pattern::Gradient,
    Pattern::Striped,
    Pattern::Dots,
    Pattern::Checkered,
];

/// Offline minter drawing names and values from an injected RNG
#[derive(Debug, Clone)]
pub struct RandomMinter<R: Rng> {
    rng: R,
}

impl<R: Rng> RandomMinter<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> SkinMinter for RandomMinter<R> {
    fn mint(&mut self, _score: u32) -> Result<SkinDraft, MintError> {
        let title = TITLES.choose(&mut self.rng).copied().unwrap_or("Mythic");
        let kind = KINDS.choose(&mut self.rng).copied().unwrap_or("Flyer");
        let pattern = PATTERNS.choose(&mut self.rng).copied().unwrap_or_default();
        Ok(SkinDraft {
            name: format!("{title} {kind}"),
            pattern,
            price: self.rng.random_range(UNIQUE_PRICE_MIN..=UNIQUE_PRICE_MAX),
        })
    }
}
