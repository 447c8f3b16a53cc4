//! End-of-round commentary
//!
//! The text comes from an external generator keyed by the final score. It is
//! requested only after the round has ended and its coins are committed, and
//! any failure degrades to a fixed message.

use thiserror::Error;

pub const FALLBACK_MESSAGE: &str = "Game Over! (AI is sleeping)";
pub const EMPTY_MESSAGE: &str = "Game Over! Try again.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommentaryError {
    #[error("commentary request timed out")]
    Timeout,

    #[error("commentary service error: {0}")]
    Service(String),
}

/// Rough performance band used to steer the comment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Roast,
    Average,
    Praise,
}

impl Tier {
    pub fn for_score(score: u32) -> Self {
        match score {
            0..=4 => Tier::Roast,
            5..=20 => Tier::Average,
            _ => Tier::Praise,
        }
    }
}

/// Prompt sent to the text generator
pub fn prompt_for(score: u32) -> String {
    format!(
        "The player just finished a round of a flappy-bird style game with a score of {score}.\n\
         Give them a witty, sarcastic, or encouraging one-sentence comment based on their performance.\n\
         - If score < 5: Roast them gently about being terrible.\n\
         - If score 5-20: Tell them they are average.\n\
         - If score > 20: Praise them as a god.\n\
         Keep it short, under 15 words."
    )
}

/// Turn a generator result into display text
pub fn resolve(result: Result<String, CommentaryError>) -> String {
    match result {
        Ok(text) => {
            let text = text.trim();
            if text.is_empty() {
                EMPTY_MESSAGE.to_string()
            } else {
                text.to_string()
            }
        }
        Err(e) => {
            log::warn!("Commentary failed: {e}");
            FALLBACK_MESSAGE.to_string()
        }
    }
}

/// Text generator keyed by score
pub trait Commentator {
    fn comment(&mut self, score: u32) -> Result<String, CommentaryError>;
}

/// Offline commentator with fixed lines per tier
#[derive(Debug, Clone, Copy, Default)]
pub struct CannedCommentator;

impl Commentator for CannedCommentator {
    fn comment(&mut self, score: u32) -> Result<String, CommentaryError> {
        let line = match Tier::for_score(score) {
            Tier::Roast => "Gravity called. It says you're its favorite.",
            Tier::Average => "Perfectly average. The pipes barely noticed you.",
            Tier::Praise => "Bow down, mortals. A sky god has flapped among us.",
        };
        Ok(line.to_string())
    }
}
