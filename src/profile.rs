//! Player profile
//!
//! Process-lifetime state shared by the round (score-to-coin conversion) and
//! the market (sales and purchases). Survives every phase transition.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::market::catalog::{DEFAULT_SKIN, Skin};
use crate::market::error::MarketError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Coin balance
    pub balance: u64,
    /// Owned skin ids
    pub inventory: BTreeSet<String>,
    /// Skin currently worn
    pub equipped: String,
    /// Best round score
    pub high_score: u32,
    /// One-of-one skins minted for this player, by id
    #[serde(default)]
    pub custom_skins: BTreeMap<String, Skin>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            balance: 0,
            inventory: BTreeSet::from([DEFAULT_SKIN.to_string()]),
            equipped: DEFAULT_SKIN.to_string(),
            high_score: 0,
            custom_skins: BTreeMap::new(),
        }
    }
}

impl Profile {
    pub fn owns(&self, skin_id: &str) -> bool {
        self.inventory.contains(skin_id)
    }

    /// Add a skin; returns false if it was already owned
    pub fn add_item(&mut self, skin_id: &str) -> bool {
        self.inventory.insert(skin_id.to_string())
    }

    /// Remove a tradeable skin, re-equipping the default if it was worn
    pub fn remove_item(&mut self, skin_id: &str) -> Result<(), MarketError> {
        if skin_id == DEFAULT_SKIN {
            return Err(MarketError::NotTradeable(skin_id.to_string()));
        }
        if !self.inventory.remove(skin_id) {
            return Err(MarketError::NotOwned(skin_id.to_string()));
        }
        if self.equipped == skin_id {
            self.equipped = DEFAULT_SKIN.to_string();
        }
        Ok(())
    }

    pub fn equip(&mut self, skin_id: &str) -> Result<(), MarketError> {
        if !self.owns(skin_id) {
            return Err(MarketError::NotOwned(skin_id.to_string()));
        }
        self.equipped = skin_id.to_string();
        Ok(())
    }

    pub fn credit(&mut self, amount: u64) {
        self.balance = self.balance.saturating_add(amount);
    }

    pub fn debit(&mut self, amount: u64) -> Result<(), MarketError> {
        if self.balance < amount {
            return Err(MarketError::InsufficientFunds {
                needed: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        Ok(())
    }

    /// Keep a minted skin and put it in the inventory
    pub fn grant_custom_skin(&mut self, skin: Skin) {
        self.inventory.insert(skin.id.clone());
        self.custom_skins.insert(skin.id.clone(), skin);
    }

    /// Record a finished round; returns true on a new high score
    pub fn record_score(&mut self, score: u32) -> bool {
        if score > self.high_score {
            self.high_score = score;
            true
        } else {
            false
        }
    }
}
