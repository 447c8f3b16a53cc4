//! Item types traded on the market
//!
//! Every tradeable item is a bird skin with a base value. Unique skins can be
//! added at runtime (e.g. generated as a high-score reward) and are never
//! offered by bots.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Skin every profile owns and can never trade away
pub const DEFAULT_SKIN: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
    /// One-of-one reward skin
    Unique,
}

impl Rarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
            Rarity::Unique => "unique",
        }
    }
}

/// Body pattern, consumed by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Pattern {
    #[default]
    Solid,
    Gradient,
    Striped,
    Dots,
    Checkered,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skin {
    pub id: String,
    pub name: String,
    pub rarity: Rarity,
    pub pattern: Pattern,
    /// Base value in coins
    pub price: u64,
}

impl Skin {
    fn standard(id: &str, name: &str, rarity: Rarity, pattern: Pattern, price: u64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            rarity,
            pattern,
            price,
        }
    }

    pub fn is_unique(&self) -> bool {
        self.rarity == Rarity::Unique
    }

    /// Whether bots may list this skin
    pub fn bot_tradeable(&self) -> bool {
        self.id != DEFAULT_SKIN && !self.is_unique()
    }
}

/// All known skins by id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    skins: BTreeMap<String, Skin>,
}

impl Catalog {
    /// The built-in skin set
    pub fn standard() -> Self {
        let skins = [
            Skin::standard(DEFAULT_SKIN, "Classic", Rarity::Common, Pattern::Solid, 0),
            Skin::standard("red", "Crimson Flyer", Rarity::Common, Pattern::Solid, 400),
            Skin::standard("blue", "Midnight Blue", Rarity::Rare, Pattern::Gradient, 800),
            Skin::standard("leaf", "Leaf Glider", Rarity::Rare, Pattern::Dots, 1_200),
            Skin::standard("zebra", "Zebra Wings", Rarity::Epic, Pattern::Striped, 2_500),
            Skin::standard("arcade", "Arcade Checker", Rarity::Epic, Pattern::Checkered, 6_000),
            Skin::standard("phoenix", "Golden Phoenix", Rarity::Legendary, Pattern::Gradient, 12_000),
        ];
        Self {
            skins: skins.into_iter().map(|s| (s.id.clone(), s)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Skin> {
        self.skins.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.skins.contains_key(id)
    }

    /// Display name, or a generic label for unknown ids
    pub fn name_of(&self, id: &str) -> &str {
        self.get(id).map(|s| s.name.as_str()).unwrap_or("Item")
    }

    /// Add or replace a skin (unique reward skins are minted at runtime)
    pub fn insert(&mut self, skin: Skin) {
        self.skins.insert(skin.id.clone(), skin);
    }

    /// Skins bots may list, in id order
    pub fn bot_tradeable(&self) -> Vec<&Skin> {
        self.skins.values().filter(|s| s.bot_tradeable()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Skin> {
        self.skins.values()
    }

    pub fn len(&self) -> usize {
        self.skins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skins.is_empty()
    }
}
