//! Storage layout of the profile

use std::collections::{BTreeMap, BTreeSet};

use crate::market::catalog::{DEFAULT_SKIN, Skin};
use crate::platform::storage::{KeyValueStore, StoreError};
use crate::profile::Profile;

pub const KEY_COINS: &str = "skyflap-coins";
pub const KEY_INVENTORY: &str = "skyflap-inventory";
pub const KEY_EQUIPPED: &str = "skyflap-skin";
pub const KEY_HIGH_SCORE: &str = "skyflap-highscore";
pub const KEY_CUSTOM_SKINS: &str = "skyflap-custom-skins";

/// Read one key, treating errors and missing values alike
fn read(store: &dyn KeyValueStore, key: &str) -> Option<String> {
    match store.get(key) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("Failed to read {key}: {e}");
            None
        }
    }
}

fn parse_or_default<T: std::str::FromStr + Default>(key: &str, raw: Option<String>) -> T {
    match raw {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("Corrupt value under {key}, using default");
            T::default()
        }),
        None => T::default(),
    }
}

/// Load a profile; every field falls back to its default on its own
pub fn load_profile(store: &dyn KeyValueStore) -> Profile {
    let mut profile = Profile::default();

    profile.balance = parse_or_default(KEY_COINS, read(store, KEY_COINS));
    profile.high_score = parse_or_default(KEY_HIGH_SCORE, read(store, KEY_HIGH_SCORE));

    if let Some(raw) = read(store, KEY_INVENTORY) {
        match serde_json::from_str::<BTreeSet<String>>(&raw) {
            Ok(mut inventory) => {
                inventory.insert(DEFAULT_SKIN.to_string());
                profile.inventory = inventory;
            }
            Err(e) => log::warn!("Corrupt inventory, using default: {e}"),
        }
    }

    if let Some(raw) = read(store, KEY_CUSTOM_SKINS) {
        match serde_json::from_str::<BTreeMap<String, Skin>>(&raw) {
            Ok(skins) => profile.custom_skins = skins,
            Err(e) => log::warn!("Corrupt custom skins, using none: {e}"),
        }
    }

    if let Some(equipped) = read(store, KEY_EQUIPPED) {
        if profile.owns(&equipped) {
            profile.equipped = equipped;
        } else {
            log::warn!("Equipped skin {equipped:?} not owned, wearing default");
        }
    }

    log::info!(
        "Loaded profile: {} coins, {} skins, high score {}",
        profile.balance,
        profile.inventory.len(),
        profile.high_score
    );
    profile
}

/// Write every profile field. Stops at the first failing key.
pub fn save_profile(store: &mut dyn KeyValueStore, profile: &Profile) -> Result<(), StoreError> {
    store.set(KEY_COINS, &profile.balance.to_string())?;
    let inventory = serde_json::to_string(&profile.inventory)
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;
    store.set(KEY_INVENTORY, &inventory)?;
    store.set(KEY_EQUIPPED, &profile.equipped)?;
    store.set(KEY_HIGH_SCORE, &profile.high_score.to_string())?;
    let custom = serde_json::to_string(&profile.custom_skins)
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;
    store.set(KEY_CUSTOM_SKINS, &custom)?;
    Ok(())
}
