//! Game settings and tuning
//!
//! Persisted separately from the profile under its own storage key.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::platform::storage::KeyValueStore;

/// Round physics tuning (all per-frame units)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub view_width: f32,
    pub view_height: f32,
    pub ground_height: f32,
    pub gravity: f32,
    pub jump_velocity: f32,
    pub bird_radius: f32,
    pub pipe_speed: f32,
    pub pipe_spawn_frames: u64,
    pub pipe_width: f32,
    pub pipe_gap: i32,
    pub min_pipe_height: i32,
    pub purge_margin: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            view_width: VIEW_WIDTH,
            view_height: VIEW_HEIGHT,
            ground_height: GROUND_HEIGHT,
            gravity: GRAVITY,
            jump_velocity: JUMP_VELOCITY,
            bird_radius: BIRD_RADIUS,
            pipe_speed: PIPE_SPEED,
            pipe_spawn_frames: PIPE_SPAWN_FRAMES,
            pipe_width: PIPE_WIDTH,
            pipe_gap: PIPE_GAP,
            min_pipe_height: MIN_PIPE_HEIGHT,
            purge_margin: PURGE_MARGIN,
        }
    }
}

impl PhysicsConfig {
    /// Height of the band the bird may occupy (view minus ground)
    pub fn play_height(&self) -> f32 {
        self.view_height - self.ground_height
    }

    /// Fixed horizontal position of the bird
    pub fn bird_x(&self) -> f32 {
        self.view_width / 2.0
    }
}

/// Market simulation tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub tick_ms: u64,
    pub low_water: usize,
    pub replenish_chance: f64,
    pub initial_listings: usize,
    pub player_listing_ttl_ms: u64,
    pub bot_min_ttl_ms: u64,
    pub bot_extra_ttl_ms: u64,
    pub bot_price_min_mult: f64,
    pub bot_price_max_mult: f64,
    pub quick_sell_fraction: f64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            tick_ms: MARKET_TICK_MS,
            low_water: MARKET_LOW_WATER,
            replenish_chance: MARKET_REPLENISH_CHANCE,
            initial_listings: MARKET_INITIAL_LISTINGS,
            player_listing_ttl_ms: PLAYER_LISTING_TTL_MS,
            bot_min_ttl_ms: BOT_LISTING_MIN_TTL_MS,
            bot_extra_ttl_ms: BOT_LISTING_EXTRA_TTL_MS,
            bot_price_min_mult: BOT_PRICE_MIN_MULT,
            bot_price_max_mult: BOT_PRICE_MAX_MULT,
            quick_sell_fraction: QUICK_SELL_FRACTION,
        }
    }
}

impl MarketConfig {
    /// Pull probabilities into [0, 1] and order the bot price range.
    /// Non-finite values fall back to their defaults.
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let unit = |v: f64, fallback: f64| if v.is_finite() { v.clamp(0.0, 1.0) } else { fallback };
        let mult = |v: f64, fallback: f64| if v.is_finite() { v.max(0.0) } else { fallback };

        let mut lo = mult(self.bot_price_min_mult, defaults.bot_price_min_mult);
        let mut hi = mult(self.bot_price_max_mult, defaults.bot_price_max_mult);
        if lo > hi {
            std::mem::swap(&mut lo, &mut hi);
        }
        let sanitized = Self {
            replenish_chance: unit(self.replenish_chance, defaults.replenish_chance),
            quick_sell_fraction: unit(self.quick_sell_fraction, defaults.quick_sell_fraction),
            bot_price_min_mult: lo,
            bot_price_max_mult: hi,
            ..self
        };
        if sanitized != self {
            log::warn!("Market settings out of range, clamped");
        }
        sanitized
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Round physics
    pub physics: PhysicsConfig,
    /// Market simulation
    pub market: MarketConfig,

    // === Presentation hints (consumed by collaborators) ===
    /// Sound cues enabled
    pub sound_enabled: bool,
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Reduced motion (suppress theme transitions)
    pub reduced_motion: bool,

    /// Delay between the last profile mutation and the save
    pub save_debounce_ms: u64,
    /// Player display name used as seller name and for backups
    pub username: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            physics: PhysicsConfig::default(),
            market: MarketConfig::default(),
            sound_enabled: true,
            master_volume: 0.8,
            reduced_motion: false,
            save_debounce_ms: SAVE_DEBOUNCE_MS,
            username: None,
        }
    }
}

impl Settings {
    /// Storage key
    pub const STORAGE_KEY: &'static str = "skyflap-settings";

    /// Seller name shown on player listings
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or("You")
    }

    /// Effective sound toggle (volume zero counts as muted)
    pub fn effective_sound(&self) -> bool {
        self.sound_enabled && self.master_volume > 0.0
    }

    /// Load settings from a store, falling back to defaults
    pub fn load(store: &dyn KeyValueStore) -> Self {
        match store.get(Self::STORAGE_KEY) {
            Ok(Some(json)) => match serde_json::from_str::<Settings>(&json) {
                Ok(mut settings) => {
                    log::info!("Loaded settings from storage");
                    settings.market = settings.market.sanitized();
                    settings
                }
                Err(e) => {
                    log::warn!("Corrupt settings, using defaults: {e}");
                    Self::default()
                }
            },
            Ok(None) => {
                log::info!("Using default settings");
                Self::default()
            }
            Err(e) => {
                log::warn!("Settings unavailable, using defaults: {e}");
                Self::default()
            }
        }
    }

    /// Save settings to a store (failures are logged, never fatal)
    pub fn save(&self, store: &mut dyn KeyValueStore) {
        match serde_json::to_string(self) {
            Ok(json) => match store.set(Self::STORAGE_KEY, &json) {
                Ok(()) => log::info!("Settings saved"),
                Err(e) => log::warn!("Failed to save settings: {e}"),
            },
            Err(e) => log::warn!("Failed to encode settings: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::storage::MemoryStore;

    #[test]
    fn test_play_height_excludes_ground() {
        let physics = PhysicsConfig::default();
        assert_eq!(physics.play_height(), VIEW_HEIGHT - GROUND_HEIGHT);
        assert_eq!(physics.bird_x(), VIEW_WIDTH / 2.0);
    }

    #[test]
    fn test_settings_persist() {
        let mut store = MemoryStore::new();
        let mut settings = Settings::default();
        settings.username = Some("Flapper".to_string());
        settings.physics.gravity = 0.4;
        settings.save(&mut store);

        let loaded = Settings::load(&store);
        assert_eq!(loaded, settings);
        assert_eq!(loaded.display_name(), "Flapper");
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let mut store = MemoryStore::new();
        store
            .set(Settings::STORAGE_KEY, r#"{"sound_enabled":false,"physics":{"gravity":1.0}}"#)
            .unwrap();

        let loaded = Settings::load(&store);
        assert!(!loaded.sound_enabled);
        assert_eq!(loaded.physics.gravity, 1.0);
        assert_eq!(loaded.physics.pipe_gap, PIPE_GAP);
        assert_eq!(loaded.market, MarketConfig::default());
    }

    #[test]
    fn test_out_of_range_market_settings_are_clamped() {
        let mut store = MemoryStore::new();
        store
            .set(
                Settings::STORAGE_KEY,
                r#"{"market":{"replenish_chance":1.5,"quick_sell_fraction":-0.2,"bot_price_min_mult":2.0,"bot_price_max_mult":0.5}}"#,
            )
            .unwrap();

        let market = Settings::load(&store).market;
        assert_eq!(market.replenish_chance, 1.0);
        assert_eq!(market.quick_sell_fraction, 0.0);
        assert_eq!(market.bot_price_min_mult, 0.5);
        assert_eq!(market.bot_price_max_mult, 2.0);
    }

    #[test]
    fn test_sanitize_keeps_valid_config() {
        let config = MarketConfig::default();
        assert_eq!(config.clone().sanitized(), config);

        let nan = MarketConfig {
            replenish_chance: f64::NAN,
            ..MarketConfig::default()
        };
        assert_eq!(nan.sanitized().replenish_chance, MARKET_REPLENISH_CHANCE);
    }

    #[test]
    fn test_corrupt_settings_fall_back() {
        let mut store = MemoryStore::new();
        store.set(Settings::STORAGE_KEY, "{not json").unwrap();
        assert_eq!(Settings::load(&store), Settings::default());
    }
}
