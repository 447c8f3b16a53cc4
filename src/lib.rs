//! Skyflap - a side-scrolling gate runner with a simulated skin market
//!
//! Core modules:
//! - `sim`: Deterministic round simulation (physics, collisions, scoring, phases)
//! - `market`: Timer-driven marketplace simulation and shop operations
//! - `session`: Owns both engines plus their scheduler handles
//! - `platform`: Clock and key-value storage abstractions
//! - `persistence`: Profile layout, debounced saves, cloud backup

pub mod commentary;
pub mod duel;
pub mod highscores;
pub mod market;
pub mod persistence;
pub mod platform;
pub mod profile;
pub mod reward;
pub mod scheduler;
pub mod session;
pub mod settings;
pub mod sim;
pub mod themes;

pub use highscores::HighScores;
pub use profile::Profile;
pub use session::{Session, SessionEvent};
pub use settings::{MarketConfig, PhysicsConfig, Settings};

/// Game configuration constants
pub mod consts {
    /// Frame loop rate (one physics step per display refresh)
    pub const FRAME_HZ: u32 = 60;
    /// Fixed frame timestep in seconds
    pub const FRAME_DT: f32 = 1.0 / FRAME_HZ as f32;
    /// Maximum frames stepped per host update to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Viewport defaults
    pub const VIEW_WIDTH: f32 = 480.0;
    pub const VIEW_HEIGHT: f32 = 720.0;
    /// Ground strip at the bottom of the view (not part of the playable band)
    pub const GROUND_HEIGHT: f32 = 100.0;

    /// Bird defaults (per-frame units)
    pub const GRAVITY: f32 = 0.5;
    pub const JUMP_VELOCITY: f32 = -8.0;
    pub const BIRD_RADIUS: f32 = 18.0;

    /// Pipe defaults
    pub const PIPE_SPEED: f32 = 3.0;
    pub const PIPE_SPAWN_FRAMES: u64 = 100;
    pub const PIPE_WIDTH: f32 = 60.0;
    pub const PIPE_GAP: i32 = 170;
    /// Minimum pipe height above and below the gap
    pub const MIN_PIPE_HEIGHT: i32 = 50;
    /// Pipes are purged once their trailing edge is this far left of the view
    pub const PURGE_MARGIN: f32 = 50.0;

    /// Market timer period
    pub const MARKET_TICK_MS: u64 = 3_000;
    /// Bot listings are only replenished below this many active listings
    pub const MARKET_LOW_WATER: usize = 12;
    /// Chance per tick that a bot listing is synthesized when low
    pub const MARKET_REPLENISH_CHANCE: f64 = 0.3;
    /// Bot listings seeded into an empty market
    pub const MARKET_INITIAL_LISTINGS: usize = 8;
    /// Player listings stay up for ten minutes
    pub const PLAYER_LISTING_TTL_MS: u64 = 10 * 60 * 1_000;
    /// Bot listing lifetime: base plus a random extra window
    pub const BOT_LISTING_MIN_TTL_MS: u64 = 60_000;
    pub const BOT_LISTING_EXTRA_TTL_MS: u64 = 300_000;
    /// Bot price multiplier range of an item's base value
    pub const BOT_PRICE_MIN_MULT: f64 = 0.8;
    pub const BOT_PRICE_MAX_MULT: f64 = 1.5;
    /// Quick-sell pays this fraction of base value
    pub const QUICK_SELL_FRACTION: f64 = 0.5;

    /// Delay between the last profile mutation and its save
    pub const SAVE_DEBOUNCE_MS: u64 = 2_000;
}
