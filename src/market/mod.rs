//! Simulated item marketplace
//!
//! A local, single-process illusion of other traders: bots list skins,
//! simulated players buy the player's listings, all driven by a periodic tick.

pub mod catalog;
pub mod engine;
pub mod error;
pub mod listing;

pub use catalog::{Catalog, DEFAULT_SKIN, Pattern, Rarity, Skin};
pub use engine::{Market, MarketEvent, sell_chance};
pub use error::MarketError;
pub use listing::{Listing, ListingId, Seller};
