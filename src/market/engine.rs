//! Market simulation engine
//!
//! Runs on its own coarse timer regardless of game phase. Each tick expires
//! stale listings, rolls an independent sale for every player listing and
//! tops the market up with bot listings when it runs low. There is no real
//! counterparty: buyers and bot sellers are drawn from fixed name pools.

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use super::catalog::{Catalog, DEFAULT_SKIN};
use super::error::MarketError;
use super::listing::{Listing, ListingId, Seller};
use crate::profile::Profile;
use crate::settings::MarketConfig;

/// Sale probability per tick by inclusive price ceiling, cheapest first
pub const SELL_CHANCE_TIERS: [(u64, f64); 3] = [(500, 0.15), (1_999, 0.08), (10_000, 0.02)];
/// Sale probability above the last tier
pub const SELL_CHANCE_CEILING: f64 = 0.005;

pub const BUYER_NAMES: [&str; 6] = [
    "xX_Slayer_Xx",
    "CryptoKing",
    "LunaLove",
    "SpeedRunner01",
    "RichieRich",
    "Collector99",
];

pub const BOT_SELLER_NAMES: [&str; 7] = [
    "FlapMaster",
    "Birdy88",
    "SkyHigh",
    "WingMan",
    "DrFlap",
    "PixelBird",
    "CloudWalker",
];

/// Chance that a player listing at `price` sells during one tick.
///
/// Non-increasing in price.
pub fn sell_chance(price: u64) -> f64 {
    SELL_CHANCE_TIERS
        .iter()
        .find(|(ceiling, _)| price <= *ceiling)
        .map(|&(_, chance)| chance)
        .unwrap_or(SELL_CHANCE_CEILING)
}

/// Events emitted by market ticks and shop operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketEvent {
    /// A player listing was bought by a simulated player
    Sold {
        listing_id: ListingId,
        skin_id: String,
        price: u64,
        buyer: String,
    },
    /// A listing reached its expiry; player items go back to the inventory
    Expired {
        listing_id: ListingId,
        skin_id: String,
        returned_to_player: bool,
    },
    /// A bot put a new listing up
    BotListed {
        listing_id: ListingId,
        skin_id: String,
        price: u64,
    },
    /// The player listed an item
    Listed {
        listing_id: ListingId,
        skin_id: String,
        price: u64,
    },
    /// The player withdrew a listing
    Cancelled { listing_id: ListingId, skin_id: String },
    /// The player sold an item instantly to the house
    QuickSold { skin_id: String, price: u64 },
    /// The player bought a listing
    Bought {
        listing_id: ListingId,
        skin_id: String,
        price: u64,
    },
    /// The player gave an item away
    Gifted { skin_id: String, recipient: String },
}

impl MarketEvent {
    /// Whether this event changed the profile's balance or inventory
    pub fn touches_profile(&self) -> bool {
        match self {
            MarketEvent::BotListed { .. } => false,
            MarketEvent::Expired {
                returned_to_player, ..
            } => *returned_to_player,
            _ => true,
        }
    }
}

/// The listings collection and the rules that mutate it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    listings: Vec<Listing>,
    config: MarketConfig,
    next_id: u64,
}

impl Market {
    pub fn new(config: MarketConfig) -> Self {
        Self {
            listings: Vec::new(),
            config: config.sanitized(),
            next_id: 1,
        }
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    /// Every stored listing, including ones that expire before the next tick
    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    /// Listings visible at `now_ms`
    pub fn active(&self, now_ms: u64) -> impl Iterator<Item = &Listing> {
        self.listings.iter().filter(move |l| l.is_active(now_ms))
    }

    pub fn player_listings(&self, now_ms: u64) -> impl Iterator<Item = &Listing> {
        self.active(now_ms).filter(|l| l.is_player())
    }

    pub fn bot_listings(&self, now_ms: u64) -> impl Iterator<Item = &Listing> {
        self.active(now_ms).filter(|l| !l.is_player())
    }

    pub fn get(&self, id: ListingId) -> Option<&Listing> {
        self.listings.iter().find(|l| l.id == id)
    }

    fn next_listing_id(&mut self) -> ListingId {
        let id = ListingId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Fill an empty market with the initial bot listings
    pub fn seed<R: Rng + ?Sized>(
        &mut self,
        catalog: &Catalog,
        now_ms: u64,
        rng: &mut R,
    ) -> Vec<MarketEvent> {
        if !self.listings.is_empty() {
            return Vec::new();
        }
        let mut events = Vec::new();
        for _ in 0..self.config.initial_listings {
            if let Some(listing) = self.make_bot_listing(catalog, now_ms, rng) {
                events.push(bot_listed(&listing));
                self.listings.push(listing);
            }
        }
        log::info!("Market seeded with {} bot listings", self.listings.len());
        events
    }

    fn make_bot_listing<R: Rng + ?Sized>(
        &mut self,
        catalog: &Catalog,
        now_ms: u64,
        rng: &mut R,
    ) -> Option<Listing> {
        let skin = *catalog.bot_tradeable().choose(rng)?;
        let (lo, hi) = (self.config.bot_price_min_mult, self.config.bot_price_max_mult);
        let mult = if hi > lo { rng.random_range(lo..hi) } else { lo };
        let price = (skin.price as f64 * mult).floor() as u64;
        let seller_name = BOT_SELLER_NAMES.choose(rng).copied().unwrap_or("Bot");
        let extra = (rng.random::<f64>() * self.config.bot_extra_ttl_ms as f64) as u64;
        Some(Listing {
            id: self.next_listing_id(),
            skin_id: skin.id.clone(),
            price,
            seller_name: seller_name.to_string(),
            expires_at_ms: now_ms + self.config.bot_min_ttl_ms + extra,
            seller: Seller::Bot,
        })
    }

    /// One market step
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        now_ms: u64,
        catalog: &Catalog,
        profile: &mut Profile,
        rng: &mut R,
    ) -> Vec<MarketEvent> {
        let mut events = Vec::new();

        // 1. Expire
        let (live, expired): (Vec<Listing>, Vec<Listing>) = std::mem::take(&mut self.listings)
            .into_iter()
            .partition(|l| l.is_active(now_ms));
        for listing in expired {
            let returned_to_player = listing.is_player();
            if returned_to_player {
                profile.add_item(&listing.skin_id);
            }
            events.push(MarketEvent::Expired {
                listing_id: listing.id,
                skin_id: listing.skin_id,
                returned_to_player,
            });
        }

        // 2. Independent sale roll per player listing
        let mut next = Vec::with_capacity(live.len());
        for listing in live {
            let rolls = listing.is_player() && catalog.contains(&listing.skin_id);
            if rolls && rng.random_bool(sell_chance(listing.price)) {
                let buyer = BUYER_NAMES.choose(rng).copied().unwrap_or("Someone");
                profile.credit(listing.price);
                log::info!(
                    "{} bought {} for {}",
                    buyer,
                    catalog.name_of(&listing.skin_id),
                    listing.price
                );
                events.push(MarketEvent::Sold {
                    listing_id: listing.id,
                    skin_id: listing.skin_id,
                    price: listing.price,
                    buyer: buyer.to_string(),
                });
                continue;
            }
            next.push(listing);
        }

        // 3. Replenish when low
        if next.len() < self.config.low_water && rng.random_bool(self.config.replenish_chance) {
            if let Some(listing) = self.make_bot_listing(catalog, now_ms, rng) {
                events.push(bot_listed(&listing));
                next.push(listing);
            }
        }

        // 4. Commit
        self.listings = next;
        events
    }

    /// Put an owned item up for sale; it leaves the inventory immediately
    pub fn list_item(
        &mut self,
        profile: &mut Profile,
        catalog: &Catalog,
        skin_id: &str,
        price: u64,
        seller_name: &str,
        now_ms: u64,
    ) -> Result<MarketEvent, MarketError> {
        if price == 0 {
            return Err(MarketError::InvalidPrice);
        }
        if !catalog.contains(skin_id) {
            return Err(MarketError::UnknownItem(skin_id.to_string()));
        }
        profile.remove_item(skin_id)?;

        let listing = Listing {
            id: self.next_listing_id(),
            skin_id: skin_id.to_string(),
            price,
            seller_name: seller_name.to_string(),
            expires_at_ms: now_ms + self.config.player_listing_ttl_ms,
            seller: Seller::Player,
        };
        let event = MarketEvent::Listed {
            listing_id: listing.id,
            skin_id: listing.skin_id.clone(),
            price,
        };
        // Newest player listings first
        self.listings.insert(0, listing);
        log::info!("Listed {} for {}", catalog.name_of(skin_id), price);
        Ok(event)
    }

    /// Withdraw a player listing and return the item
    pub fn cancel_listing(
        &mut self,
        profile: &mut Profile,
        id: ListingId,
        now_ms: u64,
    ) -> Result<MarketEvent, MarketError> {
        let index = self
            .listings
            .iter()
            .position(|l| l.id == id && l.is_active(now_ms))
            .ok_or(MarketError::ListingNotFound(id))?;
        if !self.listings[index].is_player() {
            return Err(MarketError::NotPlayerListing(id));
        }
        let listing = self.listings.remove(index);
        profile.add_item(&listing.skin_id);
        Ok(MarketEvent::Cancelled {
            listing_id: id,
            skin_id: listing.skin_id,
        })
    }

    /// Price the house pays for an instant sale
    pub fn quick_sell_price(&self, catalog: &Catalog, skin_id: &str) -> Option<u64> {
        catalog
            .get(skin_id)
            .map(|s| (s.price as f64 * self.config.quick_sell_fraction).floor() as u64)
    }

    /// Sell an owned item instantly at a fixed fraction of its base value
    pub fn quick_sell(
        &self,
        profile: &mut Profile,
        catalog: &Catalog,
        skin_id: &str,
    ) -> Result<MarketEvent, MarketError> {
        let price = self
            .quick_sell_price(catalog, skin_id)
            .ok_or_else(|| MarketError::UnknownItem(skin_id.to_string()))?;
        profile.remove_item(skin_id)?;
        profile.credit(price);
        Ok(MarketEvent::QuickSold {
            skin_id: skin_id.to_string(),
            price,
        })
    }

    /// Buy an active bot listing if the balance covers it
    pub fn buy(
        &mut self,
        profile: &mut Profile,
        id: ListingId,
        now_ms: u64,
    ) -> Result<MarketEvent, MarketError> {
        let index = self
            .listings
            .iter()
            .position(|l| l.id == id && l.is_active(now_ms))
            .ok_or(MarketError::ListingNotFound(id))?;
        let listing = &self.listings[index];
        if listing.is_player() {
            return Err(MarketError::OwnListing(id));
        }
        profile.debit(listing.price)?;

        let listing = self.listings.remove(index);
        profile.add_item(&listing.skin_id);
        Ok(MarketEvent::Bought {
            listing_id: id,
            skin_id: listing.skin_id,
            price: listing.price,
        })
    }

    /// Give an owned item to another player (leaves the inventory for good)
    pub fn gift(
        &self,
        profile: &mut Profile,
        skin_id: &str,
        recipient: &str,
    ) -> Result<MarketEvent, MarketError> {
        let recipient = recipient.trim();
        if recipient.is_empty() {
            return Err(MarketError::EmptyRecipient);
        }
        if skin_id == DEFAULT_SKIN {
            return Err(MarketError::NotTradeable(skin_id.to_string()));
        }
        profile.remove_item(skin_id)?;
        Ok(MarketEvent::Gifted {
            skin_id: skin_id.to_string(),
            recipient: recipient.to_string(),
        })
    }
}

fn bot_listed(listing: &Listing) -> MarketEvent {
    MarketEvent::BotListed {
        listing_id: listing.id,
        skin_id: listing.skin_id.clone(),
        price: listing.price,
    }
}
