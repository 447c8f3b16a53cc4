//! Market listings

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique listing identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ListingId(pub u64);

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listing-{}", self.0)
    }
}

/// Who authored a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Seller {
    /// Listed by the player; may resolve into a simulated sale
    Player,
    /// Synthesized by the market engine
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub skin_id: String,
    pub price: u64,
    pub seller_name: String,
    /// Visible while `now < expires_at_ms`
    pub expires_at_ms: u64,
    pub seller: Seller,
}

impl Listing {
    pub fn is_player(&self) -> bool {
        self.seller == Seller::Player
    }

    pub fn is_active(&self, now_ms: u64) -> bool {
        now_ms < self.expires_at_ms
    }

    /// Milliseconds until expiry (zero once expired)
    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        self.expires_at_ms.saturating_sub(now_ms)
    }
}
