//! Shop operation failures
//!
//! Every variant is returned before any state is touched, so a failed
//! operation is always a no-op.

use thiserror::Error;

use super::listing::ListingId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarketError {
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },

    #[error("item not owned: {0}")]
    NotOwned(String),

    #[error("unknown item: {0}")]
    UnknownItem(String),

    #[error("item cannot be traded: {0}")]
    NotTradeable(String),

    #[error("listing not found or expired: {0}")]
    ListingNotFound(ListingId),

    #[error("cannot buy your own listing: {0}")]
    OwnListing(ListingId),

    #[error("listing was not created by the player: {0}")]
    NotPlayerListing(ListingId),

    #[error("price must be positive")]
    InvalidPrice,

    #[error("recipient name is empty")]
    EmptyRecipient,
}
