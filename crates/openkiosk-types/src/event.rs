//! Market event types.
//!
//! Events are fire-and-forget notifications: no core logic depends on their
//! delivery. The marketplace appends them to a bounded log and mirrors each
//! one to `tracing`; indexers and wallets consume them for display.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, ItemId, KioskId, ListingId, OfferId};

/// The kind of marketplace action an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketEventKind {
    OfferCreated,
    OfferRevoked,
    OfferAccepted,
    OfferDeclined,
    ListingCreated,
    ListingUpdated,
    ListingDelisted,
    ItemPurchased,
}

impl std::fmt::Display for MarketEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OfferCreated => write!(f, "OFFER_CREATED"),
            Self::OfferRevoked => write!(f, "OFFER_REVOKED"),
            Self::OfferAccepted => write!(f, "OFFER_ACCEPTED"),
            Self::OfferDeclined => write!(f, "OFFER_DECLINED"),
            Self::ListingCreated => write!(f, "LISTING_CREATED"),
            Self::ListingUpdated => write!(f, "LISTING_UPDATED"),
            Self::ListingDelisted => write!(f, "LISTING_DELISTED"),
            Self::ItemPurchased => write!(f, "ITEM_PURCHASED"),
        }
    }
}

/// One marketplace notification.
///
/// `price` is the record's base price except for `ListingCreated`, which
/// carries the all-in display price (base + royalty + market fee).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketEvent {
    pub kind: MarketEventKind,
    /// The kiosk the record is scoped to. `None` for collection offers.
    pub kiosk_id: Option<KioskId>,
    pub offer_id: Option<OfferId>,
    pub listing_id: Option<ListingId>,
    /// The item involved. `None` for collection offers until acceptance.
    pub item_id: Option<ItemId>,
    pub price: u64,
    pub royalty_fee: u64,
    pub market_fee: u64,
    /// The relevant party: offerer, acceptor, seller, or buyer.
    pub address: Address,
    pub emitted_at: DateTime<Utc>,
}
