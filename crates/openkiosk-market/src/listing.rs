//! # Listing records
//!
//! Seller-side mirror of the offer escrow: a [`ListingRecord`] wraps the
//! exclusive [`PurchaseCap`] for one item in one kiosk, plus the fee
//! breakdown fixed at listing (or last update) time.
//!
//! ```text
//!   ┌────────┐  update (self-loop, fees recomputed)
//!   │ LISTED │◀─┐
//!   └──┬──┬──┘──┘
//!      │  └── delist ──▶ cap returned to kiosk
//!      └──── buy ──────▶ capability-gated purchase, receipt to confirm
//! ```

use serde::Serialize;

use openkiosk_custody::PurchaseCap;
use openkiosk_types::{Address, FeeBreakdown, ItemId, KioskId, ListingId};

/// A live listing in the shared registry.
#[must_use]
#[derive(Debug, Serialize)]
pub struct ListingRecord {
    pub(crate) id: ListingId,
    pub(crate) kiosk_id: KioskId,
    pub(crate) owner: Address,
    pub(crate) item_id: ItemId,
    /// Base price only; the all-in display price adds both fees.
    pub(crate) min_price: u64,
    pub(crate) royalty_fee: u64,
    pub(crate) market_fee: u64,
    pub(crate) purchase_cap: PurchaseCap,
}

impl ListingRecord {
    #[must_use]
    pub fn id(&self) -> ListingId {
        self.id
    }

    #[must_use]
    pub fn kiosk_id(&self) -> KioskId {
        self.kiosk_id
    }

    #[must_use]
    pub fn owner(&self) -> Address {
        self.owner
    }

    #[must_use]
    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    #[must_use]
    pub fn min_price(&self) -> u64 {
        self.min_price
    }

    #[must_use]
    pub fn royalty_fee(&self) -> u64 {
        self.royalty_fee
    }

    #[must_use]
    pub fn market_fee(&self) -> u64 {
        self.market_fee
    }

    /// The fee decomposition currently in force for this listing.
    #[must_use]
    pub fn fees(&self) -> FeeBreakdown {
        FeeBreakdown::new(self.min_price, self.market_fee, self.royalty_fee)
    }
}
