//! # openkiosk-market
//!
//! **Settlement plane for OpenKiosk**: offers, listings, fees, and escrow
//! accounting on top of the custody collaborators.
//!
//! The [`Marketplace`] is the single entry point. It owns:
//!
//! - **Offer escrow**: funded [`OfferRecord`]s keyed by (offer-id, item-id),
//!   consumed exactly once by accept / revoke / decline
//! - **Listing registry**: [`ListingRecord`]s wrapping exclusive purchase
//!   capabilities, bought through the kiosk's capability-gated path
//! - **Fee schedule**: base rate plus per-address overrides, fixed into each
//!   record at creation time
//! - **Treasury and payouts**: collected fees and third-party refunds
//! - **Events**: a bounded fire-and-forget log mirrored to `tracing`
//!
//! Kiosks and transfer policies live in `openkiosk-custody` and are borrowed
//! per call; this crate never holds a kiosk.

pub mod fee_schedule;
pub mod listing;
pub mod marketplace;
pub mod offer;
pub mod payouts;
pub mod settlement;
pub mod store;
pub mod treasury;

pub use fee_schedule::FeeSchedule;
pub use listing::ListingRecord;
pub use marketplace::{MarketCap, Marketplace};
pub use offer::{AcceptedOffer, OfferCap, OfferRecord};
pub use payouts::Payouts;
pub use settlement::{SettlementSplit, split_proceeds};
pub use store::{OfferKey, OfferStore};
pub use treasury::Treasury;
