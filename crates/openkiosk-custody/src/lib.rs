//! # openkiosk-custody
//!
//! **Custody collaborators**: the kiosk container and the transfer-policy
//! rule framework the settlement engine builds on.
//!
//! ## Architecture
//!
//! - [`Kiosk`] holds items for one owner; every mutation is gated by the
//!   [`KioskCap`] minted with it. Possession of a cap is the authorization —
//!   capability discipline substitutes for locking.
//! - [`PurchaseCap`] is the exclusive right to complete one item's sale at or
//!   above a floor price; [`Kiosk::execute_purchase`] consumes it and mints
//!   the [`openkiosk_types::TransferReceipt`].
//! - [`TransferPolicy`] registers royalty / floor-price / lock rules for a
//!   collection and is the sole consumer of transfer receipts.

pub mod kiosk;
pub mod policy;

pub use kiosk::{Item, Kiosk, KioskCap, PurchaseCap};
pub use policy::{PolicyCap, RoyaltyConfig, TransferPolicy};
