//! # openkiosk-types
//!
//! Shared types, errors, and configuration for the **OpenKiosk** marketplace
//! settlement engine.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`OfferId`], [`ListingId`], [`ItemId`], [`KioskId`], [`CollectionId`], [`Address`]
//! - **Value primitive**: [`Coin`] (linear, move-only balance)
//! - **Fee arithmetic**: [`fee_amount`], [`FeeBreakdown`] (basis-point scale 10000)
//! - **Compliance receipts**: [`TransferReceipt`], [`RuleKind`]
//! - **Events**: [`MarketEvent`], [`MarketEventKind`]
//! - **Configuration**: [`MarketplaceConfig`]
//! - **Errors**: [`OpenkioskError`] with `OK_ERR_` prefix codes
//! - **Constants**: fee scale and system-wide defaults

pub mod coin;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod fee;
pub mod ids;
pub mod receipt;

// Re-export all primary types at crate root for ergonomic imports:
//   use openkiosk_types::{Coin, OfferId, TransferReceipt, ...};

pub use coin::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use fee::*;
pub use ids::*;
pub use receipt::*;

// Constants are accessed via `openkiosk_types::constants::FOO`
// (not re-exported to avoid name collisions).
