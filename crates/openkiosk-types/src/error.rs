//! Error types for the OpenKiosk settlement engine.
//!
//! All errors use the `OK_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Offer errors
//! - 2xx: Listing errors
//! - 3xx: Funds / balance errors
//! - 4xx: Custody / capability errors
//! - 5xx: Transfer-policy / compliance errors
//! - 6xx: Treasury / admin errors
//! - 9xx: General / internal errors
//!
//! Taxonomy mapping:
//! - Authorization: `KioskAccessDenied`, `NotListingOwner`, `PolicyCapMismatch`
//! - Identity mismatch: `OfferCapMismatch`, `ListingItemMismatch`,
//!   `ListingKioskMismatch`, `CollectionMismatch`, `PurchaseCapMismatch`
//! - Insufficient funds: `InsufficientPayment`, `FloorNotMet`, `RoyaltyUnderpaid`
//! - Not found: `OfferNotFound`, `ListingNotFound`, `ItemNotFound`
//! - Compliance: `RuleNotSatisfied`, `ItemNotLocked`, `PriceBelowFloor`
//! - Invariant violation: `DuplicateOffer`, `DuplicateListing`, `DuplicateItem`,
//!   `BalanceUnderflow`, `BalanceOverflow`, `NonZeroBalance`
//!
//! Every error aborts the enclosing operation; there is no local recovery or
//! partial commit anywhere in this core.

use thiserror::Error;

use crate::{Address, CollectionId, ItemId, KioskId, ListingId, MarketplaceId, OfferId, RuleKind};

/// Central error enum for all OpenKiosk operations.
#[derive(Debug, Error)]
pub enum OpenkioskError {
    // =================================================================
    // Offer Errors (1xx)
    // =================================================================
    /// The offer was already consumed (accepted, revoked, declined) or never
    /// existed. Race losers and stale references land here.
    #[error("OK_ERR_100: Offer not found: {0}")]
    OfferNotFound(OfferId),

    /// An offer with this key already exists in the store. Unreachable through
    /// the public protocol; indicates a caller bypassing it.
    #[error("OK_ERR_101: Duplicate offer key: {0}")]
    DuplicateOffer(OfferId),

    /// The presented `OfferCap` is bound to a different offer.
    #[error("OK_ERR_102: Offer cap mismatch: cap is bound to {bound}, not {requested}")]
    OfferCapMismatch { bound: OfferId, requested: OfferId },

    /// The supplied item belongs to a different collection than the offer declares.
    #[error("OK_ERR_103: Collection mismatch: offer declares {expected}, item is {actual}")]
    CollectionMismatch {
        expected: CollectionId,
        actual: CollectionId,
    },

    /// The supplied kiosk is not the offer's delivery kiosk.
    #[error("OK_ERR_104: Offer kiosk mismatch: expected {expected}, got {actual}")]
    OfferKioskMismatch { expected: KioskId, actual: KioskId },

    // =================================================================
    // Listing Errors (2xx)
    // =================================================================
    /// The listing was already consumed (delisted, purchased) or never existed.
    #[error("OK_ERR_200: Listing not found: {0}")]
    ListingNotFound(ListingId),

    /// The caller is not the listing's owner.
    #[error("OK_ERR_201: Not listing owner: owner is {owner}, caller is {caller}")]
    NotListingOwner { owner: Address, caller: Address },

    /// The supplied item id does not match the listing record.
    #[error("OK_ERR_202: Listing item mismatch: expected {expected}, got {actual}")]
    ListingItemMismatch { expected: ItemId, actual: ItemId },

    /// The supplied kiosk id does not match the listing record.
    #[error("OK_ERR_203: Listing kiosk mismatch: expected {expected}, got {actual}")]
    ListingKioskMismatch { expected: KioskId, actual: KioskId },

    /// A listing with this id already exists in the registry.
    #[error("OK_ERR_204: Duplicate listing: {0}")]
    DuplicateListing(ListingId),

    // =================================================================
    // Funds / Balance Errors (3xx)
    // =================================================================
    /// Payment below the required price + fees sum.
    #[error("OK_ERR_300: Insufficient payment: need {needed}, offered {offered}")]
    InsufficientPayment { needed: u128, offered: u64 },

    /// A balance take would exceed the value present. Underflow aborts, never wraps.
    #[error("OK_ERR_301: Balance underflow: requested {requested}, available {available}")]
    BalanceUnderflow { requested: u64, available: u64 },

    /// Attempted to destroy a coin that still carries value.
    #[error("OK_ERR_302: Cannot destroy non-zero balance of {value}")]
    NonZeroBalance { value: u64 },

    /// A balance join would exceed `u64::MAX`. Overflow aborts, never wraps.
    #[error("OK_ERR_303: Balance overflow: {base} + {added} exceeds u64::MAX")]
    BalanceOverflow { base: u64, added: u64 },

    // =================================================================
    // Custody / Capability Errors (4xx)
    // =================================================================
    /// The presented kiosk capability does not grant access to this kiosk.
    #[error("OK_ERR_400: Kiosk access denied: {kiosk}")]
    KioskAccessDenied { kiosk: KioskId },

    /// The item is not present in the kiosk.
    #[error("OK_ERR_401: Item not found in kiosk: {0}")]
    ItemNotFound(ItemId),

    /// The item is locked and cannot be taken; it may only leave via purchase.
    #[error("OK_ERR_402: Item is locked: {0}")]
    ItemLocked(ItemId),

    /// The marketplace extension is not installed on this kiosk, so mediated
    /// deposits are refused.
    #[error("OK_ERR_403: Kiosk extension disabled: {kiosk}")]
    ExtensionDisabled { kiosk: KioskId },

    /// The presented purchase capability is bound to a different kiosk or item.
    #[error("OK_ERR_404: Purchase cap mismatch: {reason}")]
    PurchaseCapMismatch { reason: String },

    /// Payment through a purchase capability is below its floor price.
    #[error("OK_ERR_405: Purchase floor not met: floor {floor}, offered {offered}")]
    FloorNotMet { floor: u64, offered: u64 },

    /// An exclusive purchase capability is already outstanding for this item.
    #[error("OK_ERR_406: Item reserved by an outstanding purchase cap: {0}")]
    ItemReserved(ItemId),

    /// The item is already present in the kiosk.
    #[error("OK_ERR_407: Duplicate item in kiosk: {0}")]
    DuplicateItem(ItemId),

    // =================================================================
    // Transfer-Policy / Compliance Errors (5xx)
    // =================================================================
    /// Receipt confirmation found a registered rule without an attached proof.
    #[error("OK_ERR_500: Transfer rule not satisfied: {rule}")]
    RuleNotSatisfied { rule: RuleKind },

    /// The royalty payment does not cover the fee owed for the receipt's price.
    #[error("OK_ERR_501: Royalty underpaid: need {needed}, paid {paid}")]
    RoyaltyUnderpaid { needed: u64, paid: u64 },

    /// The presented policy capability governs a different collection.
    #[error("OK_ERR_502: Policy cap mismatch: cap governs {bound}, not {requested}")]
    PolicyCapMismatch {
        bound: CollectionId,
        requested: CollectionId,
    },

    /// The requested rule is not registered on this policy.
    #[error("OK_ERR_503: Rule not registered: {rule}")]
    RuleNotRegistered { rule: RuleKind },

    /// Lock-rule proof failed: the item is not locked in the destination kiosk.
    #[error("OK_ERR_504: Item not locked in destination kiosk: {0}")]
    ItemNotLocked(ItemId),

    /// Floor-price-rule proof failed: the paid amount is below the policy floor.
    #[error("OK_ERR_505: Price below policy floor: floor {floor}, paid {paid}")]
    PriceBelowFloor { floor: u64, paid: u64 },

    // =================================================================
    // Treasury / Admin Errors (6xx)
    // =================================================================
    /// Withdrawal request exceeds the treasury balance.
    #[error("OK_ERR_600: Treasury underflow: requested {requested}, available {available}")]
    TreasuryUnderflow { requested: u64, available: u64 },

    /// No payout is pending for this address.
    #[error("OK_ERR_601: Nothing to claim for {0}")]
    NothingToClaim(Address),

    /// A fee rate above 100% (10000 basis points) was supplied.
    #[error("OK_ERR_602: Invalid fee rate: {rate_bps} bps")]
    InvalidFeeRate { rate_bps: u16 },

    /// The presented market capability belongs to a different marketplace.
    #[error("OK_ERR_603: Market cap mismatch: cap is for {bound}, not {requested}")]
    MarketCapMismatch {
        bound: MarketplaceId,
        requested: MarketplaceId,
    },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("OK_ERR_900: Internal error: {0}")]
    Internal(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, OpenkioskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = OpenkioskError::OfferNotFound(OfferId::new());
        let msg = format!("{err}");
        assert!(msg.starts_with("OK_ERR_100"), "Got: {msg}");
    }

    #[test]
    fn insufficient_payment_display() {
        let err = OpenkioskError::InsufficientPayment {
            needed: 1020,
            offered: 1000,
        };
        let msg = format!("{err}");
        assert!(msg.contains("OK_ERR_300"));
        assert!(msg.contains("1020"));
        assert!(msg.contains("1000"));
    }

    #[test]
    fn rule_not_satisfied_display() {
        let err = OpenkioskError::RuleNotSatisfied {
            rule: RuleKind::Royalty,
        };
        let msg = format!("{err}");
        assert!(msg.contains("OK_ERR_500"));
        assert!(msg.contains("ROYALTY"));
    }

    #[test]
    fn all_errors_have_ok_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(OpenkioskError::DuplicateOffer(OfferId::new())),
            Box::new(OpenkioskError::ListingNotFound(ListingId::new())),
            Box::new(OpenkioskError::BalanceUnderflow {
                requested: 10,
                available: 5,
            }),
            Box::new(OpenkioskError::ItemLocked(ItemId::new())),
            Box::new(OpenkioskError::Internal("test".into())),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("OK_ERR_"),
                "Error missing OK_ERR_ prefix: {msg}"
            );
        }
    }
}
