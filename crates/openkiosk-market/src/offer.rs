//! # Offer escrow records
//!
//! An [`OfferRecord`] locks the offerer's full payment (price + market fee +
//! royalty fee, plus any excess) until the offer reaches a terminal state:
//!
//! ```text
//!   ┌──────┐  accept    ┌──────────┐  finalize
//!   │ OPEN ├───────────▶│ ACCEPTED ├───────────▶ remainder to owner
//!   └──┬───┘            └──────────┘
//!      │ revoke (OfferCap)         ──▶ full refund to caller
//!      │ decline (item holder)     ──▶ full refund to owner
//! ```
//!
//! There is no pending substate: an offer is fully funded and open the
//! instant it is created. The record owns its locked balance by exclusive
//! composition — destructuring the record is the only way to reach the coin.

use serde::Serialize;

use openkiosk_types::{
    Address, Coin, CollectionId, FeeBreakdown, ItemId, KioskId, OfferId, TransferReceipt,
};

/// Escrow record for a direct-item or collection-wide offer.
///
/// `item_id` is `None` for collection offers: any item of `collection`
/// satisfies them. `kiosk_id` names the delivery kiosk; it is `None` only
/// for records not yet bound to a destination.
#[must_use]
#[derive(Debug, Serialize)]
pub struct OfferRecord {
    id: OfferId,
    kiosk_id: Option<KioskId>,
    owner: Address,
    item_id: Option<ItemId>,
    collection: CollectionId,
    #[serde(flatten)]
    fees: FeeBreakdown,
    balance: Coin,
}

impl OfferRecord {
    /// Build a funded record and mint its revocation capability.
    ///
    /// The caller has already verified `balance` covers `fees.total()`; the
    /// entire payment is absorbed and any excess rides along as "remaining",
    /// refunded at settlement, decline, or revoke.
    pub(crate) fn new(
        kiosk_id: Option<KioskId>,
        owner: Address,
        item_id: Option<ItemId>,
        collection: CollectionId,
        fees: FeeBreakdown,
        balance: Coin,
    ) -> (Self, OfferCap) {
        let id = OfferId::new();
        let record = Self {
            id,
            kiosk_id,
            owner,
            item_id,
            collection,
            fees,
            balance,
        };
        (record, OfferCap { offer_id: id })
    }

    #[must_use]
    pub fn id(&self) -> OfferId {
        self.id
    }

    #[must_use]
    pub fn kiosk_id(&self) -> Option<KioskId> {
        self.kiosk_id
    }

    #[must_use]
    pub fn owner(&self) -> Address {
        self.owner
    }

    #[must_use]
    pub fn item_id(&self) -> Option<ItemId> {
        self.item_id
    }

    #[must_use]
    pub fn collection(&self) -> CollectionId {
        self.collection
    }

    #[must_use]
    pub fn price(&self) -> u64 {
        self.fees.price
    }

    #[must_use]
    pub fn market_fee(&self) -> u64 {
        self.fees.market_fee
    }

    #[must_use]
    pub fn royalty_fee(&self) -> u64 {
        self.fees.royalty_fee
    }

    #[must_use]
    pub fn fees(&self) -> FeeBreakdown {
        self.fees
    }

    #[must_use]
    pub fn balance_value(&self) -> u64 {
        self.balance.value()
    }

    pub(crate) fn balance_mut(&mut self) -> &mut Coin {
        &mut self.balance
    }

    /// Destructure into the locked balance.
    pub(crate) fn into_balance(self) -> Coin {
        self.balance
    }
}

/// Bearer capability authorizing revocation of exactly one offer.
///
/// Not `Clone`, not reconstructible: minted only with the record it binds
/// to, consumed by the revoke call.
#[must_use]
#[derive(Debug, Serialize)]
pub struct OfferCap {
    offer_id: OfferId,
}

impl OfferCap {
    #[must_use]
    pub fn offer_id(&self) -> OfferId {
        self.offer_id
    }
}

/// The accepted-but-unconfirmed phase of an offer settlement.
///
/// Holds the compliance receipt and any escrow remainder. The only exit is
/// `Marketplace::finalize_accept`, which confirms the receipt against the
/// policy and credits the remainder to the original offer owner.
#[must_use]
#[derive(Debug)]
pub struct AcceptedOffer {
    pub(crate) offer_id: OfferId,
    pub(crate) owner: Address,
    pub(crate) remainder: Coin,
    pub(crate) receipt: TransferReceipt,
}

impl AcceptedOffer {
    #[must_use]
    pub fn offer_id(&self) -> OfferId {
        self.offer_id
    }

    #[must_use]
    pub fn owner(&self) -> Address {
        self.owner
    }

    #[must_use]
    pub fn remainder_value(&self) -> u64 {
        self.remainder.value()
    }

    #[must_use]
    pub fn receipt(&self) -> &TransferReceipt {
        &self.receipt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_binds_cap_to_its_id() {
        let fees = FeeBreakdown::new(1000, 20, 0);
        let (record, cap) = OfferRecord::new(
            Some(KioskId::new()),
            Address::random(),
            Some(ItemId::new()),
            CollectionId::new(),
            fees,
            Coin::new(1020),
        );
        assert_eq!(cap.offer_id(), record.id());
        assert_eq!(record.balance_value(), 1020);
    }

    #[test]
    fn funding_invariant_at_creation() {
        let fees = FeeBreakdown::new(1000, 20, 50);
        let (record, _cap) = OfferRecord::new(
            None,
            Address::random(),
            None,
            CollectionId::new(),
            fees,
            Coin::new(1070),
        );
        assert_eq!(u128::from(record.balance_value()), record.fees().total());
    }

    #[test]
    fn record_serializes_flat_fee_fields() {
        let fees = FeeBreakdown::new(1000, 20, 50);
        let (record, _cap) = OfferRecord::new(
            Some(KioskId::new()),
            Address::random(),
            Some(ItemId::new()),
            CollectionId::new(),
            fees,
            Coin::new(1070),
        );
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"price\":1000"));
        assert!(json.contains("\"market_fee\":20"));
        assert!(json.contains("\"royalty_fee\":50"));
    }
}
