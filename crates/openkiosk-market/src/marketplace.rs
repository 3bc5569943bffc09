//! # Marketplace orchestrator
//!
//! The [`Marketplace`] owns all shared marketplace state and drives every
//! protocol operation end to end:
//!
//! ```text
//!                      ┌───────────────────────────────┐
//!   make_offer ───────▶│        Marketplace            │
//!   accept_offer ─────▶│  fee schedule │ treasury      │──▶ events
//!   list / buy ───────▶│  offer stores │ payouts       │──▶ tracing
//!   admin (MarketCap) ▶│  listing registry │ event log │
//!                      └───────────────────────────────┘
//! ```
//!
//! Kiosks and transfer policies are collaborator objects owned by the
//! caller; the marketplace borrows them per call. The host platform
//! serializes transactions against one marketplace instance, so no interior
//! locking exists here.
//!
//! Fallible validation happens **before** the single destructive step of
//! each operation (record consumption). Once a record has been removed the
//! remaining settlement steps are infallible for protocol-created state;
//! a failure past that point aborts the enclosing host transaction.

use std::collections::{HashMap, VecDeque};

use chrono::Utc;
use serde::Serialize;

use openkiosk_custody::{Kiosk, KioskCap, TransferPolicy};
use openkiosk_types::{
    Address, Coin, FeeBreakdown, ItemId, KioskId, ListingId, MarketEvent, MarketEventKind,
    MarketplaceConfig, MarketplaceId, OfferId, OpenkioskError, Result, RuleKind, TransferReceipt,
    constants,
};

use crate::{
    fee_schedule::FeeSchedule,
    listing::ListingRecord,
    offer::{AcceptedOffer, OfferCap, OfferRecord},
    payouts::Payouts,
    settlement,
    store::{OfferKey, OfferStore},
    treasury::Treasury,
};

/// Bearer capability for marketplace administration.
///
/// Minted exactly once, by [`Marketplace::new`]. Gates fee-schedule updates
/// and treasury withdrawal.
#[must_use]
#[derive(Debug, Serialize)]
pub struct MarketCap {
    marketplace_id: MarketplaceId,
}

impl MarketCap {
    #[must_use]
    pub fn marketplace_id(&self) -> MarketplaceId {
        self.marketplace_id
    }
}

/// Shared state and entry points for one marketplace instance.
#[derive(Debug)]
pub struct Marketplace {
    id: MarketplaceId,
    config: MarketplaceConfig,
    fee_schedule: FeeSchedule,
    treasury: Treasury,
    payouts: Payouts,
    /// Direct-item offers, partitioned by delivery kiosk.
    kiosk_offers: HashMap<KioskId, OfferStore>,
    /// Collection-wide offers, marketplace-global.
    collection_offers: OfferStore,
    listings: HashMap<ListingId, ListingRecord>,
    events: VecDeque<MarketEvent>,
}

impl Marketplace {
    /// Create a marketplace and mint its admin capability.
    pub fn new(config: MarketplaceConfig) -> (Self, MarketCap) {
        let id = MarketplaceId::new();
        let fee_schedule = FeeSchedule::new(config.base_fee_bps);
        tracing::info!(marketplace = %id, base_fee_bps = config.base_fee_bps, "marketplace created");
        let market = Self {
            id,
            config,
            fee_schedule,
            treasury: Treasury::new(),
            payouts: Payouts::new(),
            kiosk_offers: HashMap::new(),
            collection_offers: OfferStore::new(),
            listings: HashMap::new(),
            events: VecDeque::new(),
        };
        (market, MarketCap { marketplace_id: id })
    }

    #[must_use]
    pub fn id(&self) -> MarketplaceId {
        self.id
    }

    #[must_use]
    pub fn config(&self) -> &MarketplaceConfig {
        &self.config
    }

    /// The fee rate currently applied to `address`, in basis points.
    #[must_use]
    pub fn fee_bps(&self, address: Address) -> u16 {
        self.fee_schedule.fee_bps(address)
    }

    #[must_use]
    pub fn treasury_value(&self) -> u64 {
        self.treasury.value()
    }

    /// Count of open offers across all stores.
    #[must_use]
    pub fn offer_count(&self) -> usize {
        self.kiosk_offers.values().map(OfferStore::len).sum::<usize>()
            + self.collection_offers.len()
    }

    #[must_use]
    pub fn listing_count(&self) -> usize {
        self.listings.len()
    }

    /// Total value still locked in offer escrow, for conservation audits.
    #[must_use]
    pub fn escrow_value(&self) -> u128 {
        let kiosk_sum: u128 = self
            .kiosk_offers
            .values()
            .map(OfferStore::balance_value)
            .sum();
        kiosk_sum + self.collection_offers.balance_value()
    }

    // =================================================================
    // Administration
    // =================================================================

    /// Replace the base fee rate.
    ///
    /// Open records are unaffected: their fees were fixed at creation.
    ///
    /// # Errors
    /// `MarketCapMismatch` on a foreign cap, `InvalidFeeRate` above 100%.
    pub fn set_base_fee(&mut self, cap: &MarketCap, rate_bps: u16) -> Result<()> {
        self.require_cap(cap)?;
        self.fee_schedule.set_base_fee(rate_bps)?;
        tracing::info!(marketplace = %self.id, rate_bps, "base fee updated");
        Ok(())
    }

    /// Upsert a per-address fee override.
    ///
    /// # Errors
    /// `MarketCapMismatch` on a foreign cap, `InvalidFeeRate` above 100%.
    pub fn set_personal_fee(
        &mut self,
        cap: &MarketCap,
        address: Address,
        rate_bps: u16,
    ) -> Result<()> {
        self.require_cap(cap)?;
        self.fee_schedule.set_personal_fee(address, rate_bps)?;
        tracing::info!(marketplace = %self.id, %address, rate_bps, "personal fee updated");
        Ok(())
    }

    /// Withdraw collected fees. `None` withdraws the full balance.
    ///
    /// # Errors
    /// `MarketCapMismatch` on a foreign cap, `TreasuryUnderflow` if `amount`
    /// exceeds the balance.
    pub fn treasury_withdraw(&mut self, cap: &MarketCap, amount: Option<u64>) -> Result<Coin> {
        self.require_cap(cap)?;
        self.treasury.withdraw(amount)
    }

    /// Top up the treasury. Ungated: anyone may donate.
    ///
    /// # Errors
    /// `BalanceOverflow` if the pool would exceed `u64::MAX`.
    pub fn treasury_deposit(&mut self, coin: Coin) -> Result<()> {
        self.treasury.credit(coin)
    }

    /// The pending payout balance for `address`.
    #[must_use]
    pub fn payout_value(&self, address: Address) -> u64 {
        self.payouts.value(address)
    }

    /// Claim the full pending payout for `address`.
    ///
    /// # Errors
    /// `NothingToClaim` if no payout is pending.
    pub fn claim_payout(&mut self, address: Address) -> Result<Coin> {
        self.payouts.claim(address)
    }

    /// Drain the buffered event log.
    pub fn drain_events(&mut self) -> Vec<MarketEvent> {
        self.events.drain(..).collect()
    }

    fn require_cap(&self, cap: &MarketCap) -> Result<()> {
        if cap.marketplace_id != self.id {
            return Err(OpenkioskError::MarketCapMismatch {
                bound: cap.marketplace_id,
                requested: self.id,
            });
        }
        Ok(())
    }

    // =================================================================
    // Offers
    // =================================================================

    /// Escrow a funded offer on `item_id`, deliverable into the offerer's
    /// own kiosk.
    ///
    /// The full payment is locked: price, the offerer's market fee at
    /// today's schedule, the policy's royalty fee at today's rate, plus any
    /// excess (refunded at settlement). Returns the revocation capability.
    ///
    /// # Errors
    /// `KioskAccessDenied` unless the offerer controls the delivery kiosk,
    /// `InsufficientPayment` if `payment` does not cover price + fees.
    #[allow(clippy::too_many_arguments)]
    pub fn make_offer(
        &mut self,
        sender: Address,
        dest_kiosk: &Kiosk,
        dest_cap: &KioskCap,
        item_id: ItemId,
        price: u64,
        policy: &TransferPolicy,
        payment: Coin,
    ) -> Result<OfferCap> {
        if !dest_kiosk.has_access(dest_cap) {
            return Err(OpenkioskError::KioskAccessDenied {
                kiosk: dest_kiosk.id(),
            });
        }
        let fees = self.quote_fees(sender, price, policy);
        Self::require_funding(&payment, &fees)?;

        let (record, cap) = OfferRecord::new(
            Some(dest_kiosk.id()),
            sender,
            Some(item_id),
            policy.collection(),
            fees,
            payment,
        );
        let offer_id = record.id();
        self.kiosk_offers
            .entry(dest_kiosk.id())
            .or_default()
            .insert(record)?;
        self.emit(MarketEvent {
            kind: MarketEventKind::OfferCreated,
            kiosk_id: Some(dest_kiosk.id()),
            offer_id: Some(offer_id),
            listing_id: None,
            item_id: Some(item_id),
            price: fees.price,
            royalty_fee: fees.royalty_fee,
            market_fee: fees.market_fee,
            address: sender,
            emitted_at: Utc::now(),
        });
        Ok(cap)
    }

    /// Escrow a collection-wide offer: any item of the policy's collection
    /// satisfies it, delivered into `dest_kiosk`.
    ///
    /// No kiosk access proof is required — the destination only ever
    /// receives an item, and the extension gate still applies at acceptance.
    ///
    /// # Errors
    /// `InsufficientPayment` if `payment` does not cover price + fees.
    pub fn make_collection_offer(
        &mut self,
        sender: Address,
        dest_kiosk: &Kiosk,
        price: u64,
        policy: &TransferPolicy,
        payment: Coin,
    ) -> Result<OfferCap> {
        let fees = self.quote_fees(sender, price, policy);
        Self::require_funding(&payment, &fees)?;

        let (record, cap) = OfferRecord::new(
            Some(dest_kiosk.id()),
            sender,
            None,
            policy.collection(),
            fees,
            payment,
        );
        let offer_id = record.id();
        self.collection_offers.insert(record)?;
        self.emit(MarketEvent {
            kind: MarketEventKind::OfferCreated,
            kiosk_id: None,
            offer_id: Some(offer_id),
            listing_id: None,
            item_id: None,
            price: fees.price,
            royalty_fee: fees.royalty_fee,
            market_fee: fees.market_fee,
            address: sender,
            emitted_at: Utc::now(),
        });
        Ok(cap)
    }

    /// Revoke an open direct-item offer, consuming its capability and
    /// returning the full escrowed balance to the caller.
    ///
    /// # Errors
    /// `OfferCapMismatch` if the cap binds a different offer,
    /// `KioskAccessDenied` without control of the delivery kiosk,
    /// `OfferNotFound` if already consumed.
    pub fn revoke_offer(
        &mut self,
        kiosk: &Kiosk,
        kiosk_cap: &KioskCap,
        offer_id: OfferId,
        item_id: ItemId,
        cap: OfferCap,
    ) -> Result<Coin> {
        Self::require_offer_cap(&cap, offer_id)?;
        if !kiosk.has_access(kiosk_cap) {
            return Err(OpenkioskError::KioskAccessDenied { kiosk: kiosk.id() });
        }
        let store = self
            .kiosk_offers
            .get_mut(&kiosk.id())
            .ok_or(OpenkioskError::OfferNotFound(offer_id))?;
        let record = store.remove_once(&(offer_id, Some(item_id)))?;
        let owner = record.owner();
        let fees = record.fees();
        self.emit(MarketEvent {
            kind: MarketEventKind::OfferRevoked,
            kiosk_id: Some(kiosk.id()),
            offer_id: Some(offer_id),
            listing_id: None,
            item_id: Some(item_id),
            price: fees.price,
            royalty_fee: fees.royalty_fee,
            market_fee: fees.market_fee,
            address: owner,
            emitted_at: Utc::now(),
        });
        Ok(record.into_balance())
    }

    /// Revoke an open collection offer.
    ///
    /// # Errors
    /// `OfferCapMismatch` if the cap binds a different offer,
    /// `OfferNotFound` if already consumed.
    pub fn revoke_collection_offer(&mut self, offer_id: OfferId, cap: OfferCap) -> Result<Coin> {
        Self::require_offer_cap(&cap, offer_id)?;
        let record = self.collection_offers.remove_once(&(offer_id, None))?;
        let owner = record.owner();
        let fees = record.fees();
        self.emit(MarketEvent {
            kind: MarketEventKind::OfferRevoked,
            kiosk_id: None,
            offer_id: Some(offer_id),
            listing_id: None,
            item_id: None,
            price: fees.price,
            royalty_fee: fees.royalty_fee,
            market_fee: fees.market_fee,
            address: owner,
            emitted_at: Utc::now(),
        });
        Ok(record.into_balance())
    }

    /// Accept a direct-item offer: move the item from the acceptor's kiosk
    /// into the offerer's, settle escrow, and hand back the seller payment
    /// plus the accepted-offer state awaiting [`Self::finalize_accept`].
    ///
    /// A locked item settles through the kiosk purchase path: the escrowed
    /// price lands in the acceptor's kiosk profits and the returned coin is
    /// zero.
    ///
    /// # Errors
    /// All validation runs before escrow consumption: kiosk access, record
    /// lookup, item custody state, collection match, extension gate, and the
    /// policy floor/royalty pre-checks each abort with their own error.
    #[allow(clippy::too_many_arguments)]
    pub fn accept_offer(
        &mut self,
        acceptor: Address,
        seller_kiosk: &mut Kiosk,
        seller_cap: &KioskCap,
        dest_kiosk: &mut Kiosk,
        offer_id: OfferId,
        item_id: ItemId,
        policy: &mut TransferPolicy,
    ) -> Result<(Coin, AcceptedOffer)> {
        if !seller_kiosk.has_access(seller_cap) {
            return Err(OpenkioskError::KioskAccessDenied {
                kiosk: seller_kiosk.id(),
            });
        }
        let key: OfferKey = (offer_id, Some(item_id));
        let store = self
            .kiosk_offers
            .get_mut(&dest_kiosk.id())
            .ok_or(OpenkioskError::OfferNotFound(offer_id))?;
        let found = store.get(&key).ok_or(OpenkioskError::OfferNotFound(offer_id))?;
        Self::prevalidate_acceptance(found, seller_kiosk, dest_kiosk, item_id, policy)?;

        // Consumption point: exactly-once, no path back into the store.
        let record = store.remove_once(&key)?;
        self.settle_acceptance(acceptor, record, seller_kiosk, seller_cap, dest_kiosk, item_id, policy)
    }

    /// Accept a collection-wide offer with any item of its collection.
    ///
    /// # Errors
    /// Same validation set as [`Self::accept_offer`], plus
    /// `OfferKioskMismatch` if `dest_kiosk` is not the offer's delivery
    /// kiosk.
    #[allow(clippy::too_many_arguments)]
    pub fn accept_collection_offer(
        &mut self,
        acceptor: Address,
        seller_kiosk: &mut Kiosk,
        seller_cap: &KioskCap,
        dest_kiosk: &mut Kiosk,
        offer_id: OfferId,
        item_id: ItemId,
        policy: &mut TransferPolicy,
    ) -> Result<(Coin, AcceptedOffer)> {
        if !seller_kiosk.has_access(seller_cap) {
            return Err(OpenkioskError::KioskAccessDenied {
                kiosk: seller_kiosk.id(),
            });
        }
        let key: OfferKey = (offer_id, None);
        let found = self
            .collection_offers
            .get(&key)
            .ok_or(OpenkioskError::OfferNotFound(offer_id))?;
        Self::prevalidate_acceptance(found, seller_kiosk, dest_kiosk, item_id, policy)?;

        let record = self.collection_offers.remove_once(&key)?;
        self.settle_acceptance(acceptor, record, seller_kiosk, seller_cap, dest_kiosk, item_id, policy)
    }

    /// Confirm the compliance receipt of an accepted offer and credit the
    /// escrow remainder back to the offer's owner.
    ///
    /// # Errors
    /// `RuleNotSatisfied` if a registered rule is missing its proof.
    pub fn finalize_accept(
        &mut self,
        accepted: AcceptedOffer,
        policy: &TransferPolicy,
    ) -> Result<()> {
        let AcceptedOffer {
            offer_id,
            owner,
            remainder,
            receipt,
        } = accepted;
        policy.confirm(receipt)?;
        tracing::debug!(offer = %offer_id, %owner, remainder = remainder.value(), "offer finalized");
        self.payouts.credit(owner, remainder)?;
        Ok(())
    }

    /// Decline a direct-item offer on behalf of the item's current holder,
    /// refunding the full escrowed balance to the offerer's payout account.
    ///
    /// Holding the item (kiosk control plus custody of `item_id`) is the
    /// authorization: only the party who could have accepted may decline.
    ///
    /// # Errors
    /// `KioskAccessDenied` or `ItemNotFound` without that proof,
    /// `OfferNotFound` if already consumed.
    pub fn decline_offer(
        &mut self,
        decliner: Address,
        item_kiosk: &Kiosk,
        item_cap: &KioskCap,
        dest_kiosk_id: KioskId,
        offer_id: OfferId,
        item_id: ItemId,
    ) -> Result<()> {
        if !item_kiosk.has_access(item_cap) {
            return Err(OpenkioskError::KioskAccessDenied {
                kiosk: item_kiosk.id(),
            });
        }
        if !item_kiosk.has_item(item_id) {
            return Err(OpenkioskError::ItemNotFound(item_id));
        }
        let store = self
            .kiosk_offers
            .get_mut(&dest_kiosk_id)
            .ok_or(OpenkioskError::OfferNotFound(offer_id))?;
        let record = store.remove_once(&(offer_id, Some(item_id)))?;
        let owner = record.owner();
        let fees = record.fees();
        self.payouts.credit(owner, record.into_balance())?;
        self.emit(MarketEvent {
            kind: MarketEventKind::OfferDeclined,
            kiosk_id: Some(dest_kiosk_id),
            offer_id: Some(offer_id),
            listing_id: None,
            item_id: Some(item_id),
            price: fees.price,
            royalty_fee: fees.royalty_fee,
            market_fee: fees.market_fee,
            address: decliner,
            emitted_at: Utc::now(),
        });
        Ok(())
    }

    fn quote_fees(&self, sender: Address, price: u64, policy: &TransferPolicy) -> FeeBreakdown {
        FeeBreakdown::new(
            price,
            self.fee_schedule.market_fee(sender, price),
            policy.royalty_fee(price),
        )
    }

    fn require_funding(payment: &Coin, fees: &FeeBreakdown) -> Result<()> {
        let needed = fees.total();
        if u128::from(payment.value()) < needed {
            return Err(OpenkioskError::InsufficientPayment {
                needed,
                offered: payment.value(),
            });
        }
        Ok(())
    }

    fn require_offer_cap(cap: &OfferCap, offer_id: OfferId) -> Result<()> {
        if cap.offer_id() != offer_id {
            return Err(OpenkioskError::OfferCapMismatch {
                bound: cap.offer_id(),
                requested: offer_id,
            });
        }
        Ok(())
    }

    /// Everything that can fail about an acceptance, checked against the
    /// still-stored record so a failure leaves the offer open.
    fn prevalidate_acceptance(
        record: &OfferRecord,
        seller_kiosk: &Kiosk,
        dest_kiosk: &Kiosk,
        item_id: ItemId,
        policy: &TransferPolicy,
    ) -> Result<()> {
        if let Some(expected) = record.kiosk_id() {
            if expected != dest_kiosk.id() {
                return Err(OpenkioskError::OfferKioskMismatch {
                    expected,
                    actual: dest_kiosk.id(),
                });
            }
        }
        let collection = seller_kiosk
            .item_collection(item_id)
            .ok_or(OpenkioskError::ItemNotFound(item_id))?;
        if seller_kiosk.is_reserved(item_id) {
            return Err(OpenkioskError::ItemReserved(item_id));
        }
        if collection != record.collection() {
            return Err(OpenkioskError::CollectionMismatch {
                expected: record.collection(),
                actual: collection,
            });
        }
        if policy.collection() != record.collection() {
            return Err(OpenkioskError::CollectionMismatch {
                expected: record.collection(),
                actual: policy.collection(),
            });
        }
        if !dest_kiosk.is_extension_enabled() {
            return Err(OpenkioskError::ExtensionDisabled {
                kiosk: dest_kiosk.id(),
            });
        }
        if let Some(floor) = policy.floor() {
            if record.price() < floor {
                return Err(OpenkioskError::PriceBelowFloor {
                    floor,
                    paid: record.price(),
                });
            }
        }
        // Royalty drift: the rate may have risen since the offer was made.
        // The escrowed royalty portion must still cover today's fee.
        let needed = policy.royalty_fee(record.price());
        if needed > record.royalty_fee() {
            return Err(OpenkioskError::RoyaltyUnderpaid {
                needed,
                paid: record.royalty_fee(),
            });
        }
        Ok(())
    }

    /// Post-consumption settlement: split escrow, move the item, attach
    /// proofs. Infallible for records the public protocol created.
    #[allow(clippy::too_many_arguments)]
    fn settle_acceptance(
        &mut self,
        acceptor: Address,
        mut record: OfferRecord,
        seller_kiosk: &mut Kiosk,
        seller_cap: &KioskCap,
        dest_kiosk: &mut Kiosk,
        item_id: ItemId,
        policy: &mut TransferPolicy,
    ) -> Result<(Coin, AcceptedOffer)> {
        let fees = record.fees();
        let split = settlement::split_proceeds(record.balance_mut(), &fees, &mut self.treasury)?;

        // A locked item cannot be taken: it leaves only through the purchase
        // path. An internal purchase cap at the escrowed price banks the
        // seller payment into the acceptor's kiosk profits and releases the
        // lock; the loose seller coin is then zero.
        let (item, mut receipt, seller_payment) = if seller_kiosk.is_locked(item_id) {
            let pcap = seller_kiosk.create_purchase_cap(seller_cap, item_id, record.price())?;
            let (item, receipt) = seller_kiosk.execute_purchase(pcap, split.seller)?;
            (item, receipt, Coin::zero())
        } else {
            let item = seller_kiosk.take(seller_cap, item_id)?;
            let receipt = TransferReceipt::new(item_id, seller_kiosk.id(), record.price());
            (item, receipt, split.seller)
        };
        if policy.has_rule(RuleKind::Lock) {
            dest_kiosk.deposit_locked(item, policy)?;
            policy.prove_lock(&mut receipt, dest_kiosk)?;
        } else {
            dest_kiosk.deposit_plain(item, policy)?;
        }
        if policy.has_rule(RuleKind::Royalty) {
            policy.pay_royalty(&mut receipt, split.royalty)?;
        } else {
            split.royalty.destroy_zero()?;
        }
        if policy.has_rule(RuleKind::FloorPrice) {
            policy.prove_floor(&mut receipt)?;
        }

        let offer_id = record.id();
        let owner = record.owner();
        let remainder = record.into_balance();
        self.emit(MarketEvent {
            kind: MarketEventKind::OfferAccepted,
            kiosk_id: Some(dest_kiosk.id()),
            offer_id: Some(offer_id),
            listing_id: None,
            item_id: Some(item_id),
            price: fees.price,
            royalty_fee: fees.royalty_fee,
            market_fee: fees.market_fee,
            address: acceptor,
            emitted_at: Utc::now(),
        });
        Ok((
            seller_payment,
            AcceptedOffer {
                offer_id,
                owner,
                remainder,
                receipt,
            },
        ))
    }

    // =================================================================
    // Listings
    // =================================================================

    /// List an item for sale: reserve it with an exclusive purchase cap and
    /// register the listing with fees fixed at today's schedule.
    ///
    /// The emitted event carries the all-in display price (base + fees).
    ///
    /// # Errors
    /// `ItemNotFound` / `CollectionMismatch` for a bad item,
    /// `KioskAccessDenied` without kiosk control, `ItemReserved` if a cap is
    /// already outstanding.
    pub fn list(
        &mut self,
        sender: Address,
        kiosk: &mut Kiosk,
        cap: &KioskCap,
        item_id: ItemId,
        price: u64,
        policy: &TransferPolicy,
    ) -> Result<ListingId> {
        let collection = kiosk
            .item_collection(item_id)
            .ok_or(OpenkioskError::ItemNotFound(item_id))?;
        if collection != policy.collection() {
            return Err(OpenkioskError::CollectionMismatch {
                expected: policy.collection(),
                actual: collection,
            });
        }
        let market_fee = self.fee_schedule.market_fee(sender, price);
        let royalty_fee = policy.royalty_fee(price);
        let purchase_cap = kiosk.create_purchase_cap(cap, item_id, price)?;

        let id = ListingId::new();
        if self.listings.contains_key(&id) {
            return Err(OpenkioskError::DuplicateListing(id));
        }
        self.listings.insert(
            id,
            ListingRecord {
                id,
                kiosk_id: kiosk.id(),
                owner: sender,
                item_id,
                min_price: price,
                royalty_fee,
                market_fee,
                purchase_cap,
            },
        );

        let all_in = FeeBreakdown::new(price, market_fee, royalty_fee).total();
        self.emit(MarketEvent {
            kind: MarketEventKind::ListingCreated,
            kiosk_id: Some(kiosk.id()),
            offer_id: None,
            listing_id: Some(id),
            item_id: Some(item_id),
            price: u64::try_from(all_in).unwrap_or(u64::MAX),
            royalty_fee,
            market_fee,
            address: sender,
            emitted_at: Utc::now(),
        });
        Ok(id)
    }

    /// Re-price a listing, recomputing both fees at today's rates.
    ///
    /// The purchase cap's floor stays at the original listing price; a
    /// buyer of a listing re-priced below that floor fails `FloorNotMet`
    /// until the seller delists and relists.
    ///
    /// # Errors
    /// `ListingNotFound`, `NotListingOwner`, `ListingItemMismatch`, and
    /// `ListingKioskMismatch` each fire independently.
    pub fn update_listing(
        &mut self,
        sender: Address,
        listing_id: ListingId,
        kiosk_id: KioskId,
        item_id: ItemId,
        new_price: u64,
        policy: &TransferPolicy,
    ) -> Result<()> {
        let market_fee = self.fee_schedule.market_fee(sender, new_price);
        let royalty_fee = policy.royalty_fee(new_price);

        let record = self
            .listings
            .get_mut(&listing_id)
            .ok_or(OpenkioskError::ListingNotFound(listing_id))?;
        if record.owner != sender {
            return Err(OpenkioskError::NotListingOwner {
                owner: record.owner,
                caller: sender,
            });
        }
        if record.item_id != item_id {
            return Err(OpenkioskError::ListingItemMismatch {
                expected: record.item_id,
                actual: item_id,
            });
        }
        if record.kiosk_id != kiosk_id {
            return Err(OpenkioskError::ListingKioskMismatch {
                expected: record.kiosk_id,
                actual: kiosk_id,
            });
        }
        record.min_price = new_price;
        record.market_fee = market_fee;
        record.royalty_fee = royalty_fee;

        self.emit(MarketEvent {
            kind: MarketEventKind::ListingUpdated,
            kiosk_id: Some(kiosk_id),
            offer_id: None,
            listing_id: Some(listing_id),
            item_id: Some(item_id),
            price: new_price,
            royalty_fee,
            market_fee,
            address: sender,
            emitted_at: Utc::now(),
        });
        Ok(())
    }

    /// Remove a listing and release its item reservation.
    ///
    /// # Errors
    /// `ListingNotFound`, `NotListingOwner`, `ListingKioskMismatch`, or
    /// `KioskAccessDenied`.
    pub fn delist(
        &mut self,
        sender: Address,
        kiosk: &mut Kiosk,
        cap: &KioskCap,
        listing_id: ListingId,
    ) -> Result<()> {
        {
            let record = self
                .listings
                .get(&listing_id)
                .ok_or(OpenkioskError::ListingNotFound(listing_id))?;
            if record.owner != sender {
                return Err(OpenkioskError::NotListingOwner {
                    owner: record.owner,
                    caller: sender,
                });
            }
            if record.kiosk_id != kiosk.id() {
                return Err(OpenkioskError::ListingKioskMismatch {
                    expected: record.kiosk_id,
                    actual: kiosk.id(),
                });
            }
        }
        if !kiosk.has_access(cap) {
            return Err(OpenkioskError::KioskAccessDenied { kiosk: kiosk.id() });
        }
        let record = self
            .listings
            .remove(&listing_id)
            .ok_or(OpenkioskError::ListingNotFound(listing_id))?;
        let item_id = record.item_id;
        let fees = record.fees();
        kiosk.return_purchase_cap(record.purchase_cap)?;

        self.emit(MarketEvent {
            kind: MarketEventKind::ListingDelisted,
            kiosk_id: Some(kiosk.id()),
            offer_id: None,
            listing_id: Some(listing_id),
            item_id: Some(item_id),
            price: fees.price,
            royalty_fee: fees.royalty_fee,
            market_fee: fees.market_fee,
            address: sender,
            emitted_at: Utc::now(),
        });
        Ok(())
    }

    /// Purchase a listed item at its current all-in price.
    ///
    /// The buyer pays price + market fee + royalty fee; excess comes back as
    /// change. The item lands in `buyer_kiosk` (locked if the policy's lock
    /// rule demands it), the seller's kiosk banks the price into profits,
    /// and the transfer receipt returns with all proofs attached for the
    /// caller to [`TransferPolicy::confirm`].
    ///
    /// # Errors
    /// All validation runs before the listing is consumed: identity checks,
    /// funding, extension gate, collection match, policy floor, royalty
    /// drift, and the purchase cap's own floor each abort with their error.
    #[allow(clippy::too_many_arguments)]
    pub fn buy(
        &mut self,
        buyer: Address,
        buyer_kiosk: &mut Kiosk,
        seller_kiosk: &mut Kiosk,
        listing_id: ListingId,
        item_id: ItemId,
        policy: &mut TransferPolicy,
        mut payment: Coin,
    ) -> Result<(Coin, TransferReceipt)> {
        {
            let record = self
                .listings
                .get(&listing_id)
                .ok_or(OpenkioskError::ListingNotFound(listing_id))?;
            if record.item_id != item_id {
                return Err(OpenkioskError::ListingItemMismatch {
                    expected: record.item_id,
                    actual: item_id,
                });
            }
            if record.kiosk_id != seller_kiosk.id() {
                return Err(OpenkioskError::ListingKioskMismatch {
                    expected: record.kiosk_id,
                    actual: seller_kiosk.id(),
                });
            }
            Self::require_funding(&payment, &record.fees())?;
            if !buyer_kiosk.is_extension_enabled() {
                return Err(OpenkioskError::ExtensionDisabled {
                    kiosk: buyer_kiosk.id(),
                });
            }
            let collection = seller_kiosk
                .item_collection(item_id)
                .ok_or(OpenkioskError::ItemNotFound(item_id))?;
            if collection != policy.collection() {
                return Err(OpenkioskError::CollectionMismatch {
                    expected: policy.collection(),
                    actual: collection,
                });
            }
            if let Some(floor) = policy.floor() {
                if record.min_price < floor {
                    return Err(OpenkioskError::PriceBelowFloor {
                        floor,
                        paid: record.min_price,
                    });
                }
            }
            let needed = policy.royalty_fee(record.min_price);
            if needed > record.royalty_fee {
                return Err(OpenkioskError::RoyaltyUnderpaid {
                    needed,
                    paid: record.royalty_fee,
                });
            }
            // A listing re-priced below the cap's original floor is stuck
            // until delisted; surface that before consuming anything.
            if record.min_price < record.purchase_cap.floor_price() {
                return Err(OpenkioskError::FloorNotMet {
                    floor: record.purchase_cap.floor_price(),
                    offered: record.min_price,
                });
            }
        }

        // Consumption point.
        let record = self
            .listings
            .remove(&listing_id)
            .ok_or(OpenkioskError::ListingNotFound(listing_id))?;
        let fees = record.fees();
        let split = settlement::split_proceeds(&mut payment, &fees, &mut self.treasury)?;
        let ListingRecord { purchase_cap, .. } = record;

        let (item, mut receipt) = seller_kiosk.execute_purchase(purchase_cap, split.seller)?;
        if policy.has_rule(RuleKind::Lock) {
            buyer_kiosk.deposit_locked(item, policy)?;
            policy.prove_lock(&mut receipt, buyer_kiosk)?;
        } else {
            buyer_kiosk.deposit_plain(item, policy)?;
        }
        if policy.has_rule(RuleKind::Royalty) {
            policy.pay_royalty(&mut receipt, split.royalty)?;
        } else {
            split.royalty.destroy_zero()?;
        }
        if policy.has_rule(RuleKind::FloorPrice) {
            policy.prove_floor(&mut receipt)?;
        }

        self.emit(MarketEvent {
            kind: MarketEventKind::ItemPurchased,
            kiosk_id: Some(seller_kiosk.id()),
            offer_id: None,
            listing_id: Some(listing_id),
            item_id: Some(item_id),
            price: fees.price,
            royalty_fee: fees.royalty_fee,
            market_fee: fees.market_fee,
            address: buyer,
            emitted_at: Utc::now(),
        });
        // Change rides back to the buyer with the receipt.
        Ok((payment, receipt))
    }

    // =================================================================
    // Events
    // =================================================================

    fn emit(&mut self, event: MarketEvent) {
        tracing::info!(
            kind = %event.kind,
            price = event.price,
            market_fee = event.market_fee,
            royalty_fee = event.royalty_fee,
            address = %event.address,
            "market event"
        );
        if self.events.len() >= constants::MAX_EVENT_LOG {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}
