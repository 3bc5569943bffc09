//! End-to-end integration tests across both planes.
//!
//! These tests exercise full protocol lifecycles:
//! Custody (kiosks, policies) -> Settlement (offers, listings, escrow)
//!
//! They verify that the planes work together correctly in realistic
//! scenarios: offer settlement with fees and rules, third-party refunds,
//! re-priced listings, exactly-once consumption, and value conservation.

use openkiosk_custody::{Item, Kiosk, KioskCap, PolicyCap, TransferPolicy};
use openkiosk_market::Marketplace;
use openkiosk_types::{
    Address, Coin, CollectionId, ItemId, MarketplaceConfig, OpenkioskError,
};

/// Helper: one collection with its policy cap, plus a marketplace at the
/// default 2% base fee.
struct Venue {
    market: Marketplace,
    policy: TransferPolicy,
    policy_cap: PolicyCap,
    collection: CollectionId,
}

impl Venue {
    fn new() -> Self {
        let (market, _admin) = Marketplace::new(MarketplaceConfig::default());
        let collection = CollectionId::new();
        let (policy, policy_cap) = TransferPolicy::new(collection);
        Self {
            market,
            policy,
            policy_cap,
            collection,
        }
    }

    /// A kiosk with the marketplace extension installed, holding one freshly
    /// minted item of the venue's collection.
    fn seller_with_item(&self) -> (Kiosk, KioskCap, Address, ItemId) {
        let owner = Address::random();
        let (mut kiosk, cap) = Kiosk::new(owner);
        kiosk.install_extension(&cap).unwrap();
        let item = Item::new(self.collection);
        let item_id = item.id();
        kiosk.place(&cap, item).unwrap();
        (kiosk, cap, owner, item_id)
    }

    fn buyer_kiosk(&self) -> (Kiosk, KioskCap, Address) {
        let owner = Address::random();
        let (mut kiosk, cap) = Kiosk::new(owner);
        kiosk.install_extension(&cap).unwrap();
        (kiosk, cap, owner)
    }
}

// =============================================================================
// Test: offer lifecycle — make, accept, finalize, with fee settlement
// =============================================================================
#[test]
fn e2e_offer_accept_settles_all_parties() {
    let mut venue = Venue::new();
    let (mut seller_kiosk, seller_cap, seller, item_id) = venue.seller_with_item();
    let (mut offerer_kiosk, offerer_cap, offerer) = venue.buyer_kiosk();

    // Offer 1000 for the item; 2% market fee = 20.
    let offer_cap = venue
        .market
        .make_offer(
            offerer,
            &offerer_kiosk,
            &offerer_cap,
            item_id,
            1000,
            &venue.policy,
            Coin::new(1020),
        )
        .unwrap();

    let (seller_payment, accepted) = venue
        .market
        .accept_offer(
            seller,
            &mut seller_kiosk,
            &seller_cap,
            &mut offerer_kiosk,
            offer_cap.offer_id(),
            item_id,
            &mut venue.policy,
        )
        .unwrap();

    assert_eq!(seller_payment.value(), 1000);
    assert_eq!(venue.market.treasury_value(), 20);
    assert!(offerer_kiosk.has_item(item_id));
    assert!(!seller_kiosk.has_item(item_id));

    venue.market.finalize_accept(accepted, &venue.policy).unwrap();
    // Exact funding: nothing left over to claim.
    assert_eq!(venue.market.payout_value(offerer), 0);
}

// =============================================================================
// Test: overpayment rides as remainder and returns at finalize
// =============================================================================
#[test]
fn e2e_overpayment_refunded_at_finalize() {
    let mut venue = Venue::new();
    let (mut seller_kiosk, seller_cap, seller, item_id) = venue.seller_with_item();
    let (mut offerer_kiosk, offerer_cap, offerer) = venue.buyer_kiosk();

    // 1050 against an all-in of 1020: 30 excess.
    let offer_cap = venue
        .market
        .make_offer(
            offerer,
            &offerer_kiosk,
            &offerer_cap,
            item_id,
            1000,
            &venue.policy,
            Coin::new(1050),
        )
        .unwrap();

    let (_payment, accepted) = venue
        .market
        .accept_offer(
            seller,
            &mut seller_kiosk,
            &seller_cap,
            &mut offerer_kiosk,
            offer_cap.offer_id(),
            item_id,
            &mut venue.policy,
        )
        .unwrap();
    assert_eq!(accepted.remainder_value(), 30);

    venue.market.finalize_accept(accepted, &venue.policy).unwrap();
    let refund = venue.market.claim_payout(offerer).unwrap();
    assert_eq!(refund.value(), 30);

    // Claims are not idempotent: the account is now empty.
    let err = venue.market.claim_payout(offerer).unwrap_err();
    assert!(matches!(err, OpenkioskError::NothingToClaim(_)));
}

// =============================================================================
// Test: decline routes the full escrow back through payouts
// =============================================================================
#[test]
fn e2e_decline_refunds_offerer() {
    let mut venue = Venue::new();
    let (seller_kiosk, seller_cap, seller, item_id) = venue.seller_with_item();
    let (offerer_kiosk, offerer_cap, offerer) = venue.buyer_kiosk();

    let offer_cap = venue
        .market
        .make_offer(
            offerer,
            &offerer_kiosk,
            &offerer_cap,
            item_id,
            1000,
            &venue.policy,
            Coin::new(1020),
        )
        .unwrap();

    venue
        .market
        .decline_offer(
            seller,
            &seller_kiosk,
            &seller_cap,
            offerer_kiosk.id(),
            offer_cap.offer_id(),
            item_id,
        )
        .unwrap();

    let refund = venue.market.claim_payout(offerer).unwrap();
    assert_eq!(refund.value(), 1020);
    assert_eq!(venue.market.treasury_value(), 0);
    assert!(seller_kiosk.has_item(item_id));
}

// =============================================================================
// Test: royalty + lock rules settle and confirm through the receipt
// =============================================================================
#[test]
fn e2e_royalty_and_lock_rules() {
    let mut venue = Venue::new();
    // 5% royalty, min 1; items must arrive locked.
    venue
        .policy
        .add_royalty_rule(&venue.policy_cap, 500, 1)
        .unwrap();
    venue.policy.add_lock_rule(&venue.policy_cap).unwrap();

    let (mut seller_kiosk, seller_cap, seller, item_id) = venue.seller_with_item();
    let (mut offerer_kiosk, offerer_cap, offerer) = venue.buyer_kiosk();

    // 1000 + 20 market + 50 royalty = 1070 all-in.
    let offer_cap = venue
        .market
        .make_offer(
            offerer,
            &offerer_kiosk,
            &offerer_cap,
            item_id,
            1000,
            &venue.policy,
            Coin::new(1070),
        )
        .unwrap();

    let (payment, accepted) = venue
        .market
        .accept_offer(
            seller,
            &mut seller_kiosk,
            &seller_cap,
            &mut offerer_kiosk,
            offer_cap.offer_id(),
            item_id,
            &mut venue.policy,
        )
        .unwrap();

    assert_eq!(payment.value(), 1000);
    assert_eq!(venue.market.treasury_value(), 20);
    assert_eq!(venue.policy.proceeds_value(), 50);
    // Lock rule: the item arrived locked in the destination kiosk.
    assert!(offerer_kiosk.is_locked(item_id));

    // Confirm succeeds because both proofs are attached.
    venue.market.finalize_accept(accepted, &venue.policy).unwrap();

    // Creator withdraws the banked royalty.
    let royalty = venue
        .policy
        .withdraw_proceeds(&venue.policy_cap, None)
        .unwrap();
    assert_eq!(royalty.value(), 50);
}

// =============================================================================
// Test: floor rule blocks a below-floor offer before any state changes
// =============================================================================
#[test]
fn e2e_floor_rule_blocks_cheap_offer() {
    let mut venue = Venue::new();
    venue.policy.add_floor_rule(&venue.policy_cap, 1000).unwrap();

    let (mut seller_kiosk, seller_cap, seller, item_id) = venue.seller_with_item();
    let (mut offerer_kiosk, offerer_cap, offerer) = venue.buyer_kiosk();

    let offer_cap = venue
        .market
        .make_offer(
            offerer,
            &offerer_kiosk,
            &offerer_cap,
            item_id,
            500,
            &venue.policy,
            Coin::new(510),
        )
        .unwrap();
    let offer_id = offer_cap.offer_id();

    let err = venue
        .market
        .accept_offer(
            seller,
            &mut seller_kiosk,
            &seller_cap,
            &mut offerer_kiosk,
            offer_id,
            item_id,
            &mut venue.policy,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        OpenkioskError::PriceBelowFloor { floor: 1000, paid: 500 }
    ));
    // Nothing was consumed: the offerer can still revoke for a full refund.
    let refund = venue
        .market
        .revoke_offer(&offerer_kiosk, &offerer_cap, offer_id, item_id, offer_cap)
        .unwrap();
    assert_eq!(refund.value(), 510);
    assert!(seller_kiosk.has_item(item_id));
}

// =============================================================================
// Test: listing re-price races a stale buyer; fresh buyer succeeds
// =============================================================================
#[test]
fn e2e_listing_reprice_and_purchase() {
    let mut venue = Venue::new();
    let (mut seller_kiosk, seller_cap, seller, item_id) = venue.seller_with_item();
    let (mut buyer_kiosk, _buyer_cap, buyer) = venue.buyer_kiosk();

    let listing_id = venue
        .market
        .list(seller, &mut seller_kiosk, &seller_cap, item_id, 500, &venue.policy)
        .unwrap();

    // Seller re-prices upward: fee recomputed 10 -> 20.
    venue
        .market
        .update_listing(seller, listing_id, seller_kiosk.id(), item_id, 1000, &venue.policy)
        .unwrap();

    // A buyer still holding the old 510 quote loses the race.
    let err = venue
        .market
        .buy(
            buyer,
            &mut buyer_kiosk,
            &mut seller_kiosk,
            listing_id,
            item_id,
            &mut venue.policy,
            Coin::new(510),
        )
        .unwrap_err();
    assert!(matches!(err, OpenkioskError::InsufficientPayment { needed: 1020, offered: 510 }));

    // A correctly funded purchase settles.
    let (change, receipt) = venue
        .market
        .buy(
            buyer,
            &mut buyer_kiosk,
            &mut seller_kiosk,
            listing_id,
            item_id,
            &mut venue.policy,
            Coin::new(1020),
        )
        .unwrap();
    assert!(change.is_zero());
    assert_eq!(venue.market.treasury_value(), 20);
    assert_eq!(seller_kiosk.profits_value(), 1000);
    assert!(buyer_kiosk.has_item(item_id));
    venue.policy.confirm(receipt).unwrap();

    // Seller withdraws the banked price.
    let proceeds = seller_kiosk.withdraw_profits(&seller_cap, None).unwrap();
    assert_eq!(proceeds.value(), 1000);
    change.destroy_zero().unwrap();
}

// =============================================================================
// Test: exactly-once — a consumed offer cannot be revoked or re-accepted
// =============================================================================
#[test]
fn e2e_consumed_offer_is_terminal() {
    let mut venue = Venue::new();
    let (mut seller_kiosk, seller_cap, seller, item_id) = venue.seller_with_item();
    let (mut offerer_kiosk, offerer_cap, offerer) = venue.buyer_kiosk();

    let offer_cap = venue
        .market
        .make_offer(
            offerer,
            &offerer_kiosk,
            &offerer_cap,
            item_id,
            1000,
            &venue.policy,
            Coin::new(1020),
        )
        .unwrap();
    let offer_id = offer_cap.offer_id();

    let (_payment, accepted) = venue
        .market
        .accept_offer(
            seller,
            &mut seller_kiosk,
            &seller_cap,
            &mut offerer_kiosk,
            offer_id,
            item_id,
            &mut venue.policy,
        )
        .unwrap();
    venue.market.finalize_accept(accepted, &venue.policy).unwrap();

    // The offerer's revoke attempt arrives after settlement.
    let err = venue
        .market
        .revoke_offer(&offerer_kiosk, &offerer_cap, offer_id, item_id, offer_cap)
        .unwrap_err();
    assert!(matches!(err, OpenkioskError::OfferNotFound(_)));
    // The item stays where settlement put it.
    assert!(offerer_kiosk.has_item(item_id));
}

// =============================================================================
// Test: collection offer settles against any item of the collection
// =============================================================================
#[test]
fn e2e_collection_offer_lifecycle() {
    let mut venue = Venue::new();
    let (mut seller_kiosk, seller_cap, seller, item_id) = venue.seller_with_item();
    let (mut offerer_kiosk, _offerer_cap, offerer) = venue.buyer_kiosk();

    let offer_cap = venue
        .market
        .make_collection_offer(offerer, &offerer_kiosk, 800, &venue.policy, Coin::new(816))
        .unwrap();

    let (payment, accepted) = venue
        .market
        .accept_collection_offer(
            seller,
            &mut seller_kiosk,
            &seller_cap,
            &mut offerer_kiosk,
            offer_cap.offer_id(),
            item_id,
            &mut venue.policy,
        )
        .unwrap();
    assert_eq!(payment.value(), 800);
    assert_eq!(venue.market.treasury_value(), 16);
    assert!(offerer_kiosk.has_item(item_id));
    venue.market.finalize_accept(accepted, &venue.policy).unwrap();
}

// =============================================================================
// Test: value conservation across a mixed scenario
// =============================================================================
#[test]
fn e2e_supply_conservation() {
    let mut venue = Venue::new();
    venue
        .policy
        .add_royalty_rule(&venue.policy_cap, 500, 0)
        .unwrap();

    let (mut seller_kiosk, seller_cap, seller, item_a) = venue.seller_with_item();
    let (mut offerer_kiosk, offerer_cap, offerer) = venue.buyer_kiosk();

    // Second item stays listed-and-bought through the listing path.
    let item_b = {
        let item = Item::new(venue.collection);
        let id = item.id();
        seller_kiosk.place(&seller_cap, item).unwrap();
        id
    };
    let (mut buyer_kiosk, _buyer_cap, buyer) = venue.buyer_kiosk();

    // Total minted currency in this scenario.
    let minted: u128 = 1075 + 2150;

    // Offer path: 1000 + 20 market + 50 royalty, funded with 1075 (5 excess).
    let offer_cap = venue
        .market
        .make_offer(
            offerer,
            &offerer_kiosk,
            &offerer_cap,
            item_a,
            1000,
            &venue.policy,
            Coin::new(1075),
        )
        .unwrap();
    let (seller_payment, accepted) = venue
        .market
        .accept_offer(
            seller,
            &mut seller_kiosk,
            &seller_cap,
            &mut offerer_kiosk,
            offer_cap.offer_id(),
            item_a,
            &mut venue.policy,
        )
        .unwrap();
    venue.market.finalize_accept(accepted, &venue.policy).unwrap();

    // Listing path: 2000 + 40 market + 100 royalty, paid with 2150 (10 change).
    let listing_id = venue
        .market
        .list(seller, &mut seller_kiosk, &seller_cap, item_b, 2000, &venue.policy)
        .unwrap();
    let (change, receipt) = venue
        .market
        .buy(
            buyer,
            &mut buyer_kiosk,
            &mut seller_kiosk,
            listing_id,
            item_b,
            &mut venue.policy,
            Coin::new(2150),
        )
        .unwrap();
    venue.policy.confirm(receipt).unwrap();

    // Every unit of minted value is accounted for, nothing minted or burned.
    let accounted = u128::from(venue.market.treasury_value())
        + u128::from(venue.policy.proceeds_value())
        + u128::from(seller_kiosk.profits_value())
        + u128::from(venue.market.payout_value(offerer))
        + venue.market.escrow_value()
        + u128::from(seller_payment.value())
        + u128::from(change.value());
    assert_eq!(accounted, minted);

    // Breakdown: treasury 20+40, royalties 50+100, profits 2000 (listing),
    // loose seller payment 1000 (offer), payout 5, change 10.
    assert_eq!(venue.market.treasury_value(), 60);
    assert_eq!(venue.policy.proceeds_value(), 150);
    assert_eq!(seller_kiosk.profits_value(), 2000);
    assert_eq!(venue.market.payout_value(offerer), 5);
    assert_eq!(change.value(), 10);
}

// =============================================================================
// Test: a lock-rule item stays tradable offer after offer
// =============================================================================
#[test]
fn e2e_locked_item_flows_through_offer_chain() {
    let mut venue = Venue::new();
    venue.policy.add_lock_rule(&venue.policy_cap).unwrap();

    let (mut seller_kiosk, seller_cap, seller, item_id) = venue.seller_with_item();
    let (mut first_kiosk, first_cap, first) = venue.buyer_kiosk();
    let (mut second_kiosk, second_cap, second) = venue.buyer_kiosk();

    // Hop 1: the item is plain in the seller's kiosk, arrives locked.
    let offer_cap = venue
        .market
        .make_offer(
            first,
            &first_kiosk,
            &first_cap,
            item_id,
            1000,
            &venue.policy,
            Coin::new(1020),
        )
        .unwrap();
    let (pay1, accepted) = venue
        .market
        .accept_offer(
            seller,
            &mut seller_kiosk,
            &seller_cap,
            &mut first_kiosk,
            offer_cap.offer_id(),
            item_id,
            &mut venue.policy,
        )
        .unwrap();
    assert_eq!(pay1.value(), 1000);
    assert!(first_kiosk.is_locked(item_id));
    venue.market.finalize_accept(accepted, &venue.policy).unwrap();

    // Hop 2: the now-locked item is offered on again and accepted. The
    // price settles through the purchase path into the first holder's
    // kiosk profits.
    let offer_cap = venue
        .market
        .make_offer(
            second,
            &second_kiosk,
            &second_cap,
            item_id,
            2000,
            &venue.policy,
            Coin::new(2040),
        )
        .unwrap();
    let (pay2, accepted) = venue
        .market
        .accept_offer(
            first,
            &mut first_kiosk,
            &first_cap,
            &mut second_kiosk,
            offer_cap.offer_id(),
            item_id,
            &mut venue.policy,
        )
        .unwrap();
    assert!(pay2.is_zero());
    assert_eq!(first_kiosk.profits_value(), 2000);
    assert!(!first_kiosk.has_item(item_id));
    assert!(second_kiosk.is_locked(item_id));
    assert_eq!(venue.market.treasury_value(), 60);
    venue.market.finalize_accept(accepted, &venue.policy).unwrap();

    let proceeds = first_kiosk.withdraw_profits(&first_cap, None).unwrap();
    assert_eq!(proceeds.value(), 2000);
    pay2.destroy_zero().unwrap();
}

// =============================================================================
// Test: raising the royalty rate strands an underfunded open offer
// =============================================================================
#[test]
fn e2e_royalty_drift_blocks_stale_offer() {
    let mut venue = Venue::new();
    venue
        .policy
        .add_royalty_rule(&venue.policy_cap, 100, 0)
        .unwrap();

    let (mut seller_kiosk, seller_cap, seller, item_id) = venue.seller_with_item();
    let (mut offerer_kiosk, offerer_cap, offerer) = venue.buyer_kiosk();

    // Funded for a 1% royalty: 1000 + 20 + 10.
    let offer_cap = venue
        .market
        .make_offer(
            offerer,
            &offerer_kiosk,
            &offerer_cap,
            item_id,
            1000,
            &venue.policy,
            Coin::new(1030),
        )
        .unwrap();
    let offer_id = offer_cap.offer_id();

    // The creator raises the rate to 10% while the offer is open.
    venue
        .policy
        .add_royalty_rule(&venue.policy_cap, 1000, 0)
        .unwrap();

    let err = venue
        .market
        .accept_offer(
            seller,
            &mut seller_kiosk,
            &seller_cap,
            &mut offerer_kiosk,
            offer_id,
            item_id,
            &mut venue.policy,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        OpenkioskError::RoyaltyUnderpaid { needed: 100, paid: 10 }
    ));

    // Escrow untouched: the offerer recovers everything.
    let refund = venue
        .market
        .revoke_offer(&offerer_kiosk, &offerer_cap, offer_id, item_id, offer_cap)
        .unwrap();
    assert_eq!(refund.value(), 1030);
}
