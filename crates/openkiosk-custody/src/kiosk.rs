//! # Kiosk — the sovereign asset container
//!
//! A kiosk holds items for exactly one owner. Mutation is gated by the
//! [`KioskCap`] minted alongside it: possession of the cap *is* the
//! authorization, there is no address comparison anywhere in custody.
//!
//! ## Item states
//!
//! ```text
//!   placed ──lock──▶ locked          (locked items can only leave via purchase)
//!     │                 │
//!     └──reserve────────┘            (exclusive PurchaseCap outstanding)
//! ```
//!
//! ## Mediated deposits
//!
//! Settlement deposits items into the *counterparty's* kiosk without holding
//! its cap. That path requires the marketplace extension to be installed
//! ([`Kiosk::install_extension`]) and always goes through a transfer policy:
//! [`Kiosk::deposit_locked`] when the policy registers a lock rule,
//! [`Kiosk::deposit_plain`] otherwise.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use openkiosk_types::{
    Address, Coin, CollectionId, ItemId, KioskId, OpenkioskError, Result, RuleKind,
    TransferReceipt,
};

use crate::policy::TransferPolicy;

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// A non-fungible asset. Move-only: custody is ownership.
#[must_use]
#[derive(Debug, Serialize)]
pub struct Item {
    id: ItemId,
    collection: CollectionId,
}

impl Item {
    /// Mint an item with a deterministic id derived from (collection, serial).
    pub fn mint(collection: CollectionId, serial: u64) -> Self {
        Self {
            id: ItemId::derive(collection, serial),
            collection,
        }
    }

    /// Mint an item with a fresh random id.
    pub fn new(collection: CollectionId) -> Self {
        Self {
            id: ItemId::new(),
            collection,
        }
    }

    #[must_use]
    pub fn id(&self) -> ItemId {
        self.id
    }

    #[must_use]
    pub fn collection(&self) -> CollectionId {
        self.collection
    }
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Bearer capability granting full access to one kiosk.
///
/// Not `Clone`, not deserializable: the only construction path is
/// [`Kiosk::new`].
#[derive(Debug, Serialize)]
pub struct KioskCap {
    kiosk_id: KioskId,
}

impl KioskCap {
    #[must_use]
    pub fn kiosk_id(&self) -> KioskId {
        self.kiosk_id
    }
}

/// Exclusive right to complete the sale of one item in one kiosk at or above
/// a floor price. Minted by [`Kiosk::create_purchase_cap`], consumed by
/// [`Kiosk::execute_purchase`] or [`Kiosk::return_purchase_cap`].
#[must_use]
#[derive(Debug, Serialize)]
pub struct PurchaseCap {
    kiosk_id: KioskId,
    item_id: ItemId,
    floor_price: u64,
}

impl PurchaseCap {
    #[must_use]
    pub fn kiosk_id(&self) -> KioskId {
        self.kiosk_id
    }

    #[must_use]
    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    #[must_use]
    pub fn floor_price(&self) -> u64 {
        self.floor_price
    }
}

// ---------------------------------------------------------------------------
// Kiosk
// ---------------------------------------------------------------------------

/// A per-user asset container with a profits balance.
#[derive(Debug, Serialize)]
pub struct Kiosk {
    id: KioskId,
    owner: Address,
    items: HashMap<ItemId, Item>,
    locked: HashSet<ItemId>,
    /// Items with an outstanding exclusive purchase cap.
    reserved: HashSet<ItemId>,
    /// Sale proceeds collected by capability-gated purchases.
    profits: Coin,
    extension_enabled: bool,
}

impl Kiosk {
    /// Create a kiosk for `owner` and mint its access capability.
    pub fn new(owner: Address) -> (Self, KioskCap) {
        let id = KioskId::new();
        tracing::debug!(kiosk = %id, owner = %owner, "kiosk created");
        let kiosk = Self {
            id,
            owner,
            items: HashMap::new(),
            locked: HashSet::new(),
            reserved: HashSet::new(),
            profits: Coin::zero(),
            extension_enabled: false,
        };
        (kiosk, KioskCap { kiosk_id: id })
    }

    #[must_use]
    pub fn id(&self) -> KioskId {
        self.id
    }

    #[must_use]
    pub fn owner(&self) -> Address {
        self.owner
    }

    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn has_item(&self, item_id: ItemId) -> bool {
        self.items.contains_key(&item_id)
    }

    #[must_use]
    pub fn is_locked(&self, item_id: ItemId) -> bool {
        self.locked.contains(&item_id)
    }

    #[must_use]
    pub fn is_reserved(&self, item_id: ItemId) -> bool {
        self.reserved.contains(&item_id)
    }

    /// The collection of an item held here, if present.
    #[must_use]
    pub fn item_collection(&self, item_id: ItemId) -> Option<CollectionId> {
        self.items.get(&item_id).map(Item::collection)
    }

    #[must_use]
    pub fn is_extension_enabled(&self) -> bool {
        self.extension_enabled
    }

    #[must_use]
    pub fn profits_value(&self) -> u64 {
        self.profits.value()
    }

    /// Whether `cap` grants access to this kiosk.
    #[must_use]
    pub fn has_access(&self, cap: &KioskCap) -> bool {
        cap.kiosk_id == self.id
    }

    fn require_access(&self, cap: &KioskCap) -> Result<()> {
        if self.has_access(cap) {
            Ok(())
        } else {
            Err(OpenkioskError::KioskAccessDenied { kiosk: self.id })
        }
    }

    /// Place an item into the kiosk.
    ///
    /// # Errors
    /// `KioskAccessDenied` on a foreign cap, `DuplicateItem` if already present.
    pub fn place(&mut self, cap: &KioskCap, item: Item) -> Result<()> {
        self.require_access(cap)?;
        self.insert_item(item)
    }

    /// Place an item and lock it. A locked item can only leave via purchase.
    pub fn lock(&mut self, cap: &KioskCap, item: Item) -> Result<()> {
        self.require_access(cap)?;
        let item_id = item.id();
        self.insert_item(item)?;
        self.locked.insert(item_id);
        Ok(())
    }

    /// Take an item out of the kiosk.
    ///
    /// # Errors
    /// `ItemReserved` if an exclusive purchase cap is outstanding,
    /// `ItemLocked` for locked items, `ItemNotFound` if absent.
    pub fn take(&mut self, cap: &KioskCap, item_id: ItemId) -> Result<Item> {
        self.require_access(cap)?;
        if self.reserved.contains(&item_id) {
            return Err(OpenkioskError::ItemReserved(item_id));
        }
        if self.locked.contains(&item_id) {
            return Err(OpenkioskError::ItemLocked(item_id));
        }
        self.items
            .remove(&item_id)
            .ok_or(OpenkioskError::ItemNotFound(item_id))
    }

    /// Install the marketplace extension, enabling mediated deposits.
    pub fn install_extension(&mut self, cap: &KioskCap) -> Result<()> {
        self.require_access(cap)?;
        self.extension_enabled = true;
        Ok(())
    }

    /// Extension-mediated deposit without locking.
    ///
    /// # Errors
    /// `ExtensionDisabled` if the extension is not installed,
    /// `RuleNotSatisfied(Lock)` if the policy demands the lock path,
    /// `CollectionMismatch` if the item is foreign to the policy.
    pub fn deposit_plain(&mut self, item: Item, policy: &TransferPolicy) -> Result<()> {
        self.require_extension()?;
        self.require_policy_collection(&item, policy)?;
        if policy.has_rule(RuleKind::Lock) {
            return Err(OpenkioskError::RuleNotSatisfied {
                rule: RuleKind::Lock,
            });
        }
        self.insert_item(item)
    }

    /// Extension-mediated deposit that locks the item on arrival.
    pub fn deposit_locked(&mut self, item: Item, policy: &TransferPolicy) -> Result<()> {
        self.require_extension()?;
        self.require_policy_collection(&item, policy)?;
        let item_id = item.id();
        self.insert_item(item)?;
        self.locked.insert(item_id);
        Ok(())
    }

    /// Mint an exclusive purchase capability for `item_id` at `floor_price`.
    ///
    /// The item stays in the kiosk but is reserved: it cannot be taken while
    /// the cap is outstanding.
    pub fn create_purchase_cap(
        &mut self,
        cap: &KioskCap,
        item_id: ItemId,
        floor_price: u64,
    ) -> Result<PurchaseCap> {
        self.require_access(cap)?;
        if !self.items.contains_key(&item_id) {
            return Err(OpenkioskError::ItemNotFound(item_id));
        }
        if !self.reserved.insert(item_id) {
            return Err(OpenkioskError::ItemReserved(item_id));
        }
        Ok(PurchaseCap {
            kiosk_id: self.id,
            item_id,
            floor_price,
        })
    }

    /// Return an unused purchase capability, releasing the reservation.
    pub fn return_purchase_cap(&mut self, pcap: PurchaseCap) -> Result<()> {
        if pcap.kiosk_id != self.id {
            return Err(OpenkioskError::PurchaseCapMismatch {
                reason: format!("cap is for {}, not {}", pcap.kiosk_id, self.id),
            });
        }
        self.reserved.remove(&pcap.item_id);
        Ok(())
    }

    /// Complete the capability-gated sale: consume the cap, bank the payment
    /// into profits, release the item, and mint the transfer receipt.
    ///
    /// # Errors
    /// `PurchaseCapMismatch` on a foreign cap, `FloorNotMet` if the payment
    /// is below the cap's floor price.
    pub fn execute_purchase(
        &mut self,
        pcap: PurchaseCap,
        payment: Coin,
    ) -> Result<(Item, TransferReceipt)> {
        if pcap.kiosk_id != self.id {
            return Err(OpenkioskError::PurchaseCapMismatch {
                reason: format!("cap is for {}, not {}", pcap.kiosk_id, self.id),
            });
        }
        let paid = payment.value();
        if paid < pcap.floor_price {
            return Err(OpenkioskError::FloorNotMet {
                floor: pcap.floor_price,
                offered: paid,
            });
        }
        if !self.items.contains_key(&pcap.item_id) {
            return Err(OpenkioskError::ItemNotFound(pcap.item_id));
        }
        // Bank the payment before releasing the item: the join is the last
        // fallible step.
        self.profits.join(payment)?;
        let item = self
            .items
            .remove(&pcap.item_id)
            .ok_or(OpenkioskError::ItemNotFound(pcap.item_id))?;
        self.reserved.remove(&pcap.item_id);
        self.locked.remove(&pcap.item_id);
        tracing::debug!(kiosk = %self.id, item = %pcap.item_id, paid, "purchase executed");
        Ok((item, TransferReceipt::new(pcap.item_id, self.id, paid)))
    }

    /// Withdraw sale proceeds. `None` withdraws the full balance.
    pub fn withdraw_profits(&mut self, cap: &KioskCap, amount: Option<u64>) -> Result<Coin> {
        self.require_access(cap)?;
        match amount {
            Some(amount) => self.profits.split(amount),
            None => Ok(self.profits.withdraw_all()),
        }
    }

    fn require_extension(&self) -> Result<()> {
        if self.extension_enabled {
            Ok(())
        } else {
            Err(OpenkioskError::ExtensionDisabled { kiosk: self.id })
        }
    }

    fn require_policy_collection(&self, item: &Item, policy: &TransferPolicy) -> Result<()> {
        if item.collection() == policy.collection() {
            Ok(())
        } else {
            Err(OpenkioskError::CollectionMismatch {
                expected: policy.collection(),
                actual: item.collection(),
            })
        }
    }

    fn insert_item(&mut self, item: Item) -> Result<()> {
        let item_id = item.id();
        if self.items.contains_key(&item_id) {
            return Err(OpenkioskError::DuplicateItem(item_id));
        }
        self.items.insert(item_id, item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::TransferPolicy;

    fn setup() -> (Kiosk, KioskCap, CollectionId) {
        let (kiosk, cap) = Kiosk::new(Address::random());
        (kiosk, cap, CollectionId::new())
    }

    #[test]
    fn place_and_take() {
        let (mut kiosk, cap, collection) = setup();
        let item = Item::mint(collection, 0);
        let item_id = item.id();

        kiosk.place(&cap, item).unwrap();
        assert!(kiosk.has_item(item_id));

        let item = kiosk.take(&cap, item_id).unwrap();
        assert_eq!(item.id(), item_id);
        assert!(!kiosk.has_item(item_id));
    }

    #[test]
    fn foreign_cap_denied() {
        let (mut kiosk, _cap, collection) = setup();
        let (_other, other_cap) = Kiosk::new(Address::random());

        let err = kiosk.place(&other_cap, Item::mint(collection, 0)).unwrap_err();
        assert!(matches!(err, OpenkioskError::KioskAccessDenied { .. }));
    }

    #[test]
    fn locked_item_cannot_be_taken() {
        let (mut kiosk, cap, collection) = setup();
        let item = Item::mint(collection, 0);
        let item_id = item.id();

        kiosk.lock(&cap, item).unwrap();
        let err = kiosk.take(&cap, item_id).unwrap_err();
        assert!(matches!(err, OpenkioskError::ItemLocked(_)));
    }

    #[test]
    fn duplicate_place_is_invariant_violation() {
        let (mut kiosk, cap, collection) = setup();
        kiosk.place(&cap, Item::mint(collection, 0)).unwrap();
        let err = kiosk.place(&cap, Item::mint(collection, 0)).unwrap_err();
        assert!(matches!(err, OpenkioskError::DuplicateItem(_)));
    }

    #[test]
    fn deposit_requires_extension() {
        let (mut kiosk, _cap, collection) = setup();
        let (policy, _pcap) = TransferPolicy::new(collection);

        let err = kiosk
            .deposit_plain(Item::mint(collection, 0), &policy)
            .unwrap_err();
        assert!(matches!(err, OpenkioskError::ExtensionDisabled { .. }));
    }

    #[test]
    fn deposit_plain_refused_under_lock_rule() {
        let (mut kiosk, cap, collection) = setup();
        let (mut policy, policy_cap) = TransferPolicy::new(collection);
        policy.add_lock_rule(&policy_cap).unwrap();
        kiosk.install_extension(&cap).unwrap();

        let err = kiosk
            .deposit_plain(Item::mint(collection, 0), &policy)
            .unwrap_err();
        assert!(matches!(
            err,
            OpenkioskError::RuleNotSatisfied {
                rule: RuleKind::Lock
            }
        ));
    }

    #[test]
    fn deposit_locked_locks_item() {
        let (mut kiosk, cap, collection) = setup();
        let (policy, _pcap) = TransferPolicy::new(collection);
        kiosk.install_extension(&cap).unwrap();

        let item = Item::mint(collection, 0);
        let item_id = item.id();
        kiosk.deposit_locked(item, &policy).unwrap();
        assert!(kiosk.is_locked(item_id));
    }

    #[test]
    fn deposit_foreign_collection_refused() {
        let (mut kiosk, cap, collection) = setup();
        let (policy, _pcap) = TransferPolicy::new(collection);
        kiosk.install_extension(&cap).unwrap();

        let foreign = Item::mint(CollectionId::new(), 0);
        let err = kiosk.deposit_plain(foreign, &policy).unwrap_err();
        assert!(matches!(err, OpenkioskError::CollectionMismatch { .. }));
    }

    #[test]
    fn purchase_cap_reserves_item() {
        let (mut kiosk, cap, collection) = setup();
        let item = Item::mint(collection, 0);
        let item_id = item.id();
        kiosk.place(&cap, item).unwrap();

        let _pcap = kiosk.create_purchase_cap(&cap, item_id, 500).unwrap();
        let err = kiosk.take(&cap, item_id).unwrap_err();
        assert!(matches!(err, OpenkioskError::ItemReserved(_)));

        // A second exclusive cap for the same item must fail.
        let err = kiosk.create_purchase_cap(&cap, item_id, 500).unwrap_err();
        assert!(matches!(err, OpenkioskError::ItemReserved(_)));
    }

    #[test]
    fn return_purchase_cap_releases_reservation() {
        let (mut kiosk, cap, collection) = setup();
        let item = Item::mint(collection, 0);
        let item_id = item.id();
        kiosk.place(&cap, item).unwrap();

        let pcap = kiosk.create_purchase_cap(&cap, item_id, 500).unwrap();
        kiosk.return_purchase_cap(pcap).unwrap();
        assert!(kiosk.take(&cap, item_id).is_ok());
    }

    #[test]
    fn execute_purchase_pays_profits_and_mints_receipt() {
        let (mut kiosk, cap, collection) = setup();
        let item = Item::mint(collection, 0);
        let item_id = item.id();
        kiosk.place(&cap, item).unwrap();

        let pcap = kiosk.create_purchase_cap(&cap, item_id, 500).unwrap();
        let (item, receipt) = kiosk.execute_purchase(pcap, Coin::new(500)).unwrap();

        assert_eq!(item.id(), item_id);
        assert_eq!(receipt.item_id(), item_id);
        assert_eq!(receipt.source(), kiosk.id());
        assert_eq!(receipt.paid(), 500);
        assert_eq!(kiosk.profits_value(), 500);
        assert!(!kiosk.has_item(item_id));
    }

    #[test]
    fn execute_purchase_below_floor_fails() {
        let (mut kiosk, cap, collection) = setup();
        let item = Item::mint(collection, 0);
        let item_id = item.id();
        kiosk.place(&cap, item).unwrap();

        let pcap = kiosk.create_purchase_cap(&cap, item_id, 500).unwrap();
        let err = kiosk.execute_purchase(pcap, Coin::new(499)).unwrap_err();
        assert!(matches!(
            err,
            OpenkioskError::FloorNotMet {
                floor: 500,
                offered: 499
            }
        ));
    }

    #[test]
    fn locked_item_sellable_via_purchase_cap() {
        let (mut kiosk, cap, collection) = setup();
        let item = Item::mint(collection, 0);
        let item_id = item.id();
        kiosk.lock(&cap, item).unwrap();

        let pcap = kiosk.create_purchase_cap(&cap, item_id, 100).unwrap();
        let (item, _receipt) = kiosk.execute_purchase(pcap, Coin::new(100)).unwrap();
        assert_eq!(item.id(), item_id);
        assert!(!kiosk.is_locked(item_id));
    }

    #[test]
    fn withdraw_profits_full_and_partial() {
        let (mut kiosk, cap, collection) = setup();
        let item = Item::mint(collection, 0);
        let item_id = item.id();
        kiosk.place(&cap, item).unwrap();
        let pcap = kiosk.create_purchase_cap(&cap, item_id, 0).unwrap();
        kiosk.execute_purchase(pcap, Coin::new(1000)).unwrap();

        let part = kiosk.withdraw_profits(&cap, Some(300)).unwrap();
        assert_eq!(part.value(), 300);
        let rest = kiosk.withdraw_profits(&cap, None).unwrap();
        assert_eq!(rest.value(), 700);
        assert_eq!(kiosk.profits_value(), 0);
    }
}
