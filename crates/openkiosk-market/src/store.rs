//! Keyed offer container with insert/remove-once semantics.
//!
//! Records are addressed by the compound key (offer-id, item-id) so a record
//! cannot be reached without both components — multiple offers per kiosk
//! never cross-resolve. Collection offers carry no item id and use `None`.
//!
//! `remove_once` is the single point of exactly-once consumption: the host
//! platform serializes transactions targeting one store, so the loser of a
//! race simply observes "not found" and must surface a terminal error.

use std::collections::HashMap;

use openkiosk_types::{ItemId, OfferId, OpenkioskError, Result};

use crate::offer::OfferRecord;

/// Compound addressing key: offer id plus the bound item id, if any.
pub type OfferKey = (OfferId, Option<ItemId>);

/// Offer records keyed by (offer-id, item-id).
#[derive(Debug, Default)]
pub struct OfferStore {
    records: HashMap<OfferKey, OfferRecord>,
}

impl OfferStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn contains(&self, key: &OfferKey) -> bool {
        self.records.contains_key(key)
    }

    /// Look up a record without consuming it (pre-settlement validation).
    #[must_use]
    pub fn get(&self, key: &OfferKey) -> Option<&OfferRecord> {
        self.records.get(key)
    }

    /// Sum of all locked balances, for conservation audits.
    #[must_use]
    pub fn balance_value(&self) -> u128 {
        self.records
            .values()
            .map(|r| u128::from(r.balance_value()))
            .sum()
    }

    /// Insert a record under its own key.
    ///
    /// # Errors
    /// `DuplicateOffer` if the key is already present. Unreachable through
    /// the public protocol (offer ids are freshly minted); a hit means a
    /// caller bypassed it.
    pub fn insert(&mut self, record: OfferRecord) -> Result<()> {
        let key = (record.id(), record.item_id());
        if self.records.contains_key(&key) {
            return Err(OpenkioskError::DuplicateOffer(record.id()));
        }
        self.records.insert(key, record);
        Ok(())
    }

    /// Remove a record, destructively and non-idempotently.
    ///
    /// # Errors
    /// `OfferNotFound` if the key is absent — already accepted, revoked, or
    /// declined by an earlier transaction.
    pub fn remove_once(&mut self, key: &OfferKey) -> Result<OfferRecord> {
        self.records
            .remove(key)
            .ok_or(OpenkioskError::OfferNotFound(key.0))
    }
}
