//! # TransferPolicy — pluggable transfer rules and receipt confirmation
//!
//! One policy governs one collection. Creators register rules through the
//! [`PolicyCap`] minted with the policy:
//!
//! - **Royalty**: a basis-point cut of every sale (with a minimum amount),
//!   paid through [`TransferPolicy::pay_royalty`] into the policy's proceeds
//! - **Floor price**: the paid amount must meet the policy floor
//! - **Lock**: the item must arrive locked in the destination kiosk
//!
//! Settlement attaches one proof per satisfied rule to the
//! [`TransferReceipt`]; [`TransferPolicy::confirm`] is the single consumer
//! of receipts and aborts if any registered rule's proof is missing.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use openkiosk_types::{
    Coin, CollectionId, OpenkioskError, Result, RuleKind, TransferReceipt, constants, fee_amount,
};

use crate::kiosk::Kiosk;

/// Royalty rule parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoyaltyConfig {
    /// Royalty rate in basis points (10000 = 100%).
    pub rate_bps: u16,
    /// Lower bound applied after the rate, so cheap sales still pay.
    pub min_amount: u64,
}

/// Bearer capability for policy administration. Minted once, by
/// [`TransferPolicy::new`].
#[derive(Debug, Serialize)]
pub struct PolicyCap {
    collection: CollectionId,
}

impl PolicyCap {
    #[must_use]
    pub fn collection(&self) -> CollectionId {
        self.collection
    }
}

/// The transfer policy for one collection.
#[derive(Debug, Serialize)]
pub struct TransferPolicy {
    collection: CollectionId,
    rules: BTreeSet<RuleKind>,
    royalty: Option<RoyaltyConfig>,
    floor: Option<u64>,
    /// Royalty payments banked so far.
    proceeds: Coin,
}

impl TransferPolicy {
    /// Create a policy for `collection` and mint its admin capability.
    pub fn new(collection: CollectionId) -> (Self, PolicyCap) {
        let policy = Self {
            collection,
            rules: BTreeSet::new(),
            royalty: None,
            floor: None,
            proceeds: Coin::zero(),
        };
        (policy, PolicyCap { collection })
    }

    #[must_use]
    pub fn collection(&self) -> CollectionId {
        self.collection
    }

    #[must_use]
    pub fn has_rule(&self, rule: RuleKind) -> bool {
        self.rules.contains(&rule)
    }

    #[must_use]
    pub fn proceeds_value(&self) -> u64 {
        self.proceeds.value()
    }

    /// The registered floor price, if a floor rule is active.
    #[must_use]
    pub fn floor(&self) -> Option<u64> {
        self.floor
    }

    fn require_cap(&self, cap: &PolicyCap) -> Result<()> {
        if cap.collection == self.collection {
            Ok(())
        } else {
            Err(OpenkioskError::PolicyCapMismatch {
                bound: cap.collection,
                requested: self.collection,
            })
        }
    }

    /// Register (or replace) the royalty rule.
    ///
    /// # Errors
    /// `PolicyCapMismatch` on a foreign cap, `InvalidFeeRate` above 100%.
    pub fn add_royalty_rule(
        &mut self,
        cap: &PolicyCap,
        rate_bps: u16,
        min_amount: u64,
    ) -> Result<()> {
        self.require_cap(cap)?;
        if rate_bps > constants::MAX_FEE_BPS {
            return Err(OpenkioskError::InvalidFeeRate { rate_bps });
        }
        self.royalty = Some(RoyaltyConfig {
            rate_bps,
            min_amount,
        });
        self.rules.insert(RuleKind::Royalty);
        Ok(())
    }

    /// Register (or replace) the floor-price rule.
    pub fn add_floor_rule(&mut self, cap: &PolicyCap, floor: u64) -> Result<()> {
        self.require_cap(cap)?;
        self.floor = Some(floor);
        self.rules.insert(RuleKind::FloorPrice);
        Ok(())
    }

    /// Register the lock rule: items of this collection must arrive locked.
    pub fn add_lock_rule(&mut self, cap: &PolicyCap) -> Result<()> {
        self.require_cap(cap)?;
        self.rules.insert(RuleKind::Lock);
        Ok(())
    }

    /// The royalty owed on a sale at `price`. Zero when no royalty rule is
    /// registered.
    #[must_use]
    pub fn royalty_fee(&self, price: u64) -> u64 {
        match self.royalty {
            Some(config) => fee_amount(price, config.rate_bps).max(config.min_amount),
            None => 0,
        }
    }

    /// Pay the royalty for `receipt` and attach the royalty proof.
    ///
    /// The entire payment is banked into the policy's proceeds. On error the
    /// enclosing transaction aborts and the host rolls back all staged moves.
    ///
    /// # Errors
    /// `RuleNotRegistered` without a royalty rule, `RoyaltyUnderpaid` if the
    /// payment does not cover the fee owed for the receipt's paid amount.
    pub fn pay_royalty(&mut self, receipt: &mut TransferReceipt, payment: Coin) -> Result<()> {
        if !self.has_rule(RuleKind::Royalty) {
            return Err(OpenkioskError::RuleNotRegistered {
                rule: RuleKind::Royalty,
            });
        }
        let needed = self.royalty_fee(receipt.paid());
        if payment.value() < needed {
            return Err(OpenkioskError::RoyaltyUnderpaid {
                needed,
                paid: payment.value(),
            });
        }
        tracing::debug!(
            collection = %self.collection,
            item = %receipt.item_id(),
            royalty = payment.value(),
            "royalty paid"
        );
        self.proceeds.join(payment)?;
        receipt.attach_proof(RuleKind::Royalty);
        Ok(())
    }

    /// Attach the lock proof: the item must be locked in `destination`.
    ///
    /// # Errors
    /// `RuleNotRegistered` without a lock rule, `ItemNotLocked` otherwise.
    pub fn prove_lock(&self, receipt: &mut TransferReceipt, destination: &Kiosk) -> Result<()> {
        if !self.has_rule(RuleKind::Lock) {
            return Err(OpenkioskError::RuleNotRegistered {
                rule: RuleKind::Lock,
            });
        }
        let item_id = receipt.item_id();
        if !destination.has_item(item_id) || !destination.is_locked(item_id) {
            return Err(OpenkioskError::ItemNotLocked(item_id));
        }
        receipt.attach_proof(RuleKind::Lock);
        Ok(())
    }

    /// Attach the floor-price proof: the receipt's paid amount must meet the
    /// policy floor.
    pub fn prove_floor(&self, receipt: &mut TransferReceipt) -> Result<()> {
        let Some(floor) = self.floor else {
            return Err(OpenkioskError::RuleNotRegistered {
                rule: RuleKind::FloorPrice,
            });
        };
        if receipt.paid() < floor {
            return Err(OpenkioskError::PriceBelowFloor {
                floor,
                paid: receipt.paid(),
            });
        }
        receipt.attach_proof(RuleKind::FloorPrice);
        Ok(())
    }

    /// Confirm a receipt: every registered rule must carry a proof.
    ///
    /// This is the only consumer of [`TransferReceipt`]; without this call
    /// the enclosing transaction must not be considered final.
    ///
    /// # Errors
    /// `RuleNotSatisfied` naming the first registered rule missing a proof.
    pub fn confirm(&self, receipt: TransferReceipt) -> Result<()> {
        for rule in &self.rules {
            if !receipt.has_proof(*rule) {
                return Err(OpenkioskError::RuleNotSatisfied { rule: *rule });
            }
        }
        tracing::debug!(
            collection = %self.collection,
            item = %receipt.item_id(),
            paid = receipt.paid(),
            "transfer confirmed"
        );
        Ok(())
    }

    /// Withdraw royalty proceeds. `None` withdraws the full balance.
    pub fn withdraw_proceeds(&mut self, cap: &PolicyCap, amount: Option<u64>) -> Result<Coin> {
        self.require_cap(cap)?;
        match amount {
            Some(amount) => self.proceeds.split(amount),
            None => Ok(self.proceeds.withdraw_all()),
        }
    }
}
