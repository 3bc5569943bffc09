//! # TransferReceipt — the two-phase settlement-then-confirm primitive
//!
//! Every custody transfer produces a [`TransferReceipt`] recording which
//! compliance proofs have been attached. The receipt is inert until it is
//! explicitly consumed by `TransferPolicy::confirm`, which checks every
//! registered rule has a matching proof. An unconfirmed receipt cannot be
//! cloned, and the type is `#[must_use]`, so skipping confirmation is loud.
//!
//! ## Why two phases
//!
//! Rule satisfaction is extensible: between initial settlement and final
//! confirmation the receipt may travel through additional rule-specific
//! calls (e.g. a separate royalty payment). The settlement step therefore
//! cannot collapse confirmation into itself.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{ItemId, KioskId};

/// The kinds of transfer rule a policy may register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, serde::Deserialize)]
pub enum RuleKind {
    /// A royalty cut of the sale price must be paid through the policy.
    Royalty,
    /// The sale price must meet the policy's floor.
    FloorPrice,
    /// The item must land locked in the destination kiosk.
    Lock,
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Royalty => write!(f, "ROYALTY"),
            Self::FloorPrice => write!(f, "FLOOR_PRICE"),
            Self::Lock => write!(f, "LOCK"),
        }
    }
}

/// Proof-carrying receipt of a custody transfer.
///
/// Created at the point an item leaves its source kiosk. Rules attach proofs
/// as they are satisfied; `TransferPolicy::confirm` is the only consumer.
///
/// Deliberately not `Clone` and not `Deserialize`: a receipt is minted by
/// settlement code, never reconstructed from bytes. `Serialize` is provided
/// for the audit trail only.
#[must_use]
#[derive(Debug, Serialize)]
pub struct TransferReceipt {
    /// The item that changed custody.
    item_id: ItemId,
    /// The kiosk the item left.
    source: KioskId,
    /// The price paid for the transfer, in the smallest currency unit.
    paid: u64,
    /// Rule proofs attached so far.
    proofs: BTreeSet<RuleKind>,
    /// When the transfer was settled.
    issued_at: DateTime<Utc>,
}

impl TransferReceipt {
    /// Mint a receipt for a transfer of `item_id` out of `source` at `paid`.
    pub fn new(item_id: ItemId, source: KioskId, paid: u64) -> Self {
        Self {
            item_id,
            source,
            paid,
            proofs: BTreeSet::new(),
            issued_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    #[must_use]
    pub fn source(&self) -> KioskId {
        self.source
    }

    #[must_use]
    pub fn paid(&self) -> u64 {
        self.paid
    }

    #[must_use]
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Attach a rule proof. Idempotent per kind.
    pub fn attach_proof(&mut self, rule: RuleKind) {
        self.proofs.insert(rule);
    }

    #[must_use]
    pub fn has_proof(&self, rule: RuleKind) -> bool {
        self.proofs.contains(&rule)
    }

    /// The set of proofs attached so far.
    #[must_use]
    pub fn proofs(&self) -> &BTreeSet<RuleKind> {
        &self.proofs
    }
}
