//! Pending payout ledger.
//!
//! Settlement sometimes owes value to a party who is not the caller: a
//! declined offer refunds the original offerer, and finalization pays any
//! escrow remainder back to the offer owner. Those credits land here and are
//! claimed by the owed address.

use std::collections::HashMap;

use serde::Serialize;

use openkiosk_types::{Address, Coin, OpenkioskError, Result};

/// Address-keyed credit ledger.
#[derive(Debug, Default, Serialize)]
pub struct Payouts {
    credits: HashMap<Address, Coin>,
}

impl Payouts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `address` with `coin`. Zero coins are absorbed silently.
    ///
    /// # Errors
    /// `BalanceOverflow` if the address's credit would exceed `u64::MAX`.
    pub fn credit(&mut self, address: Address, coin: Coin) -> Result<()> {
        if coin.is_zero() {
            // Nothing owed; avoid creating an empty entry.
            return coin.destroy_zero();
        }
        self.credits
            .entry(address)
            .or_insert_with(Coin::zero)
            .join(coin)
    }

    /// Pending credit for `address`.
    #[must_use]
    pub fn value(&self, address: Address) -> u64 {
        self.credits.get(&address).map_or(0, Coin::value)
    }

    /// Sum of all pending credits (for conservation audits).
    #[must_use]
    pub fn total_value(&self) -> u128 {
        self.credits.values().map(|c| u128::from(c.value())).sum()
    }

    /// Claim the full pending credit for `address`.
    ///
    /// # Errors
    /// `NothingToClaim` when no credit is pending.
    pub fn claim(&mut self, address: Address) -> Result<Coin> {
        self.credits
            .remove(&address)
            .ok_or(OpenkioskError::NothingToClaim(address))
    }
}
