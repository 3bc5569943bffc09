//! The shared marketplace fee pool.
//!
//! Monotonically increased by settlement fee splits and admin top-ups,
//! decreased only by admin withdrawal (gated by `MarketCap` at the
//! marketplace surface).

use serde::Serialize;

use openkiosk_types::{Coin, OpenkioskError, Result};

/// Single shared fee balance.
#[derive(Debug, Serialize)]
pub struct Treasury {
    balance: Coin,
}

impl Treasury {
    #[must_use]
    pub fn new() -> Self {
        Self {
            balance: Coin::zero(),
        }
    }

    #[must_use]
    pub fn value(&self) -> u64 {
        self.balance.value()
    }

    /// Absorb a fee split or an admin top-up.
    ///
    /// # Errors
    /// `BalanceOverflow` if the pool would exceed `u64::MAX`.
    pub fn credit(&mut self, coin: Coin) -> Result<()> {
        self.balance.join(coin)
    }

    /// Withdraw `amount`, or the full balance when `None`.
    ///
    /// # Errors
    /// `TreasuryUnderflow` if `amount` exceeds the balance.
    pub fn withdraw(&mut self, amount: Option<u64>) -> Result<Coin> {
        match amount {
            Some(requested) => {
                self.balance
                    .split(requested)
                    .map_err(|_| OpenkioskError::TreasuryUnderflow {
                        requested,
                        available: self.balance.value(),
                    })
            }
            None => Ok(self.balance.withdraw_all()),
        }
    }
}

impl Default for Treasury {
    fn default() -> Self {
        Self::new()
    }
}
