//! # Coin — the linear value primitive
//!
//! A [`Coin`] is a u64-denominated balance in the smallest currency unit.
//! It is deliberately **not** `Clone` or `Copy`: value moves, it is never
//! duplicated. The only ways value changes hands are:
//!
//! - [`Coin::split`] — carve an exact amount off; underflow aborts, never wraps
//! - [`Coin::join`] — absorb another coin; overflow aborts, never wraps
//! - [`Coin::destroy_zero`] — dispose of an empty coin; a non-zero coin
//!   refuses destruction so value cannot be silently dropped
//!
//! Escrow records own their locked balance by exclusive composition: the
//! record *is* the coin's owner until it is destructured.

use serde::{Deserialize, Serialize};

use crate::{OpenkioskError, Result};

/// A quantity of currency in the smallest unit. Linear: move-only.
#[must_use]
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    value: u64,
}

impl Coin {
    /// Mint a coin of the given value.
    ///
    /// This is the faucet/bridge entry point. Inside the settlement core,
    /// coins are only ever produced by splitting existing ones.
    pub fn new(value: u64) -> Self {
        Self { value }
    }

    /// A coin with no value.
    pub fn zero() -> Self {
        Self { value: 0 }
    }

    /// Current value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.value
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    /// Take exactly `amount` out of this coin.
    ///
    /// # Errors
    /// Returns [`OpenkioskError::BalanceUnderflow`] if `amount` exceeds the
    /// value present. The coin is unchanged on error.
    pub fn split(&mut self, amount: u64) -> Result<Coin> {
        if amount > self.value {
            return Err(OpenkioskError::BalanceUnderflow {
                requested: amount,
                available: self.value,
            });
        }
        self.value -= amount;
        Ok(Coin { value: amount })
    }

    /// Absorb `other` into this coin.
    ///
    /// # Errors
    /// Returns [`OpenkioskError::BalanceOverflow`] if the sum would exceed
    /// `u64::MAX`. The coin is unchanged on error.
    pub fn join(&mut self, other: Coin) -> Result<()> {
        let joined =
            self.value
                .checked_add(other.value)
                .ok_or(OpenkioskError::BalanceOverflow {
                    base: self.value,
                    added: other.value,
                })?;
        self.value = joined;
        Ok(())
    }

    /// Empty this coin, returning its full value as a new coin.
    pub fn withdraw_all(&mut self) -> Coin {
        let value = self.value;
        self.value = 0;
        Coin { value }
    }

    /// Destroy an empty coin.
    ///
    /// # Errors
    /// Returns [`OpenkioskError::NonZeroBalance`] if the coin still carries
    /// value — value must be explicitly routed somewhere, never dropped.
    pub fn destroy_zero(self) -> Result<()> {
        if self.value != 0 {
            return Err(OpenkioskError::NonZeroBalance { value: self.value });
        }
        Ok(())
    }
}
