//! Marketplace fee schedule: one base rate plus per-address overrides.
//!
//! Lookup is pure: the override wins when present, else the base rate. No
//! history is retained; an update replaces the prior value. Settlement never
//! consults the schedule — fees are fixed into each record at creation time.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use openkiosk_types::{Address, OpenkioskError, Result, constants, fee_amount};

/// Base fee rate plus per-address override table, in basis points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeSchedule {
    base_bps: u16,
    personal_bps: HashMap<Address, u16>,
}

impl FeeSchedule {
    #[must_use]
    pub fn new(base_bps: u16) -> Self {
        Self {
            base_bps,
            personal_bps: HashMap::new(),
        }
    }

    /// The rate applied to `address`: personal override, else base.
    #[must_use]
    pub fn fee_bps(&self, address: Address) -> u16 {
        self.personal_bps
            .get(&address)
            .copied()
            .unwrap_or(self.base_bps)
    }

    /// The marketplace fee owed by `address` on a sale at `price`.
    #[must_use]
    pub fn market_fee(&self, address: Address, price: u64) -> u64 {
        fee_amount(price, self.fee_bps(address))
    }

    /// Replace the base rate.
    ///
    /// # Errors
    /// `InvalidFeeRate` above 100%.
    pub fn set_base_fee(&mut self, rate_bps: u16) -> Result<()> {
        Self::validate_rate(rate_bps)?;
        self.base_bps = rate_bps;
        Ok(())
    }

    /// Upsert a per-address override. Idempotent.
    pub fn set_personal_fee(&mut self, address: Address, rate_bps: u16) -> Result<()> {
        Self::validate_rate(rate_bps)?;
        self.personal_bps.insert(address, rate_bps);
        Ok(())
    }

    fn validate_rate(rate_bps: u16) -> Result<()> {
        if rate_bps > constants::MAX_FEE_BPS {
            return Err(OpenkioskError::InvalidFeeRate { rate_bps });
        }
        Ok(())
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::new(constants::DEFAULT_BASE_FEE_BPS)
    }
}
