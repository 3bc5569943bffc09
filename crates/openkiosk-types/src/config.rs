//! Configuration types for an OpenKiosk marketplace instance.

use serde::{Deserialize, Serialize};

use crate::{Address, constants};

/// Configuration for a single marketplace instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketplaceConfig {
    /// Base marketplace fee in basis points (10000 = 100%).
    pub base_fee_bps: u16,
    /// The admin address recorded for audit. Admin actions are gated by the
    /// `MarketCap` capability, not by address comparison.
    pub admin: Address,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            base_fee_bps: constants::DEFAULT_BASE_FEE_BPS,
            admin: Address::zero(),
        }
    }
}
