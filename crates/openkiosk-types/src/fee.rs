//! Basis-point fee arithmetic.
//!
//! All percentage constants use the 10000 = 100% scale (200 = 2%). Fee
//! application widens to u128 before multiplying so a price near `u64::MAX`
//! cannot overflow, then truncates back with floor division.

use serde::{Deserialize, Serialize};

use crate::constants::BASIS_POINTS;

/// `floor(price * rate_bps / 10000)` with a u128 intermediate.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn fee_amount(price: u64, rate_bps: u16) -> u64 {
    // rate_bps <= 10000, so the result always fits back into u64.
    (u128::from(price) * u128::from(rate_bps) / u128::from(BASIS_POINTS)) as u64
}

/// The fee decomposition fixed at record-creation time.
///
/// Fees are derived from the schedule at the moment of listing/offering and
/// never recomputed at accept/buy time, so a schedule change cannot alter an
/// already-open record's economics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    /// Base price in the smallest currency unit.
    pub price: u64,
    /// Marketplace fee owed to the treasury.
    pub market_fee: u64,
    /// Royalty fee owed through the transfer policy's payment sink.
    pub royalty_fee: u64,
}

impl FeeBreakdown {
    #[must_use]
    pub fn new(price: u64, market_fee: u64, royalty_fee: u64) -> Self {
        Self {
            price,
            market_fee,
            royalty_fee,
        }
    }

    /// All-in total: price + market fee + royalty fee.
    ///
    /// Widened to u128 because the sum can exceed `u64::MAX` when the price
    /// is near the top of the range.
    #[must_use]
    pub fn total(&self) -> u128 {
        u128::from(self.price) + u128::from(self.market_fee) + u128::from(self.royalty_fee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_percent_of_1000() {
        assert_eq!(fee_amount(1000, 200), 20);
    }

    #[test]
    fn truncation_is_floor() {
        // 2% of 999 = 19.98 -> 19
        assert_eq!(fee_amount(999, 200), 19);
        // 0.01% of 5 = 0.000005 -> 0
        assert_eq!(fee_amount(5, 1), 0);
    }

    #[test]
    fn full_rate_is_identity() {
        assert_eq!(fee_amount(123_456, 10_000), 123_456);
    }

    #[test]
    fn zero_rate_is_zero() {
        assert_eq!(fee_amount(u64::MAX, 0), 0);
    }

    #[test]
    fn no_overflow_near_u64_max() {
        // u64::MAX * 200 overflows u64; the wide intermediate must not.
        let fee = fee_amount(u64::MAX, 200);
        assert_eq!(fee, ((u128::from(u64::MAX) * 200) / 10_000) as u64);
    }

    #[test]
    fn breakdown_total_widens() {
        let fees = FeeBreakdown::new(u64::MAX, u64::MAX, u64::MAX);
        assert_eq!(fees.total(), 3 * u128::from(u64::MAX));
    }

    #[test]
    fn breakdown_serde_roundtrip() {
        let fees = FeeBreakdown::new(1000, 20, 50);
        let json = serde_json::to_string(&fees).unwrap();
        let back: FeeBreakdown = serde_json::from_str(&json).unwrap();
        assert_eq!(fees, back);
    }
}
