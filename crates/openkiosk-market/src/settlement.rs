//! Cross-cutting settlement split logic.
//!
//! Every settlement moves value with explicit take-N splits on a funded
//! balance: the market fee goes straight into the treasury, the price and
//! royalty portions are carved out for the seller and the policy's payment
//! sink. Underflow on any split aborts — the coin primitive cannot wrap.
//!
//! Fees are **never** re-derived here: the [`FeeBreakdown`] passed in was
//! fixed when the record was created or last updated, so a fee-schedule
//! change cannot alter an already-open record's economics.

use openkiosk_types::{Coin, FeeBreakdown, Result};

use crate::treasury::Treasury;

/// The seller and royalty portions carved out of a funded balance.
#[must_use]
#[derive(Debug)]
pub struct SettlementSplit {
    /// The price portion, owed to the seller/acceptor.
    pub seller: Coin,
    /// The royalty portion, owed through the transfer policy. Zero when no
    /// royalty fee was fixed into the record.
    pub royalty: Coin,
}

/// Split `balance` into treasury fee, seller payment, and royalty portion.
///
/// On success exactly `fees.total()` has left `balance`; whatever remains is
/// the funding excess ("remaining"), which the caller must route back to the
/// appropriate party — by the funding invariant it is zero for exact
/// payments, but nonzero remainders are refunded, never dropped.
///
/// # Errors
/// `BalanceUnderflow` if `balance` does not cover the breakdown. Unreachable
/// for records created through the public protocol, which verify funding at
/// creation time.
pub fn split_proceeds(
    balance: &mut Coin,
    fees: &FeeBreakdown,
    treasury: &mut Treasury,
) -> Result<SettlementSplit> {
    let market_cut = balance.split(fees.market_fee)?;
    treasury.credit(market_cut)?;
    let seller = balance.split(fees.price)?;
    let royalty = balance.split(fees.royalty_fee)?;
    Ok(SettlementSplit { seller, royalty })
}
