//! Fund-split calculator
//!
//! Computes the treasury fee and seller proceeds for a sale using integer
//! basis-point arithmetic. Every step is overflow-checked; a failure aborts
//! the enclosing operation with no state mutation.

use crate::error::{Error, Result};
use crate::types::FEE_DENOMINATOR;

/// Result of splitting a sale price
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleSplit {
    /// Amount to the treasury: floor(price * fee_bps / 10_000)
    pub fee: u64,

    /// Amount to the seller: price - fee
    pub seller_amount: u64,
}

/// Split `price` into treasury fee and seller proceeds
///
/// `fee <= price` always holds since fee_bps <= 1000 < 10_000; the checked
/// subtraction is kept anyway so the split can never go negative under a
/// future widening of the fee range.
pub fn compute_sale_split(price: u64, fee_basis_points: u16) -> Result<SaleSplit> {
    let fee = price
        .checked_mul(u64::from(fee_basis_points))
        .ok_or(Error::ArithmeticOverflow)?
        / FEE_DENOMINATOR;

    let seller_amount = price.checked_sub(fee).ok_or(Error::ArithmeticOverflow)?;

    Ok(SaleSplit { fee, seller_amount })
}

/// Overflow-checked addition for aggregate counters (`total_volume`, etc.)
pub fn checked_accumulate(current: u64, delta: u64) -> Result<u64> {
    current.checked_add(delta).ok_or(Error::ArithmeticOverflow)
}
