//! Conversion between decimal currency amounts and integer minor units.
//!
//! Everything stored locally or sent to the payment gateway is an `i64` amount
//! of minor units (cents). Decimals only exist at the request/response boundary.

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use thiserror::Error;

/// Number of fractional digits carried by the supported currencies.
const MINOR_UNIT_SCALE: u32 = 2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("amount must not be negative, got {0}")]
    Negative(Decimal),
    #[error("amount {0} is too large")]
    Overflow(Decimal),
}

/// Converts a decimal amount into minor units, rounding half away from zero.
pub fn to_minor_units(amount: Decimal) -> Result<i64, MoneyError> {
    let rounded =
        amount.round_dp_with_strategy(MINOR_UNIT_SCALE, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        return Err(MoneyError::Negative(amount));
    }

    rounded
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|minor| minor.trunc().to_i64())
        .ok_or(MoneyError::Overflow(amount))
}

/// Renders minor units as a decimal with two fractional digits.
pub fn to_decimal(minor_units: i64) -> Decimal {
    Decimal::new(minor_units, MINOR_UNIT_SCALE)
}
