//! Money arithmetic helpers.
//!
//! All persisted amounts carry exactly two fractional digits. Rounding is
//! round-half-up (`MidpointAwayFromZero`), matching how prices and totals
//! are stored. Conversion to integer minor units (cents) truncates any
//! sub-cent residue; a two-digit amount converts exactly.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Number of fractional digits in every stored amount.
pub const MONEY_SCALE: u32 = 2;

/// Round an amount to two decimal places, half-up.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert a two-decimal amount to integer minor units (e.g. cents).
///
/// Truncates toward zero, so `19.999` becomes `1999`. Returns `None` only
/// when the amount does not fit in an `i64`, which no realistic order
/// total reaches.
#[must_use]
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    (amount * Decimal::ONE_HUNDRED).trunc().to_i64()
}
