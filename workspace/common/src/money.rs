use rust_decimal::{Decimal, RoundingStrategy};

/// Number of fractional digits stored for monetary amounts.
pub const MONEY_SCALE: u32 = 2;

/// Rounds an amount to the stored monetary precision (half away from zero).
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// `part` as a percentage of `whole`, rounded to two places.
///
/// Returns zero when `whole` is zero or the division overflows.
pub fn percentage(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    part.checked_div(whole)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map(round_money)
        .unwrap_or(Decimal::ZERO)
}
