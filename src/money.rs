//! Currency rounding helpers.
//!
//! All monetary values in the ledger are `rust_decimal::Decimal` quantized to
//! two decimal places with half-up rounding. Every arithmetic result that is
//! stored or returned to a client goes through [`cents`] so balances stay on
//! the cent grid regardless of input precision.

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places for currency values.
pub const CURRENCY_DP: u32 = 2;

/// Quantize a decimal to cent precision using financial (half-up) rounding.
pub fn cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CURRENCY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Zero at cent precision.
pub fn zero() -> Decimal {
    cents(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_cents_rounds_half_up() {
        assert_eq!(cents(dec!(2.345)), dec!(2.35));
        assert_eq!(cents(dec!(2.344)), dec!(2.34));
        assert_eq!(cents(dec!(4.5)), dec!(4.50));
    }

    #[test]
    fn test_cents_is_idempotent() {
        let v = cents(dec!(1.10));
        assert_eq!(cents(v), v);
    }
}
