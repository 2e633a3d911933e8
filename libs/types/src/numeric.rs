//! Exact decimal helpers for sizes, prices and notionals
//!
//! Uses rust_decimal for deterministic arithmetic (no floating-point errors).
//! Ledger math is never rounded; `AMOUNT_SCALE` only applies to display.

use rust_decimal::{Decimal, RoundingStrategy};

/// Conventional number of decimal places for amounts shown to customers.
pub const AMOUNT_SCALE: u32 = 2;

/// Returns `value` if it is strictly positive, otherwise the offending field name.
pub fn ensure_positive(field: &'static str, value: Decimal) -> Result<Decimal, String> {
    if value > Decimal::ZERO {
        Ok(value)
    } else {
        Err(format!("{} must be positive, got {}", field, value))
    }
}

/// Order notional `size * price`, `None` on overflow.
pub fn notional(size: Decimal, price: Decimal) -> Option<Decimal> {
    size.checked_mul(price)
}

/// Round an amount half-up to `AMOUNT_SCALE` places for presentation.
pub fn display_amount(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_ensure_positive() {
        assert_eq!(ensure_positive("size", Decimal::ONE), Ok(Decimal::ONE));
        assert!(ensure_positive("size", Decimal::ZERO).is_err());

        let err = ensure_positive("price", Decimal::from(-5)).unwrap_err();
        assert_eq!(err, "price must be positive, got -5");
    }

    #[test]
    fn test_notional_is_exact() {
        let size = Decimal::from_str("0.1").unwrap();
        let price = Decimal::from_str("0.2").unwrap();
        assert_eq!(notional(size, price), Some(Decimal::from_str("0.02").unwrap()));
        assert_eq!(
            notional(Decimal::from(10), Decimal::from(150)),
            Some(Decimal::from(1500))
        );
    }

    #[test]
    fn test_notional_overflow() {
        assert_eq!(notional(Decimal::MAX, Decimal::from(2)), None);
    }

    #[test]
    fn test_display_amount_rounds_half_up() {
        assert_eq!(
            display_amount(Decimal::from_str("10.005").unwrap()),
            Decimal::from_str("10.01").unwrap()
        );
        assert_eq!(
            display_amount(Decimal::from_str("10.004").unwrap()),
            Decimal::from_str("10.00").unwrap()
        );
    }
}
