//! Fixed-point credit arithmetic.
//!
//! Credit quantities and prices are decimals with two fractional digits.
//! Every mutation rounds its result back to two places so repeated partial
//! fills never accumulate drift.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::{CarbonexError, Result, constants};

/// Round a credit quantity or price to the ledger precision.
#[must_use]
pub fn round_credits(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(constants::CREDIT_PRECISION, RoundingStrategy::MidpointAwayFromZero)
}

/// `a + b`, rounded.
///
/// # Errors
/// Returns [`CarbonexError::InvalidAmount`] if the sum does not fit.
pub fn add(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_add(b)
        .map(round_credits)
        .ok_or_else(|| CarbonexError::InvalidAmount {
            field: "amount",
            reason: format!("{a} + {b} overflows"),
        })
}

/// `a - b`, rounded.
#[must_use]
pub fn sub(a: Decimal, b: Decimal) -> Decimal {
    round_credits(a - b)
}

/// Validate a caller-supplied credit amount and normalize it to ledger precision.
///
/// # Errors
/// Returns [`CarbonexError::InvalidAmount`] if the amount is not strictly
/// positive after rounding.
pub fn validate_amount(field: &'static str, amount: Decimal) -> Result<Decimal> {
    let rounded = round_credits(amount);
    if rounded <= Decimal::ZERO {
        return Err(CarbonexError::InvalidAmount {
            field,
            reason: format!("{amount} must be a positive number"),
        });
    }
    Ok(rounded)
}

/// Validate a price per credit.
///
/// # Errors
/// Returns [`CarbonexError::InvalidPrice`] if the price is not strictly positive.
pub fn validate_price(price: Decimal) -> Result<Decimal> {
    let rounded = round_credits(price);
    if rounded <= Decimal::ZERO {
        return Err(CarbonexError::InvalidPrice(price));
    }
    Ok(rounded)
}

/// Price of `amount` credits in minor currency units (cents).
///
/// # Errors
/// Returns [`CarbonexError::InvalidAmount`] if the total overflows.
pub fn total_cents(amount: Decimal, price_per_credit: Decimal) -> Result<i64> {
    use rust_decimal::prelude::ToPrimitive;

    amount
        .checked_mul(price_per_credit)
        .and_then(|total| total.checked_mul(Decimal::ONE_HUNDRED))
        .map(|cents| cents.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|cents| cents.to_i64())
        .ok_or_else(|| CarbonexError::InvalidAmount {
            field: "amount",
            reason: format!("{amount} x {price_per_credit} overflows"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_two_places() {
        assert_eq!(round_credits(Decimal::new(10005, 3)), Decimal::new(1001, 2));
        assert_eq!(round_credits(Decimal::new(10004, 3)), Decimal::new(1000, 2));
    }

    #[test]
    fn repeated_partial_fills_do_not_drift() {
        let mut remaining = Decimal::new(100, 0);
        for _ in 0..300 {
            remaining = sub(remaining, Decimal::new(33, 2));
        }
        assert_eq!(remaining, Decimal::ONE);
    }

    #[test]
    fn add_reports_overflow() {
        assert_eq!(add(Decimal::new(150, 2), Decimal::new(25, 2)).unwrap(), Decimal::new(175, 2));
        let err = add(Decimal::MAX, Decimal::ONE).unwrap_err();
        assert!(matches!(err, CarbonexError::InvalidAmount { field: "amount", .. }));
    }

    #[test]
    fn validate_amount_rejects_non_positive() {
        assert!(validate_amount("amount", Decimal::ZERO).is_err());
        assert!(validate_amount("amount", Decimal::new(-5, 0)).is_err());
        // Rounds to zero at ledger precision.
        assert!(validate_amount("amount", Decimal::new(4, 3)).is_err());
        assert_eq!(
            validate_amount("amount", Decimal::new(40, 0)).unwrap(),
            Decimal::new(40, 0)
        );
    }

    #[test]
    fn validate_price_rejects_zero() {
        let err = validate_price(Decimal::ZERO).unwrap_err();
        assert!(matches!(err, CarbonexError::InvalidPrice(_)));
        assert_eq!(validate_price(Decimal::new(5, 0)).unwrap(), Decimal::new(5, 0));
    }

    #[test]
    fn total_cents_multiplies_price() {
        // 15 credits at 5.00 = 75.00 = 7500 cents
        assert_eq!(total_cents(Decimal::new(15, 0), Decimal::new(500, 2)).unwrap(), 7500);
        // 0.5 credits at 3.33 = 1.665 -> 167 cents
        assert_eq!(total_cents(Decimal::new(5, 1), Decimal::new(333, 2)).unwrap(), 167);
    }
}
