//! Conversion between base-unit amounts and decimal display values

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use std::str::FromStr;

use crate::types::*;

/// `amount / 10^decimals` as a decimal value
pub fn format_units(amount: &Amount, decimals: u8) -> BigDecimal {
    BigDecimal::new(
        BigInt::from(amount.as_biguint().clone()),
        i64::from(decimals),
    )
}

/// Parse a decimal string such as `"1.5"` into base units
///
/// Fails if the value is negative or has more fractional digits than
/// `decimals` allows.
pub fn parse_units(text: &str, decimals: u8) -> LedgerResult<Amount> {
    let value = BigDecimal::from_str(text.trim())
        .map_err(|e| LedgerError::Validation(format!("Invalid decimal '{}': {}", text, e)))?;
    let scaled = value * BigDecimal::new(BigInt::from(1), -i64::from(decimals));

    let whole = scaled.with_scale(0);
    if whole != scaled {
        return Err(LedgerError::Validation(format!(
            "'{}' has more than {} decimal places",
            text, decimals
        )));
    }

    let (digits, _) = whole.into_bigint_and_exponent();
    digits.to_biguint().map(Amount::from).ok_or_else(|| {
        LedgerError::Validation(format!("'{}' is negative", text))
    })
}
