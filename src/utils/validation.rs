//! Validation utilities

use crate::traits::*;
use crate::types::*;

/// Validate that an amount is positive
pub fn validate_positive_amount(amount: &Amount) -> LedgerResult<()> {
    if amount.is_zero() {
        Err(LedgerError::InvalidAmount)
    } else {
        Ok(())
    }
}

/// Validate that a token identifier is not the null address
pub fn validate_asset_id(token: &Address) -> LedgerResult<()> {
    if token.is_zero() {
        Err(LedgerError::InvalidAsset)
    } else {
        Ok(())
    }
}

/// Validator that additionally caps the size of any single movement
pub struct CappedOperationValidator {
    max_amount: Amount,
}

impl CappedOperationValidator {
    pub fn new(max_amount: Amount) -> Self {
        Self { max_amount }
    }
}

impl OperationValidator for CappedOperationValidator {
    fn validate_amount(&self, amount: &Amount) -> LedgerResult<()> {
        validate_positive_amount(amount)?;

        if *amount > self.max_amount {
            return Err(LedgerError::InvalidAmount);
        }

        Ok(())
    }

    fn validate_asset(&self, token: &Address) -> LedgerResult<()> {
        validate_asset_id(token)
    }
}
