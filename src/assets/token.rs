//! In-memory fungible token contract

use std::collections::HashMap;
use thiserror::Error;

use crate::types::*;

/// Errors raised by token operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// The sender does not hold enough tokens.
    #[error("insufficient balance: account has {balance}, tried to move {amount}")]
    InsufficientBalance { balance: Amount, amount: Amount },

    /// The spender has not been approved for enough tokens.
    #[error("insufficient allowance: spender may move {allowance}, tried to move {amount}")]
    InsufficientAllowance { allowance: Amount, amount: Amount },

    /// Tokens cannot be sent to or minted for the null address.
    #[error("transfer to the zero address")]
    ZeroAddress,
}

/// A fungible token with balances and spending allowances
///
/// Calls are made on behalf of an explicit sender, standing in for the
/// caller identity a contract would read from its environment.
#[derive(Debug, Clone)]
pub struct StandardToken {
    name: String,
    symbol: String,
    decimals: u8,
    total_supply: Amount,
    balances: HashMap<Address, Amount>,
    /// `(owner, spender) -> remaining allowance`
    allowances: HashMap<(Address, Address), Amount>,
}

impl StandardToken {
    pub fn new(name: String, symbol: String, decimals: u8) -> Self {
        Self {
            name,
            symbol,
            decimals,
            total_supply: Amount::zero(),
            balances: HashMap::new(),
            allowances: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn total_supply(&self) -> &Amount {
        &self.total_supply
    }

    pub fn balance_of(&self, owner: &Address) -> Amount {
        self.balances.get(owner).cloned().unwrap_or_default()
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(&(*owner, *spender))
            .cloned()
            .unwrap_or_default()
    }

    /// Create new supply for `to`
    pub fn mint(&mut self, to: &Address, amount: &Amount) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        self.total_supply += amount;
        *self.balances.entry(*to).or_default() += amount;
        Ok(())
    }

    /// Set how much `spender` may move out of `owner`'s balance
    pub fn approve(&mut self, owner: &Address, spender: &Address, amount: &Amount) {
        self.allowances.insert((*owner, *spender), amount.clone());
    }

    /// Put an account's balance back to an earlier value
    pub(crate) fn restore_balance(&mut self, owner: &Address, amount: Amount) {
        self.balances.insert(*owner, amount);
    }

    /// Move tokens from `from` (the sender) to `to`
    pub fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        amount: &Amount,
    ) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::ZeroAddress);
        }

        let balance = self.balance_of(from);
        let remaining = balance
            .checked_sub(amount)
            .ok_or_else(|| TokenError::InsufficientBalance {
                balance: balance.clone(),
                amount: amount.clone(),
            })?;

        self.balances.insert(*from, remaining);
        *self.balances.entry(*to).or_default() += amount;
        Ok(())
    }

    /// Move tokens from `from` to `to`, spending `spender`'s allowance
    pub fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: &Amount,
    ) -> Result<(), TokenError> {
        let allowance = self.allowance(from, spender);
        let remaining = allowance
            .checked_sub(amount)
            .ok_or_else(|| TokenError::InsufficientAllowance {
                allowance: allowance.clone(),
                amount: amount.clone(),
            })?;

        self.transfer(from, to, amount)?;
        self.allowances.insert((*from, *spender), remaining);
        Ok(())
    }
}
