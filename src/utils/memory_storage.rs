//! In-memory storage implementation for testing

use std::collections::{HashMap, HashSet};

use crate::traits::*;
use crate::types::*;

/// In-memory storage implementation for testing and development
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    native_balances: HashMap<Address, Amount>,
    token_balances: HashMap<(Address, Address), Amount>,
    tracked_tokens: HashMap<Address, Vec<Address>>,
    tracked_index: HashSet<(Address, Address)>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all data (useful for testing)
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl LedgerStorage for MemoryStorage {
    fn native_balance(&self, owner: &Address) -> LedgerResult<Amount> {
        Ok(self.native_balances.get(owner).cloned().unwrap_or_default())
    }

    fn set_native_balance(&mut self, owner: &Address, amount: Amount) -> LedgerResult<()> {
        self.native_balances.insert(*owner, amount);
        Ok(())
    }

    fn token_balance(&self, owner: &Address, token: &Address) -> LedgerResult<Amount> {
        Ok(self
            .token_balances
            .get(&(*owner, *token))
            .cloned()
            .unwrap_or_default())
    }

    fn set_token_balance(
        &mut self,
        owner: &Address,
        token: &Address,
        amount: Amount,
    ) -> LedgerResult<()> {
        self.token_balances.insert((*owner, *token), amount);
        Ok(())
    }

    fn is_tracked(&self, owner: &Address, token: &Address) -> LedgerResult<bool> {
        Ok(self.tracked_index.contains(&(*owner, *token)))
    }

    fn track_token(&mut self, owner: &Address, token: &Address) -> LedgerResult<()> {
        if !self.tracked_index.insert((*owner, *token)) {
            return Err(LedgerError::Storage(format!(
                "Token {} is already tracked for {}",
                token, owner
            )));
        }
        self.tracked_tokens.entry(*owner).or_default().push(*token);
        Ok(())
    }

    fn untrack_token(&mut self, owner: &Address, token: &Address) -> LedgerResult<()> {
        match self.tracked_tokens.get_mut(owner) {
            Some(list) if list.last() == Some(token) => {
                list.pop();
                if list.is_empty() {
                    self.tracked_tokens.remove(owner);
                }
                self.tracked_index.remove(&(*owner, *token));
                Ok(())
            }
            _ => Err(LedgerError::Storage(format!(
                "Token {} is not the last token tracked for {}",
                token, owner
            ))),
        }
    }

    fn tracked_tokens(&self, owner: &Address) -> LedgerResult<Vec<Address>> {
        Ok(self.tracked_tokens.get(owner).cloned().unwrap_or_default())
    }

    fn owners(&self) -> LedgerResult<Vec<Address>> {
        let mut owners: Vec<Address> = self
            .native_balances
            .keys()
            .chain(self.token_balances.keys().map(|(owner, _)| owner))
            .chain(self.tracked_tokens.keys())
            .copied()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        owners.sort();
        Ok(owners)
    }
}
