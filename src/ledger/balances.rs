//! Balance bookkeeping over a storage backend

use crate::traits::*;
use crate::types::*;

/// A write recorded so it can be undone
#[derive(Debug, Clone)]
enum LedgerWrite {
    Native {
        owner: Address,
        previous: Amount,
    },
    Token {
        owner: Address,
        token: Address,
        previous: Amount,
    },
    Tracked {
        owner: Address,
        token: Address,
    },
}

/// Owns the storage backend and applies the ledger's effect functions
///
/// Every mutation here is a plain state change with no external calls;
/// ordering against external calls is the caller's concern.
///
/// Each write is journaled with the value it replaced. A failed operation
/// is undone by replaying its part of the journal backwards, so the cost of
/// a rollback is proportional to what the operation touched.
pub struct BalanceBook<S: LedgerStorage> {
    storage: S,
    journal: Vec<LedgerWrite>,
}

impl<S: LedgerStorage> BalanceBook<S> {
    /// Create a new balance book
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            journal: Vec::new(),
        }
    }

    /// Position in the undo journal
    pub fn checkpoint(&self) -> usize {
        self.journal.len()
    }

    /// Undo every write made since `checkpoint`, newest first
    pub fn revert_to(&mut self, checkpoint: usize) -> LedgerResult<()> {
        let undone = self.journal.split_off(checkpoint.min(self.journal.len()));
        for write in undone.into_iter().rev() {
            match write {
                LedgerWrite::Native { owner, previous } => {
                    self.storage.set_native_balance(&owner, previous)?
                }
                LedgerWrite::Token {
                    owner,
                    token,
                    previous,
                } => self.storage.set_token_balance(&owner, &token, previous)?,
                LedgerWrite::Tracked { owner, token } => {
                    self.storage.untrack_token(&owner, &token)?
                }
            }
        }
        Ok(())
    }

    /// Forget the undo journal
    pub fn commit(&mut self) {
        self.journal.clear();
    }

    fn write_native(
        &mut self,
        owner: &Address,
        previous: Amount,
        balance: Amount,
    ) -> LedgerResult<()> {
        self.storage.set_native_balance(owner, balance)?;
        self.journal.push(LedgerWrite::Native {
            owner: *owner,
            previous,
        });
        Ok(())
    }

    fn write_token(
        &mut self,
        owner: &Address,
        token: &Address,
        previous: Amount,
        balance: Amount,
    ) -> LedgerResult<()> {
        self.storage.set_token_balance(owner, token, balance)?;
        self.journal.push(LedgerWrite::Token {
            owner: *owner,
            token: *token,
            previous,
        });
        Ok(())
    }

    /// Native balance of an owner (zero when never referenced)
    pub fn native_balance(&self, owner: &Address) -> LedgerResult<Amount> {
        self.storage.native_balance(owner)
    }

    /// Token balance of an owner (zero when never referenced)
    pub fn token_balance(&self, owner: &Address, token: &Address) -> LedgerResult<Amount> {
        self.storage.token_balance(owner, token)
    }

    /// Tokens the owner has ever deposited, in first-deposit order
    pub fn tracked_tokens(&self, owner: &Address) -> LedgerResult<Vec<Address>> {
        self.storage.tracked_tokens(owner)
    }

    /// Add to an owner's native balance, returning the new balance
    pub fn credit_native(&mut self, owner: &Address, amount: &Amount) -> LedgerResult<Amount> {
        let previous = self.storage.native_balance(owner)?;
        let balance = &previous + amount;
        self.write_native(owner, previous, balance.clone())?;
        Ok(balance)
    }

    /// Subtract from an owner's native balance, returning the new balance
    pub fn debit_native(&mut self, owner: &Address, amount: &Amount) -> LedgerResult<Amount> {
        let available = self.storage.native_balance(owner)?;
        let balance = available
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::InsufficientBalance {
                available: available.clone(),
                requested: amount.clone(),
            })?;
        self.write_native(owner, available, balance.clone())?;
        Ok(balance)
    }

    /// Add to an owner's token balance, returning the new balance
    pub fn credit_token(
        &mut self,
        owner: &Address,
        token: &Address,
        amount: &Amount,
    ) -> LedgerResult<Amount> {
        let previous = self.storage.token_balance(owner, token)?;
        let balance = &previous + amount;
        self.write_token(owner, token, previous, balance.clone())?;
        Ok(balance)
    }

    /// Subtract from an owner's token balance, returning the new balance
    pub fn debit_token(
        &mut self,
        owner: &Address,
        token: &Address,
        amount: &Amount,
    ) -> LedgerResult<Amount> {
        let available = self.storage.token_balance(owner, token)?;
        let balance = available
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::InsufficientBalance {
                available: available.clone(),
                requested: amount.clone(),
            })?;
        self.write_token(owner, token, available, balance.clone())?;
        Ok(balance)
    }

    /// Record `token` in the owner's tracked list unless already present.
    /// Returns whether the token was newly tracked.
    pub fn ensure_tracked(&mut self, owner: &Address, token: &Address) -> LedgerResult<bool> {
        if self.storage.is_tracked(owner, token)? {
            return Ok(false);
        }
        self.storage.track_token(owner, token)?;
        self.journal.push(LedgerWrite::Tracked {
            owner: *owner,
            token: *token,
        });
        Ok(true)
    }

    /// Sum of every owner's native balance
    pub fn total_native(&self) -> LedgerResult<Amount> {
        let mut total = Amount::zero();
        for owner in self.storage.owners()? {
            total += &self.storage.native_balance(&owner)?;
        }
        Ok(total)
    }

    /// Sum of every owner's balance of `token`
    pub fn total_token(&self, token: &Address) -> LedgerResult<Amount> {
        let mut total = Amount::zero();
        for owner in self.storage.owners()? {
            total += &self.storage.token_balance(&owner, token)?;
        }
        Ok(total)
    }

    /// Problems with the tracked-token index, one message per problem
    pub fn tracking_issues(&self) -> LedgerResult<Vec<String>> {
        let mut issues = Vec::new();

        for owner in self.storage.owners()? {
            let tracked = self.storage.tracked_tokens(&owner)?;
            for (position, token) in tracked.iter().enumerate() {
                if tracked[..position].contains(token) {
                    issues.push(format!(
                        "Token {} appears more than once in the tracked list of {}",
                        token, owner
                    ));
                }
                if !self.storage.is_tracked(&owner, token)? {
                    issues.push(format!(
                        "Token {} is listed for {} but not marked as tracked",
                        token, owner
                    ));
                }
            }
        }

        Ok(issues)
    }

    /// Every token any owner has ever deposited, first-seen order
    pub fn all_tracked_tokens(&self) -> LedgerResult<Vec<Address>> {
        let mut tokens: Vec<Address> = Vec::new();
        for owner in self.storage.owners()? {
            for token in self.storage.tracked_tokens(&owner)? {
                if !tokens.contains(&token) {
                    tokens.push(token);
                }
            }
        }
        Ok(tokens)
    }
}
