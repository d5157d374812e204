//! Token contracts addressed by token id

use std::collections::HashMap;

use crate::assets::StandardToken;
use crate::ledger::Vault;
use crate::traits::*;
use crate::types::*;

/// Token state replaced by a transfer, kept until the transfer is final
#[derive(Debug, Clone)]
enum TokenWrite {
    Balance {
        token: Address,
        owner: Address,
        previous: Amount,
    },
    Allowance {
        token: Address,
        owner: Address,
        spender: Address,
        previous: Amount,
    },
}

/// A set of deployed [`StandardToken`]s the vault can call into
///
/// Transfers made through [`TokenAssets`] are journaled so a failed vault
/// operation can take them back.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    tokens: HashMap<Address, StandardToken>,
    journal: Vec<TokenWrite>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploy `token` at `address`
    pub fn register(&mut self, address: Address, token: StandardToken) -> LedgerResult<()> {
        if address.is_zero() {
            return Err(LedgerError::InvalidAsset);
        }
        if self.tokens.contains_key(&address) {
            return Err(LedgerError::Validation(format!(
                "A token is already registered at {}",
                address
            )));
        }
        tracing::debug!(%address, symbol = token.symbol(), "token registered");
        self.tokens.insert(address, token);
        Ok(())
    }

    pub fn get(&self, address: &Address) -> Option<&StandardToken> {
        self.tokens.get(address)
    }

    pub fn get_mut(&mut self, address: &Address) -> Option<&mut StandardToken> {
        self.tokens.get_mut(address)
    }

    fn contract(&self, address: &Address) -> LedgerResult<&StandardToken> {
        self.tokens
            .get(address)
            .ok_or_else(|| LedgerError::ExternalCall(format!("No token contract at {}", address)))
    }

    fn contract_mut(&mut self, address: &Address) -> LedgerResult<&mut StandardToken> {
        self.tokens
            .get_mut(address)
            .ok_or_else(|| LedgerError::ExternalCall(format!("No token contract at {}", address)))
    }
}

impl ExternalState for TokenRegistry {
    fn checkpoint(&mut self) -> usize {
        self.journal.len()
    }

    fn revert_to(&mut self, checkpoint: usize) {
        let undone = self.journal.split_off(checkpoint.min(self.journal.len()));
        for write in undone.into_iter().rev() {
            match write {
                TokenWrite::Balance {
                    token,
                    owner,
                    previous,
                } => {
                    if let Some(contract) = self.tokens.get_mut(&token) {
                        contract.restore_balance(&owner, previous);
                    }
                }
                TokenWrite::Allowance {
                    token,
                    owner,
                    spender,
                    previous,
                } => {
                    if let Some(contract) = self.tokens.get_mut(&token) {
                        contract.approve(&owner, &spender, &previous);
                    }
                }
            }
        }
    }

    fn commit(&mut self) {
        self.journal.clear();
    }
}

impl<S: LedgerStorage> TokenAssets<S> for TokenRegistry {
    fn transfer_from(
        &mut self,
        vault: &mut Vault<S>,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: &Amount,
    ) -> LedgerResult<bool> {
        let spender = vault.address();
        let contract = self.contract_mut(token)?;
        let replaced = [
            TokenWrite::Allowance {
                token: *token,
                owner: *from,
                spender,
                previous: contract.allowance(from, &spender),
            },
            TokenWrite::Balance {
                token: *token,
                owner: *from,
                previous: contract.balance_of(from),
            },
            TokenWrite::Balance {
                token: *token,
                owner: *to,
                previous: contract.balance_of(to),
            },
        ];
        contract
            .transfer_from(&spender, from, to, amount)
            .map_err(|e| LedgerError::TransferFailed(e.to_string()))?;
        self.journal.extend(replaced);
        Ok(true)
    }

    fn transfer(
        &mut self,
        vault: &mut Vault<S>,
        token: &Address,
        to: &Address,
        amount: &Amount,
    ) -> LedgerResult<bool> {
        let sender = vault.address();
        let contract = self.contract_mut(token)?;
        let replaced = [
            TokenWrite::Balance {
                token: *token,
                owner: sender,
                previous: contract.balance_of(&sender),
            },
            TokenWrite::Balance {
                token: *token,
                owner: *to,
                previous: contract.balance_of(to),
            },
        ];
        contract
            .transfer(&sender, to, amount)
            .map_err(|e| LedgerError::TransferFailed(e.to_string()))?;
        self.journal.extend(replaced);
        Ok(true)
    }

    fn balance_of(&self, token: &Address, owner: &Address) -> LedgerResult<Amount> {
        Ok(self.contract(token)?.balance_of(owner))
    }

    fn decimals(&self, token: &Address) -> LedgerResult<u8> {
        Ok(self.contract(token)?.decimals())
    }
}
