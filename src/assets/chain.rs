//! A local host environment for running the vault in-process

use std::collections::{HashMap, HashSet};

use crate::assets::TokenRegistry;
use crate::ledger::Vault;
use crate::traits::*;
use crate::types::*;

/// A change the chain can still take back
#[derive(Debug, Clone)]
enum ChainWrite {
    Wallet { address: Address, previous: Amount },
    Tokens { checkpoint: usize },
}

/// Honest host: native pushes land in recipient wallets, token calls go to
/// a [`TokenRegistry`]. Nothing here calls back into the vault.
///
/// The chain owns every balance it moves, so reverting it also reverts the
/// token transfers made through it.
#[derive(Debug, Clone, Default)]
pub struct LocalChain {
    wallets: HashMap<Address, Amount>,
    refusing: HashSet<Address>,
    tokens: TokenRegistry,
    journal: Vec<ChainWrite>,
}

impl LocalChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: TokenRegistry) -> Self {
        Self {
            tokens,
            ..Self::default()
        }
    }

    /// Native currency received by `address` from the vault so far
    pub fn wallet_balance(&self, address: &Address) -> Amount {
        self.wallets.get(address).cloned().unwrap_or_default()
    }

    /// Make pushes to `address` fail, like a recipient whose fallback reverts
    pub fn refuse_payments_to(&mut self, address: Address) {
        self.refusing.insert(address);
    }

    pub fn accept_payments_to(&mut self, address: &Address) {
        self.refusing.remove(address);
    }

    pub fn tokens(&self) -> &TokenRegistry {
        &self.tokens
    }

    pub fn tokens_mut(&mut self) -> &mut TokenRegistry {
        &mut self.tokens
    }
}

impl<S: LedgerStorage> NativeTransport<S> for LocalChain {
    fn send(&mut self, _vault: &mut Vault<S>, to: &Address, amount: &Amount) -> LedgerResult<()> {
        if self.refusing.contains(to) {
            return Err(LedgerError::TransferFailed(format!(
                "Recipient {} rejected the payment",
                to
            )));
        }
        let previous = self.wallet_balance(to);
        self.wallets.insert(*to, &previous + amount);
        self.journal.push(ChainWrite::Wallet {
            address: *to,
            previous,
        });
        Ok(())
    }
}

impl ExternalState for LocalChain {
    fn checkpoint(&mut self) -> usize {
        self.journal.len()
    }

    fn revert_to(&mut self, checkpoint: usize) {
        let undone = self.journal.split_off(checkpoint.min(self.journal.len()));
        for write in undone.into_iter().rev() {
            match write {
                ChainWrite::Wallet { address, previous } => {
                    self.wallets.insert(address, previous);
                }
                ChainWrite::Tokens { checkpoint } => self.tokens.revert_to(checkpoint),
            }
        }
    }

    fn commit(&mut self) {
        self.journal.clear();
        self.tokens.commit();
    }
}

impl<S: LedgerStorage> TokenAssets<S> for LocalChain {
    fn transfer_from(
        &mut self,
        vault: &mut Vault<S>,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: &Amount,
    ) -> LedgerResult<bool> {
        let checkpoint = self.tokens.checkpoint();
        let accepted = self.tokens.transfer_from(vault, token, from, to, amount)?;
        self.journal.push(ChainWrite::Tokens { checkpoint });
        Ok(accepted)
    }

    fn transfer(
        &mut self,
        vault: &mut Vault<S>,
        token: &Address,
        to: &Address,
        amount: &Amount,
    ) -> LedgerResult<bool> {
        let checkpoint = self.tokens.checkpoint();
        let accepted = self.tokens.transfer(vault, token, to, amount)?;
        self.journal.push(ChainWrite::Tokens { checkpoint });
        Ok(accepted)
    }

    fn balance_of(&self, token: &Address, owner: &Address) -> LedgerResult<Amount> {
        TokenAssets::<S>::balance_of(&self.tokens, token, owner)
    }

    fn decimals(&self, token: &Address) -> LedgerResult<u8> {
        TokenAssets::<S>::decimals(&self.tokens, token)
    }
}
