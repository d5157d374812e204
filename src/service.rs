//! Async front door that serializes calls into a single vault

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::ledger::{LedgerIntegrityReport, Vault};
use crate::traits::*;
use crate::types::*;

/// Ledger operations as seen by concurrent callers
#[async_trait]
pub trait VaultApi: Send + Sync {
    /// Credit native currency attached to the call
    async fn deposit_native(&self, caller: Address, amount: Amount) -> LedgerResult<()>;

    /// Bare currency transfer, credited like a deposit
    async fn receive(&self, caller: Address, amount: Amount) -> LedgerResult<()>;

    /// Withdraw native currency to the caller
    async fn withdraw_native(&self, caller: Address, amount: Amount) -> LedgerResult<()>;

    /// Pull approved tokens into custody and credit the caller
    async fn deposit_token(&self, caller: Address, token: Address, amount: Amount)
        -> LedgerResult<()>;

    /// Release tokens from custody to the caller
    async fn withdraw_token(
        &self,
        caller: Address,
        token: Address,
        amount: Amount,
    ) -> LedgerResult<()>;

    async fn native_balance(&self, owner: Address) -> LedgerResult<Amount>;

    async fn token_balance(&self, owner: Address, token: Address) -> LedgerResult<Amount>;

    async fn tracked_tokens(&self, owner: Address) -> LedgerResult<Vec<Address>>;

    async fn balance_snapshot(
        &self,
        owner: Address,
        tokens: Vec<Address>,
    ) -> LedgerResult<BalanceSnapshot>;

    async fn token_decimals(&self, token: Address) -> LedgerResult<u8>;

    async fn events(&self) -> LedgerResult<Vec<EventRecord>>;
}

struct Host<S: LedgerStorage, X> {
    vault: Vault<S>,
    external: X,
}

/// Owns a vault and its external environment behind an async mutex
///
/// Only one top-level operation runs at a time, whichever task issued it.
/// Clones share the same vault.
pub struct VaultService<S: LedgerStorage, X> {
    inner: Arc<Mutex<Host<S, X>>>,
}

impl<S: LedgerStorage, X> Clone for VaultService<S, X> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, X> VaultService<S, X>
where
    S: LedgerStorage + 'static,
    X: NativeTransport<S> + TokenAssets<S> + Send + 'static,
{
    pub fn new(vault: Vault<S>, external: X) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Host { vault, external })),
        }
    }

    /// Run `f` against the external environment while holding the lock
    pub async fn with_external<R>(&self, f: impl FnOnce(&mut X) -> R) -> R {
        let mut host = self.inner.lock().await;
        f(&mut host.external)
    }

    /// Integrity report including token custody held on the external side
    pub async fn integrity_report(&self) -> LedgerResult<LedgerIntegrityReport> {
        let host = self.inner.lock().await;
        host.vault.validate_integrity_with_assets(&host.external)
    }
}

#[async_trait]
impl<S, X> VaultApi for VaultService<S, X>
where
    S: LedgerStorage + 'static,
    X: NativeTransport<S> + TokenAssets<S> + Send + 'static,
{
    async fn deposit_native(&self, caller: Address, amount: Amount) -> LedgerResult<()> {
        let mut host = self.inner.lock().await;
        host.vault.deposit_native(caller, amount)
    }

    async fn receive(&self, caller: Address, amount: Amount) -> LedgerResult<()> {
        let mut host = self.inner.lock().await;
        host.vault.receive(caller, amount)
    }

    async fn withdraw_native(&self, caller: Address, amount: Amount) -> LedgerResult<()> {
        let mut guard = self.inner.lock().await;
        let Host { vault, external } = &mut *guard;
        vault.withdraw_native(external, caller, amount)
    }

    async fn deposit_token(
        &self,
        caller: Address,
        token: Address,
        amount: Amount,
    ) -> LedgerResult<()> {
        let mut guard = self.inner.lock().await;
        let Host { vault, external } = &mut *guard;
        vault.deposit_token(external, caller, token, amount)
    }

    async fn withdraw_token(
        &self,
        caller: Address,
        token: Address,
        amount: Amount,
    ) -> LedgerResult<()> {
        let mut guard = self.inner.lock().await;
        let Host { vault, external } = &mut *guard;
        vault.withdraw_token(external, caller, token, amount)
    }

    async fn native_balance(&self, owner: Address) -> LedgerResult<Amount> {
        self.inner.lock().await.vault.native_balance(&owner)
    }

    async fn token_balance(&self, owner: Address, token: Address) -> LedgerResult<Amount> {
        self.inner.lock().await.vault.token_balance(&owner, &token)
    }

    async fn tracked_tokens(&self, owner: Address) -> LedgerResult<Vec<Address>> {
        self.inner.lock().await.vault.tracked_tokens(&owner)
    }

    async fn balance_snapshot(
        &self,
        owner: Address,
        tokens: Vec<Address>,
    ) -> LedgerResult<BalanceSnapshot> {
        self.inner
            .lock()
            .await
            .vault
            .balance_snapshot(&owner, &tokens)
    }

    async fn token_decimals(&self, token: Address) -> LedgerResult<u8> {
        let host = self.inner.lock().await;
        host.vault.token_decimals(&host.external, &token)
    }

    async fn events(&self) -> LedgerResult<Vec<EventRecord>> {
        Ok(self.inner.lock().await.vault.events().to_vec())
    }
}
