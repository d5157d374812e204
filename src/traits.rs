//! Traits for storage abstraction and external collaborators

use crate::ledger::Vault;
use crate::types::*;

/// Storage abstraction for the vault ledger
///
/// Conceptually a key-value store keyed by `(owner)` for native balances,
/// `(owner, token)` for token balances and `(owner)` for the ordered list of
/// tokens ever deposited. Absent entries read as zero / empty.
///
/// Backends only store values. Undoing a failed operation is done by the
/// ledger, which writes the previous values back and calls
/// [`LedgerStorage::untrack_token`] for tokens it tracked.
pub trait LedgerStorage: Send {
    /// Native balance of an owner
    fn native_balance(&self, owner: &Address) -> LedgerResult<Amount>;

    /// Overwrite the native balance of an owner
    fn set_native_balance(&mut self, owner: &Address, amount: Amount) -> LedgerResult<()>;

    /// Token balance of an owner
    fn token_balance(&self, owner: &Address, token: &Address) -> LedgerResult<Amount>;

    /// Overwrite the token balance of an owner
    fn set_token_balance(
        &mut self,
        owner: &Address,
        token: &Address,
        amount: Amount,
    ) -> LedgerResult<()>;

    /// Whether `token` is in the owner's tracked list
    fn is_tracked(&self, owner: &Address, token: &Address) -> LedgerResult<bool>;

    /// Append `token` to the owner's tracked list and mark it tracked.
    /// Callers check [`LedgerStorage::is_tracked`] first.
    fn track_token(&mut self, owner: &Address, token: &Address) -> LedgerResult<()>;

    /// Remove `token` from the end of the owner's tracked list.
    /// It must be the token most recently tracked for that owner.
    fn untrack_token(&mut self, owner: &Address, token: &Address) -> LedgerResult<()>;

    /// The owner's tracked tokens in insertion order
    fn tracked_tokens(&self, owner: &Address) -> LedgerResult<Vec<Address>>;

    /// Every owner with any recorded state
    fn owners(&self) -> LedgerResult<Vec<Address>>;
}

/// State held outside the ledger that must unwind with a failed operation
///
/// The vault takes a checkpoint of the collaborator it is handed when an
/// operation starts and reverts the collaborator to it if the operation
/// fails. Implementations must cover every piece of state they can change,
/// including changes made by vault calls they issue from inside a hook.
/// Otherwise a nested call that succeeded would outlive its failed caller.
pub trait ExternalState {
    /// Mark the current state
    fn checkpoint(&mut self) -> usize;

    /// Undo every change made since `checkpoint` was taken
    fn revert_to(&mut self, checkpoint: usize);

    /// Drop undo history once the outermost operation has succeeded
    fn commit(&mut self);
}

impl ExternalState for () {
    fn checkpoint(&mut self) -> usize {
        0
    }

    fn revert_to(&mut self, _checkpoint: usize) {}

    fn commit(&mut self) {}
}

/// The host's mechanism for pushing native currency out of the vault
///
/// `send` receives the vault itself so a recipient may synchronously call
/// back into any ledger operation before returning. Returning `Err` rejects
/// the push.
pub trait NativeTransport<S: LedgerStorage>: ExternalState {
    fn send(&mut self, vault: &mut Vault<S>, to: &Address, amount: &Amount) -> LedgerResult<()>;
}

/// External fungible-token contracts, addressed by token id
///
/// Transfers run with the vault as `msg.sender`: `transfer_from` spends the
/// vault's allowance from `from`, `transfer` moves tokens out of the vault's
/// own holdings. `Ok(false)` and `Err(_)` are both treated as a rejected
/// transfer. The vault is passed in so token hooks can re-enter the ledger.
pub trait TokenAssets<S: LedgerStorage>: ExternalState {
    fn transfer_from(
        &mut self,
        vault: &mut Vault<S>,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: &Amount,
    ) -> LedgerResult<bool>;

    fn transfer(
        &mut self,
        vault: &mut Vault<S>,
        token: &Address,
        to: &Address,
        amount: &Amount,
    ) -> LedgerResult<bool>;

    fn balance_of(&self, token: &Address, owner: &Address) -> LedgerResult<Amount>;

    fn decimals(&self, token: &Address) -> LedgerResult<u8>;
}

/// Trait for implementing custom operation validation rules
pub trait OperationValidator: Send + Sync {
    /// Validate an amount before any state is touched
    fn validate_amount(&self, amount: &Amount) -> LedgerResult<()>;

    /// Validate a token identifier
    fn validate_asset(&self, token: &Address) -> LedgerResult<()>;
}

/// Default validator: non-zero amounts, non-null assets
pub struct DefaultOperationValidator;

impl OperationValidator for DefaultOperationValidator {
    fn validate_amount(&self, amount: &Amount) -> LedgerResult<()> {
        crate::utils::validate_positive_amount(amount)
    }

    fn validate_asset(&self, token: &Address) -> LedgerResult<()> {
        crate::utils::validate_asset_id(token)
    }
}
