//! The vault ledger: deposit/withdraw operations for native currency and tokens

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::VaultConfig;
use crate::ledger::{BalanceBook, EventLog};
use crate::traits::*;
use crate::types::*;

/// State captured when an operation starts, restored if it fails
struct Checkpoint {
    ledger: usize,
    external: usize,
    events: usize,
    native_custody: Amount,
}

/// Main vault ledger that owns balances and orders effects against external calls
///
/// Every public mutating operation runs in its own execution frame: if it
/// returns an error, balances, the event log, native custody and the
/// collaborator handed to the operation are put back exactly as they were
/// when the operation started. Frames nest, so an operation re-entered from
/// inside an external call is undone on its own when it fails, and undone
/// together with its caller when the caller fails.
///
/// Balances are always updated before the vault calls out to a transport or
/// token contract. A re-entrant call therefore sees the updated balances and
/// cannot withdraw against a stale one.
pub struct Vault<S: LedgerStorage> {
    book: BalanceBook<S>,
    events: EventLog,
    validator: Box<dyn OperationValidator>,
    address: Address,
    native_decimals: u8,
    native_custody: Amount,
    depth: usize,
    call_id: Uuid,
}

impl<S: LedgerStorage> Vault<S> {
    /// Create a new vault with the default configuration
    pub fn new(storage: S) -> Self {
        Self::build(
            storage,
            &VaultConfig::default(),
            Box::new(DefaultOperationValidator),
        )
    }

    /// Create a new vault from a validated configuration
    pub fn from_config(storage: S, config: &VaultConfig) -> LedgerResult<Self> {
        config.validate()?;
        Ok(Self::build(
            storage,
            config,
            Box::new(DefaultOperationValidator),
        ))
    }

    /// Create a new vault with a custom validator
    pub fn with_validator(storage: S, validator: Box<dyn OperationValidator>) -> Self {
        Self::build(storage, &VaultConfig::default(), validator)
    }

    fn build(storage: S, config: &VaultConfig, validator: Box<dyn OperationValidator>) -> Self {
        Self {
            book: BalanceBook::new(storage),
            events: EventLog::new(),
            validator,
            address: config.address,
            native_decimals: config.native_decimals,
            native_custody: Amount::zero(),
            depth: 0,
            call_id: Uuid::nil(),
        }
    }

    /// The vault's own address (custody account on token contracts)
    pub fn address(&self) -> Address {
        self.address
    }

    /// Native currency currently held by the vault
    pub fn native_custody(&self) -> &Amount {
        &self.native_custody
    }

    /// Id of the top-level call currently executing, or of the last one
    pub fn current_call(&self) -> Uuid {
        self.call_id
    }

    /// Run `body` as one atomic operation against `external`
    fn execute<E, T>(
        &mut self,
        operation: &'static str,
        external: &mut E,
        body: impl FnOnce(&mut Self, &mut E) -> LedgerResult<T>,
    ) -> LedgerResult<T>
    where
        E: ExternalState + ?Sized,
    {
        if self.depth == 0 {
            self.call_id = Uuid::new_v4();
        }

        let checkpoint = Checkpoint {
            ledger: self.book.checkpoint(),
            external: external.checkpoint(),
            events: self.events.len(),
            native_custody: self.native_custody.clone(),
        };

        self.depth += 1;
        tracing::debug!(operation, call_id = %self.call_id, depth = self.depth, "operation started");
        let result = body(self, external);
        self.depth -= 1;

        match &result {
            Err(err) => {
                external.revert_to(checkpoint.external);
                self.events.truncate(checkpoint.events);
                self.native_custody = checkpoint.native_custody;
                if let Err(revert_err) = self.book.revert_to(checkpoint.ledger) {
                    tracing::error!(operation, call_id = %self.call_id, error = %revert_err, "revert failed");
                    return Err(revert_err);
                }
                tracing::warn!(
                    operation,
                    call_id = %self.call_id,
                    depth = self.depth,
                    error = %err,
                    "operation reverted"
                );
            }
            Ok(_) if self.depth == 0 => {
                self.book.commit();
                external.commit();
            }
            Ok(_) => {}
        }

        result
    }

    fn emit(&mut self, event: VaultEvent) {
        let record = self.events.record(self.call_id, event);
        tracing::info!(
            sequence = record.sequence,
            call_id = %record.call_id,
            event = ?record.event,
            "event emitted"
        );
    }

    // Native currency operations

    /// Credit native currency attached to the call
    pub fn deposit_native(&mut self, caller: Address, amount: Amount) -> LedgerResult<()> {
        self.execute("deposit_native", &mut (), |vault, _| {
            vault.apply_native_deposit(&caller, &amount)
        })
    }

    /// Bare currency transfer with no method selector; credited like a deposit
    pub fn receive(&mut self, caller: Address, amount: Amount) -> LedgerResult<()> {
        self.execute("receive", &mut (), |vault, _| {
            vault.apply_native_deposit(&caller, &amount)
        })
    }

    fn apply_native_deposit(&mut self, caller: &Address, amount: &Amount) -> LedgerResult<()> {
        self.validator.validate_amount(amount)?;

        let balance = self.book.credit_native(caller, amount)?;
        self.native_custody += amount;
        tracing::debug!(owner = %caller, %amount, %balance, "native balance credited");

        self.emit(VaultEvent::NativeDeposited {
            owner: *caller,
            amount: amount.clone(),
        });
        Ok(())
    }

    /// Withdraw native currency back to the caller through `transport`
    pub fn withdraw_native(
        &mut self,
        transport: &mut dyn NativeTransport<S>,
        caller: Address,
        amount: Amount,
    ) -> LedgerResult<()> {
        self.execute("withdraw_native", transport, |vault, transport| {
            vault.validator.validate_amount(&amount)?;

            // Balance and custody are reduced before the push.
            let balance = vault.book.debit_native(&caller, &amount)?;
            vault.native_custody = vault.native_custody.checked_sub(&amount).ok_or_else(|| {
                LedgerError::Storage("Native custody is smaller than a recorded balance".to_string())
            })?;
            tracing::debug!(owner = %caller, %amount, %balance, "native balance debited");

            transport
                .send(vault, &caller, &amount)
                .map_err(as_transfer_failure)?;

            vault.emit(VaultEvent::NativeWithdrawn {
                owner: caller,
                amount: amount.clone(),
            });
            Ok(())
        })
    }

    // Token operations

    /// Credit `amount` of `token` and pull it from the caller into custody
    ///
    /// The caller must have approved the vault as spender beforehand.
    pub fn deposit_token(
        &mut self,
        assets: &mut dyn TokenAssets<S>,
        caller: Address,
        token: Address,
        amount: Amount,
    ) -> LedgerResult<()> {
        self.execute("deposit_token", assets, |vault, assets| {
            vault.validator.validate_asset(&token)?;
            vault.validator.validate_amount(&amount)?;

            if vault.book.ensure_tracked(&caller, &token)? {
                tracing::debug!(owner = %caller, %token, "token tracked");
            }
            let balance = vault.book.credit_token(&caller, &token, &amount)?;
            tracing::debug!(owner = %caller, %token, %amount, %balance, "token balance credited");

            let custody = vault.address;
            let accepted = assets
                .transfer_from(vault, &token, &caller, &custody, &amount)
                .map_err(as_transfer_failure)?;
            if !accepted {
                return Err(LedgerError::TransferFailed(format!(
                    "Token {} refused transfer_from",
                    token
                )));
            }

            vault.emit(VaultEvent::TokenDeposited {
                owner: caller,
                token,
                amount: amount.clone(),
            });
            Ok(())
        })
    }

    /// Release `amount` of `token` from custody back to the caller
    pub fn withdraw_token(
        &mut self,
        assets: &mut dyn TokenAssets<S>,
        caller: Address,
        token: Address,
        amount: Amount,
    ) -> LedgerResult<()> {
        self.execute("withdraw_token", assets, |vault, assets| {
            vault.validator.validate_asset(&token)?;
            vault.validator.validate_amount(&amount)?;

            // Balance is reduced before the token contract is called.
            let balance = vault.book.debit_token(&caller, &token, &amount)?;
            tracing::debug!(owner = %caller, %token, %amount, %balance, "token balance debited");

            let accepted = assets
                .transfer(vault, &token, &caller, &amount)
                .map_err(as_transfer_failure)?;
            if !accepted {
                return Err(LedgerError::TransferFailed(format!(
                    "Token {} refused transfer",
                    token
                )));
            }

            vault.emit(VaultEvent::TokenWithdrawn {
                owner: caller,
                token,
                amount: amount.clone(),
            });
            Ok(())
        })
    }

    // Read operations

    /// Native balance of an owner
    pub fn native_balance(&self, owner: &Address) -> LedgerResult<Amount> {
        self.book.native_balance(owner)
    }

    /// Token balance of an owner
    pub fn token_balance(&self, owner: &Address, token: &Address) -> LedgerResult<Amount> {
        self.book.token_balance(owner, token)
    }

    /// Every token the owner has deposited, in first-deposit order
    pub fn tracked_tokens(&self, owner: &Address) -> LedgerResult<Vec<Address>> {
        self.book.tracked_tokens(owner)
    }

    /// Native balance plus the balance of each requested token
    ///
    /// The token list is taken as given: unknown ids report zero and
    /// duplicates are reported once per occurrence.
    pub fn balance_snapshot(
        &self,
        owner: &Address,
        tokens: &[Address],
    ) -> LedgerResult<BalanceSnapshot> {
        let native = self.book.native_balance(owner)?;
        let tokens = tokens
            .iter()
            .map(|token| Ok((*token, self.book.token_balance(owner, token)?)))
            .collect::<LedgerResult<Vec<_>>>()?;

        Ok(BalanceSnapshot {
            owner: *owner,
            native,
            tokens,
        })
    }

    /// Decimals reported by a token contract
    pub fn token_decimals(&self, assets: &dyn TokenAssets<S>, token: &Address) -> LedgerResult<u8> {
        self.validator.validate_asset(token)?;
        assets.decimals(token)
    }

    /// Every emitted event, oldest first
    pub fn events(&self) -> &[EventRecord] {
        self.events.records()
    }

    /// Events that name `owner`
    pub fn events_for(&self, owner: &Address) -> Vec<EventRecord> {
        self.events.for_owner(owner)
    }

    /// Display value of a native amount using the configured decimals
    pub fn format_native(&self, amount: &Amount) -> BigDecimal {
        crate::units::format_units(amount, self.native_decimals)
    }

    /// Check the ledger's internal invariants
    pub fn validate_integrity(&self) -> LedgerResult<LedgerIntegrityReport> {
        let mut issues = self.book.tracking_issues()?;

        let total_native_balances = self.book.total_native()?;
        if total_native_balances > self.native_custody {
            issues.push(format!(
                "Native balances total {} but custody holds {}",
                total_native_balances, self.native_custody
            ));
        }

        Ok(LedgerIntegrityReport {
            is_valid: issues.is_empty(),
            issues,
            total_native_balances,
            native_custody: self.native_custody.clone(),
            token_custody: Vec::new(),
        })
    }

    /// Check the internal invariants and that every tracked token is fully
    /// backed by what the token contract says the vault holds
    pub fn validate_integrity_with_assets(
        &self,
        assets: &dyn TokenAssets<S>,
    ) -> LedgerResult<LedgerIntegrityReport> {
        let mut report = self.validate_integrity()?;

        for token in self.book.all_tracked_tokens()? {
            let recorded = self.book.total_token(&token)?;
            let held = match assets.balance_of(&token, &self.address) {
                Ok(held) => held,
                Err(err) => {
                    report
                        .issues
                        .push(format!("Token {} custody could not be read: {}", token, err));
                    continue;
                }
            };
            if recorded > held {
                report.issues.push(format!(
                    "Token {} balances total {} but custody holds {}",
                    token, recorded, held
                ));
            }
            report.token_custody.push(TokenCustody {
                token,
                recorded,
                held,
            });
        }

        report.is_valid = report.issues.is_empty();
        Ok(report)
    }
}

fn as_transfer_failure(err: LedgerError) -> LedgerError {
    match err {
        LedgerError::TransferFailed(reason) => LedgerError::TransferFailed(reason),
        other => LedgerError::TransferFailed(other.to_string()),
    }
}

/// Recorded versus held amounts for one token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCustody {
    pub token: Address,
    pub recorded: Amount,
    pub held: Amount,
}

/// Report on ledger integrity and validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerIntegrityReport {
    pub is_valid: bool,
    pub issues: Vec<String>,
    pub total_native_balances: Amount,
    pub native_custody: Amount,
    pub token_custody: Vec<TokenCustody>,
}
