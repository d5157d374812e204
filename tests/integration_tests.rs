//! Integration tests for vault-core

use bigdecimal::BigDecimal;
use vault_core::{
    assets::{LocalChain, StandardToken, TokenRegistry},
    units::parse_units,
    utils::MemoryStorage,
    Address, Amount, ExternalState, LedgerError, LedgerResult, LedgerStorage, NativeTransport,
    TokenAssets, Vault, VaultConfig, VaultEvent,
};

fn alice() -> Address {
    Address::repeat_byte(0xa1)
}

fn token_x() -> Address {
    Address::repeat_byte(0x10)
}

fn token_y() -> Address {
    Address::repeat_byte(0x20)
}

fn ether(text: &str) -> Amount {
    parse_units(text, 18).unwrap()
}

/// Chain with tokens X and Y, alice holding 1000 of each and the vault approved for all of it
fn chain_with_tokens(vault: &Vault<MemoryStorage>) -> LocalChain {
    let mut registry = TokenRegistry::new();
    for (address, symbol) in [(token_x(), "X"), (token_y(), "Y")] {
        let mut token = StandardToken::new(format!("Token {}", symbol), symbol.to_string(), 18);
        token.mint(&alice(), &Amount::from(1_000u64)).unwrap();
        token.approve(&alice(), &vault.address(), &Amount::from(1_000u64));
        registry.register(address, token).unwrap();
    }
    LocalChain::with_tokens(registry)
}

/// Recipient whose payment hook re-enters `withdraw_native` with the same amount
struct ReentrantRecipient {
    reentries_left: usize,
    propagate: bool,
    payments: Vec<Amount>,
    reentry_errors: Vec<LedgerError>,
}

impl ReentrantRecipient {
    fn new(reentries: usize, propagate: bool) -> Self {
        Self {
            reentries_left: reentries,
            propagate,
            payments: Vec::new(),
            reentry_errors: Vec::new(),
        }
    }

    fn received(&self) -> Amount {
        let mut total = Amount::zero();
        for payment in &self.payments {
            total += payment;
        }
        total
    }
}

impl ExternalState for ReentrantRecipient {
    fn checkpoint(&mut self) -> usize {
        self.payments.len()
    }

    fn revert_to(&mut self, checkpoint: usize) {
        self.payments.truncate(checkpoint);
    }

    fn commit(&mut self) {}
}

impl<S: LedgerStorage> NativeTransport<S> for ReentrantRecipient {
    fn send(&mut self, vault: &mut Vault<S>, to: &Address, amount: &Amount) -> LedgerResult<()> {
        if self.reentries_left > 0 {
            self.reentries_left -= 1;
            if let Err(err) = vault.withdraw_native(self, *to, amount.clone()) {
                if self.propagate {
                    return Err(err);
                }
                self.reentry_errors.push(err);
            }
        }
        self.payments.push(amount.clone());
        Ok(())
    }
}

/// Token contract whose `transfer` re-enters `withdraw_token` before moving funds
struct ReentrantToken {
    registry: TokenRegistry,
    reentries_left: usize,
    reentry_errors: Vec<LedgerError>,
}

impl ExternalState for ReentrantToken {
    fn checkpoint(&mut self) -> usize {
        self.registry.checkpoint()
    }

    fn revert_to(&mut self, checkpoint: usize) {
        self.registry.revert_to(checkpoint);
    }

    fn commit(&mut self) {
        self.registry.commit();
    }
}

impl<S: LedgerStorage> TokenAssets<S> for ReentrantToken {
    fn transfer_from(
        &mut self,
        vault: &mut Vault<S>,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: &Amount,
    ) -> LedgerResult<bool> {
        self.registry.transfer_from(vault, token, from, to, amount)
    }

    fn transfer(
        &mut self,
        vault: &mut Vault<S>,
        token: &Address,
        to: &Address,
        amount: &Amount,
    ) -> LedgerResult<bool> {
        if self.reentries_left > 0 {
            self.reentries_left -= 1;
            if let Err(err) = vault.withdraw_token(self, *to, *token, amount.clone()) {
                self.reentry_errors.push(err);
            }
        }
        self.registry.transfer(vault, token, to, amount)
    }

    fn balance_of(&self, token: &Address, owner: &Address) -> LedgerResult<Amount> {
        TokenAssets::<S>::balance_of(&self.registry, token, owner)
    }

    fn decimals(&self, token: &Address) -> LedgerResult<u8> {
        TokenAssets::<S>::decimals(&self.registry, token)
    }
}

/// Token contract that reports failure without raising an error
struct FalseReturningToken;

impl ExternalState for FalseReturningToken {
    fn checkpoint(&mut self) -> usize {
        0
    }

    fn revert_to(&mut self, _checkpoint: usize) {}

    fn commit(&mut self) {}
}

impl<S: LedgerStorage> TokenAssets<S> for FalseReturningToken {
    fn transfer_from(
        &mut self,
        _vault: &mut Vault<S>,
        _token: &Address,
        _from: &Address,
        _to: &Address,
        _amount: &Amount,
    ) -> LedgerResult<bool> {
        Ok(false)
    }

    fn transfer(
        &mut self,
        _vault: &mut Vault<S>,
        _token: &Address,
        _to: &Address,
        _amount: &Amount,
    ) -> LedgerResult<bool> {
        Ok(false)
    }

    fn balance_of(&self, _token: &Address, _owner: &Address) -> LedgerResult<Amount> {
        Ok(Amount::zero())
    }

    fn decimals(&self, _token: &Address) -> LedgerResult<u8> {
        Ok(0)
    }
}

/// Recipient that pulls its token balance out through the chain it owns,
/// then refuses the native payment that triggered the hook
struct TokenGrabbingRecipient {
    chain: LocalChain,
    token: Address,
    amount: Amount,
}

impl ExternalState for TokenGrabbingRecipient {
    fn checkpoint(&mut self) -> usize {
        self.chain.checkpoint()
    }

    fn revert_to(&mut self, checkpoint: usize) {
        self.chain.revert_to(checkpoint);
    }

    fn commit(&mut self) {
        self.chain.commit();
    }
}

impl<S: LedgerStorage> NativeTransport<S> for TokenGrabbingRecipient {
    fn send(&mut self, vault: &mut Vault<S>, to: &Address, _amount: &Amount) -> LedgerResult<()> {
        vault.withdraw_token(&mut self.chain, *to, self.token, self.amount.clone())?;
        Err(LedgerError::TransferFailed("payment refused".to_string()))
    }
}

/// Token wrapper that records what the ledger shows while the token call runs
struct ObservingToken {
    chain: LocalChain,
    /// `(balance, tracked tokens)` of the depositor seen inside `transfer_from`
    seen_on_deposit: Vec<(Amount, Vec<Address>)>,
    /// Balance of the recipient seen inside `transfer`
    seen_on_withdraw: Vec<Amount>,
}

impl ExternalState for ObservingToken {
    fn checkpoint(&mut self) -> usize {
        self.chain.checkpoint()
    }

    fn revert_to(&mut self, checkpoint: usize) {
        self.chain.revert_to(checkpoint);
    }

    fn commit(&mut self) {
        self.chain.commit();
    }
}

impl<S: LedgerStorage> TokenAssets<S> for ObservingToken {
    fn transfer_from(
        &mut self,
        vault: &mut Vault<S>,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: &Amount,
    ) -> LedgerResult<bool> {
        self.seen_on_deposit.push((
            vault.token_balance(from, token)?,
            vault.tracked_tokens(from)?,
        ));
        self.chain.transfer_from(vault, token, from, to, amount)
    }

    fn transfer(
        &mut self,
        vault: &mut Vault<S>,
        token: &Address,
        to: &Address,
        amount: &Amount,
    ) -> LedgerResult<bool> {
        self.seen_on_withdraw.push(vault.token_balance(to, token)?);
        self.chain.transfer(vault, token, to, amount)
    }

    fn balance_of(&self, token: &Address, owner: &Address) -> LedgerResult<Amount> {
        TokenAssets::<S>::balance_of(&self.chain, token, owner)
    }

    fn decimals(&self, token: &Address) -> LedgerResult<u8> {
        TokenAssets::<S>::decimals(&self.chain, token)
    }
}

#[test]
fn test_deposit_then_partial_withdraw_emits_two_events() {
    let mut vault = Vault::new(MemoryStorage::new());
    let mut chain = LocalChain::new();

    vault.deposit_native(alice(), ether("1.0")).unwrap();
    vault
        .withdraw_native(&mut chain, alice(), ether("0.5"))
        .unwrap();

    assert_eq!(vault.native_balance(&alice()).unwrap(), ether("0.5"));
    assert_eq!(chain.wallet_balance(&alice()), ether("0.5"));

    let events: Vec<VaultEvent> = vault.events().iter().map(|r| r.event.clone()).collect();
    assert_eq!(
        events,
        vec![
            VaultEvent::NativeDeposited {
                owner: alice(),
                amount: ether("1.0")
            },
            VaultEvent::NativeWithdrawn {
                owner: alice(),
                amount: ether("0.5")
            },
        ]
    );
}

#[test]
fn test_tracked_tokens_keep_deposit_order() {
    let mut vault = Vault::new(MemoryStorage::new());
    let mut chain = chain_with_tokens(&vault);

    vault
        .deposit_token(&mut chain, alice(), token_x(), Amount::from(100u64))
        .unwrap();
    vault
        .deposit_token(&mut chain, alice(), token_y(), Amount::from(50u64))
        .unwrap();

    assert_eq!(
        vault.tracked_tokens(&alice()).unwrap(),
        vec![token_x(), token_y()]
    );
    assert_eq!(
        vault.token_balance(&alice(), &token_x()).unwrap(),
        Amount::from(100u64)
    );
    assert_eq!(
        vault.token_balance(&alice(), &token_y()).unwrap(),
        Amount::from(50u64)
    );
}

#[test]
fn test_repeat_deposit_tracks_token_once() {
    let mut vault = Vault::new(MemoryStorage::new());
    let mut chain = chain_with_tokens(&vault);

    vault
        .deposit_token(&mut chain, alice(), token_x(), Amount::from(30u64))
        .unwrap();
    vault
        .deposit_token(&mut chain, alice(), token_x(), Amount::from(20u64))
        .unwrap();

    assert_eq!(vault.tracked_tokens(&alice()).unwrap(), vec![token_x()]);
    assert_eq!(
        vault.token_balance(&alice(), &token_x()).unwrap(),
        Amount::from(50u64)
    );
    assert!(vault.validate_integrity().unwrap().is_valid);
}

#[test]
fn test_round_trips_restore_balances() {
    let mut vault = Vault::new(MemoryStorage::new());
    let mut chain = chain_with_tokens(&vault);
    vault.deposit_native(alice(), ether("2")).unwrap();
    vault
        .deposit_token(&mut chain, alice(), token_x(), Amount::from(10u64))
        .unwrap();

    let native_before = vault.native_balance(&alice()).unwrap();
    let token_before = vault.token_balance(&alice(), &token_x()).unwrap();

    vault.deposit_native(alice(), ether("0.25")).unwrap();
    vault
        .withdraw_native(&mut chain, alice(), ether("0.25"))
        .unwrap();
    vault
        .deposit_token(&mut chain, alice(), token_x(), Amount::from(7u64))
        .unwrap();
    vault
        .withdraw_token(&mut chain, alice(), token_x(), Amount::from(7u64))
        .unwrap();

    assert_eq!(vault.native_balance(&alice()).unwrap(), native_before);
    assert_eq!(
        vault.token_balance(&alice(), &token_x()).unwrap(),
        token_before
    );
    let report = vault.validate_integrity_with_assets(&chain).unwrap();
    assert!(report.is_valid, "{:?}", report.issues);
}

#[test]
fn test_zero_amounts_are_rejected_everywhere() {
    let mut vault = Vault::new(MemoryStorage::new());
    let mut chain = chain_with_tokens(&vault);
    vault.deposit_native(alice(), Amount::from(5u64)).unwrap();
    vault
        .deposit_token(&mut chain, alice(), token_x(), Amount::from(5u64))
        .unwrap();
    let events_before = vault.events().len();

    assert_eq!(
        vault.deposit_native(alice(), Amount::zero()),
        Err(LedgerError::InvalidAmount)
    );
    assert_eq!(
        vault.withdraw_native(&mut chain, alice(), Amount::zero()),
        Err(LedgerError::InvalidAmount)
    );
    assert_eq!(
        vault.deposit_token(&mut chain, alice(), token_x(), Amount::zero()),
        Err(LedgerError::InvalidAmount)
    );
    assert_eq!(
        vault.withdraw_token(&mut chain, alice(), token_x(), Amount::zero()),
        Err(LedgerError::InvalidAmount)
    );

    assert_eq!(vault.native_balance(&alice()).unwrap(), Amount::from(5u64));
    assert_eq!(
        vault.token_balance(&alice(), &token_x()).unwrap(),
        Amount::from(5u64)
    );
    assert_eq!(vault.events().len(), events_before);
}

#[test]
fn test_over_withdrawal_changes_nothing() {
    let mut vault = Vault::new(MemoryStorage::new());
    let mut chain = chain_with_tokens(&vault);
    vault.deposit_native(alice(), Amount::from(5u64)).unwrap();
    vault
        .deposit_token(&mut chain, alice(), token_x(), Amount::from(5u64))
        .unwrap();

    assert_eq!(
        vault.withdraw_native(&mut chain, alice(), Amount::from(6u64)),
        Err(LedgerError::InsufficientBalance {
            available: Amount::from(5u64),
            requested: Amount::from(6u64),
        })
    );
    assert!(matches!(
        vault.withdraw_token(&mut chain, alice(), token_x(), Amount::from(6u64)),
        Err(LedgerError::InsufficientBalance { .. })
    ));
    assert_eq!(chain.wallet_balance(&alice()), Amount::zero());
    assert_eq!(vault.native_custody(), &Amount::from(5u64));
}

#[test]
fn test_refused_payment_rolls_back_withdrawal() {
    let mut vault = Vault::new(MemoryStorage::new());
    let mut chain = LocalChain::new();
    chain.refuse_payments_to(alice());
    vault.deposit_native(alice(), ether("1")).unwrap();

    let err = vault
        .withdraw_native(&mut chain, alice(), ether("1"))
        .unwrap_err();

    assert!(matches!(err, LedgerError::TransferFailed(_)));
    assert_eq!(vault.native_balance(&alice()).unwrap(), ether("1"));
    assert_eq!(vault.native_custody(), &ether("1"));
    assert_eq!(vault.events_for(&alice()).len(), 1);
}

#[test]
fn test_false_return_from_token_rolls_back() {
    let mut vault = Vault::new(MemoryStorage::new());

    let err = vault
        .deposit_token(
            &mut FalseReturningToken,
            alice(),
            token_x(),
            Amount::from(1u64),
        )
        .unwrap_err();

    assert!(matches!(err, LedgerError::TransferFailed(_)));
    assert!(vault.tracked_tokens(&alice()).unwrap().is_empty());
    assert!(vault.events().is_empty());
}

#[test]
fn test_reentrant_native_withdraw_cannot_exceed_balance() {
    let mut vault = Vault::new(MemoryStorage::new());
    vault.deposit_native(alice(), ether("1")).unwrap();
    let mut attacker = ReentrantRecipient::new(1, false);

    vault
        .withdraw_native(&mut attacker, alice(), ether("0.6"))
        .unwrap();

    // The re-entrant call saw 0.4 left and was refused.
    assert_eq!(attacker.received(), ether("0.6"));
    assert!(matches!(
        attacker.reentry_errors.as_slice(),
        [LedgerError::InsufficientBalance { .. }]
    ));
    assert_eq!(vault.native_balance(&alice()).unwrap(), ether("0.4"));
    assert!(vault.validate_integrity().unwrap().is_valid);
}

#[test]
fn test_reentrant_native_withdraw_within_balance_is_accounted() {
    let mut vault = Vault::new(MemoryStorage::new());
    vault.deposit_native(alice(), ether("1")).unwrap();
    let mut attacker = ReentrantRecipient::new(3, false);

    vault
        .withdraw_native(&mut attacker, alice(), ether("0.3"))
        .unwrap();

    // Outer call plus two nested calls fit; the third nested call does not.
    assert_eq!(attacker.received(), ether("0.9"));
    assert_eq!(attacker.reentry_errors.len(), 1);
    assert_eq!(vault.native_balance(&alice()).unwrap(), ether("0.1"));
    assert_eq!(vault.native_custody(), &ether("0.1"));

    let withdrawals = vault
        .events()
        .iter()
        .filter(|r| matches!(r.event, VaultEvent::NativeWithdrawn { .. }))
        .count();
    assert_eq!(withdrawals, 3);
    let call_id = vault.events()[1].call_id;
    assert!(vault.events()[1..].iter().all(|r| r.call_id == call_id));
}

#[test]
fn test_failed_reentry_that_propagates_reverts_the_outer_call() {
    let mut vault = Vault::new(MemoryStorage::new());
    vault.deposit_native(alice(), ether("1")).unwrap();
    let mut attacker = ReentrantRecipient::new(1, true);

    let err = vault
        .withdraw_native(&mut attacker, alice(), ether("0.6"))
        .unwrap_err();

    assert!(matches!(err, LedgerError::TransferFailed(_)));
    assert_eq!(vault.native_balance(&alice()).unwrap(), ether("1"));
    assert_eq!(vault.native_custody(), &ether("1"));
    assert_eq!(vault.events().len(), 1);
    assert_eq!(attacker.received(), Amount::zero());
}

#[test]
fn test_token_withdrawn_inside_a_rejected_push_is_taken_back() {
    let mut vault = Vault::new(MemoryStorage::new());
    let mut chain = chain_with_tokens(&vault);
    vault.deposit_native(alice(), ether("1")).unwrap();
    vault
        .deposit_token(&mut chain, alice(), token_x(), Amount::from(100u64))
        .unwrap();
    let mut recipient = TokenGrabbingRecipient {
        chain,
        token: token_x(),
        amount: Amount::from(100u64),
    };

    let err = vault
        .withdraw_native(&mut recipient, alice(), ether("1"))
        .unwrap_err();

    assert_eq!(err, LedgerError::TransferFailed("payment refused".to_string()));
    assert_eq!(
        vault.token_balance(&alice(), &token_x()).unwrap(),
        Amount::from(100u64)
    );
    assert_eq!(vault.native_balance(&alice()).unwrap(), ether("1"));
    assert_eq!(vault.events().len(), 2);

    let token = recipient.chain.tokens().get(&token_x()).unwrap();
    assert_eq!(token.balance_of(&vault.address()), Amount::from(100u64));
    assert_eq!(token.balance_of(&alice()), Amount::from(900u64));
    let report = vault
        .validate_integrity_with_assets(&recipient.chain)
        .unwrap();
    assert!(report.is_valid, "{:?}", report.issues);
}

#[test]
fn test_token_balance_changes_before_the_token_is_called() {
    let mut vault = Vault::new(MemoryStorage::new());
    let mut token = ObservingToken {
        chain: chain_with_tokens(&vault),
        seen_on_deposit: Vec::new(),
        seen_on_withdraw: Vec::new(),
    };

    vault
        .deposit_token(&mut token, alice(), token_x(), Amount::from(30u64))
        .unwrap();
    vault
        .deposit_token(&mut token, alice(), token_x(), Amount::from(20u64))
        .unwrap();
    vault
        .withdraw_token(&mut token, alice(), token_x(), Amount::from(45u64))
        .unwrap();

    // Tracked and credited before transfer_from, debited before transfer.
    assert_eq!(
        token.seen_on_deposit,
        vec![
            (Amount::from(30u64), vec![token_x()]),
            (Amount::from(50u64), vec![token_x()]),
        ]
    );
    assert_eq!(token.seen_on_withdraw, vec![Amount::from(5u64)]);
    assert_eq!(
        vault.token_balance(&alice(), &token_x()).unwrap(),
        Amount::from(5u64)
    );
}

#[test]
fn test_reentrant_token_withdraw_cannot_exceed_balance() {
    let mut vault = Vault::new(MemoryStorage::new());
    let chain = chain_with_tokens(&vault);
    let mut token = ReentrantToken {
        registry: chain.tokens().clone(),
        reentries_left: 1,
        reentry_errors: Vec::new(),
    };
    vault
        .deposit_token(&mut token, alice(), token_x(), Amount::from(100u64))
        .unwrap();

    vault
        .withdraw_token(&mut token, alice(), token_x(), Amount::from(60u64))
        .unwrap();

    assert!(matches!(
        token.reentry_errors.as_slice(),
        [LedgerError::InsufficientBalance { .. }]
    ));
    assert_eq!(
        vault.token_balance(&alice(), &token_x()).unwrap(),
        Amount::from(40u64)
    );
    let held = token.registry.get(&token_x()).unwrap();
    assert_eq!(held.balance_of(&alice()), Amount::from(960u64));
    assert_eq!(held.balance_of(&vault.address()), Amount::from(40u64));
}

#[test]
fn test_null_token_is_invalid_asset() {
    let mut vault = Vault::new(MemoryStorage::new());
    let mut chain = chain_with_tokens(&vault);

    assert_eq!(
        vault.deposit_token(&mut chain, alice(), Address::ZERO, Amount::from(1u64)),
        Err(LedgerError::InvalidAsset)
    );
    assert_eq!(
        vault.token_decimals(&chain, &Address::ZERO),
        Err(LedgerError::InvalidAsset)
    );
    assert_eq!(vault.token_decimals(&chain, &token_y()).unwrap(), 18);
}

#[test]
fn test_vault_from_config_uses_configured_address() {
    let config = VaultConfig::from_json_str(
        r#"{ "address": "0x7777777777777777777777777777777777777777", "native_decimals": 6 }"#,
    )
    .unwrap();
    let mut vault = Vault::from_config(MemoryStorage::new(), &config).unwrap();
    let mut chain = chain_with_tokens(&vault);

    assert_eq!(vault.address(), Address::repeat_byte(0x77));
    vault
        .deposit_token(&mut chain, alice(), token_x(), Amount::from(10u64))
        .unwrap();
    assert_eq!(
        chain
            .tokens()
            .get(&token_x())
            .unwrap()
            .balance_of(&Address::repeat_byte(0x77)),
        Amount::from(10u64)
    );
    assert_eq!(
        vault.format_native(&Amount::from(1_500_000u64)),
        "1.5".parse::<BigDecimal>().unwrap()
    );
}
