//! # Vault Core
//!
//! A balance ledger for a custody vault holding native currency and fungible
//! tokens on behalf of many owners.
//!
//! ## Features
//!
//! - **Per-owner balances**: native currency and any number of tokens, with unbounded integer amounts
//! - **Token tracking**: every token an owner deposits is remembered once, in first-deposit order
//! - **Atomic operations**: a failed operation leaves no trace in balances, custody, events or the collaborator it called
//! - **Reentrancy-safe ordering**: balances change before the vault calls out to a transport or token
//! - **Event log**: `NativeDeposited`, `NativeWithdrawn`, `TokenDeposited`, `TokenWithdrawn`
//! - **Storage abstraction**: backend-agnostic design with trait-based storage
//!
//! ## Quick Start
//!
//! ```rust
//! use vault_core::{Address, Amount, Vault};
//! use vault_core::assets::LocalChain;
//! use vault_core::utils::MemoryStorage;
//!
//! let mut vault = Vault::new(MemoryStorage::new());
//! let mut chain = LocalChain::new();
//! let alice = Address::repeat_byte(0xa1);
//!
//! vault.deposit_native(alice, Amount::from(100u64)).unwrap();
//! vault.withdraw_native(&mut chain, alice, Amount::from(40u64)).unwrap();
//!
//! assert_eq!(vault.native_balance(&alice).unwrap(), Amount::from(60u64));
//! assert_eq!(chain.wallet_balance(&alice), Amount::from(40u64));
//! ```

pub mod assets;
pub mod config;
pub mod ledger;
pub mod service;
pub mod traits;
pub mod types;
pub mod units;
pub mod utils;

// Re-export commonly used types
pub use config::VaultConfig;
pub use ledger::*;
pub use service::{VaultApi, VaultService};
pub use traits::*;
pub use types::*;
