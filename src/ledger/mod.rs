//! Ledger module containing balance bookkeeping, the event log and the vault

pub mod balances;
pub mod core;
pub mod events;

pub use balances::*;
pub use core::*;
pub use events::*;
