//! Core types and data structures for the vault ledger

use chrono::NaiveDateTime;
use num_bigint::BigUint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign};
use std::str::FromStr;
use uuid::Uuid;

/// 20-byte identifier used for owners, token contracts and the vault itself
///
/// The all-zero address is the null identifier and is never a valid asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 20]);

impl Address {
    /// The null address
    pub const ZERO: Address = Address([0u8; 20]);

    /// Create an address from raw bytes
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Create an address with every byte set to `byte` (handy for fixtures)
    pub const fn repeat_byte(byte: u8) -> Self {
        Self([byte; 20])
    }

    /// Whether this is the null address
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Raw bytes of the address
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits)
            .map_err(|e| LedgerError::Validation(format!("Invalid address '{}': {}", s, e)))?;
        let bytes: [u8; 20] = bytes.try_into().map_err(|_| {
            LedgerError::Validation(format!("Invalid address '{}': expected 20 bytes", s))
        })?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Unsigned, unbounded integer amount in base units (wei-equivalent)
///
/// Addition cannot overflow; subtraction only exists as [`Amount::checked_sub`]
/// so an underflow surfaces as `None` instead of wrapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Amount(BigUint);

impl Amount {
    /// Zero amount
    pub fn zero() -> Self {
        Self(BigUint::default())
    }

    /// Whether the amount is zero
    pub fn is_zero(&self) -> bool {
        self.0 == BigUint::default()
    }

    /// Subtract `other`, returning `None` if the result would be negative
    pub fn checked_sub(&self, other: &Amount) -> Option<Amount> {
        if self.0 >= other.0 {
            Some(Self(&self.0 - &other.0))
        } else {
            None
        }
    }

    /// Underlying big integer
    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    /// Consume into the underlying big integer
    pub fn into_biguint(self) -> BigUint {
        self.0
    }
}

impl From<BigUint> for Amount {
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Self(BigUint::from(value))
    }
}

impl Add<&Amount> for &Amount {
    type Output = Amount;

    fn add(self, rhs: &Amount) -> Amount {
        Amount(&self.0 + &rhs.0)
    }
}

impl AddAssign<&Amount> for Amount {
    fn add_assign(&mut self, rhs: &Amount) {
        self.0 += &rhs.0;
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Amount {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<BigUint>()
            .map(Self)
            .map_err(|e| LedgerError::Validation(format!("Invalid amount '{}': {}", s, e)))
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Notifications emitted by successful ledger operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum VaultEvent {
    /// Native currency credited to an owner
    NativeDeposited { owner: Address, amount: Amount },
    /// Native currency pushed out to an owner
    NativeWithdrawn { owner: Address, amount: Amount },
    /// Tokens pulled into custody and credited to an owner
    TokenDeposited {
        owner: Address,
        token: Address,
        amount: Amount,
    },
    /// Tokens released from custody to an owner
    TokenWithdrawn {
        owner: Address,
        token: Address,
        amount: Amount,
    },
}

impl VaultEvent {
    /// Owner named by the event
    pub fn owner(&self) -> &Address {
        match self {
            VaultEvent::NativeDeposited { owner, .. }
            | VaultEvent::NativeWithdrawn { owner, .. }
            | VaultEvent::TokenDeposited { owner, .. }
            | VaultEvent::TokenWithdrawn { owner, .. } => owner,
        }
    }
}

/// An event as stored in the append-only log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Position in the log, starting at zero
    pub sequence: u64,
    /// Id of the top-level call that emitted the event
    pub call_id: Uuid,
    /// When the event was recorded
    pub recorded_at: NaiveDateTime,
    /// The notification itself
    pub event: VaultEvent,
}

/// Batch read of an owner's native balance plus a caller-chosen token list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub owner: Address,
    pub native: Amount,
    /// One entry per requested token, in request order (duplicates kept)
    pub tokens: Vec<(Address, Amount)>,
}

/// Errors that can occur in the vault ledger
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Invalid amount: must be non-zero and within allowed limits")]
    InvalidAmount,
    #[error("Invalid asset: token address cannot be zero")]
    InvalidAsset,
    #[error("Insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance { available: Amount, requested: Amount },
    #[error("Transfer failed: {0}")]
    TransferFailed(String),
    #[error("External call failed: {0}")]
    ExternalCall(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
