//! Vault configuration

use serde::{Deserialize, Serialize};

use crate::types::*;

/// Address the vault uses when none is configured
pub const DEFAULT_VAULT_ADDRESS: Address = Address::repeat_byte(0x5a);

/// Static settings for a vault instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// The vault's own address, used as custody account on token contracts
    pub address: Address,
    /// Ticker of the native currency, for display only
    pub native_symbol: String,
    /// Decimal places of the native currency (18 for wei)
    pub native_decimals: u8,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_VAULT_ADDRESS,
            native_symbol: "ETH".to_string(),
            native_decimals: 18,
        }
    }
}

impl VaultConfig {
    /// Parse and validate a JSON configuration; missing fields take defaults
    pub fn from_json_str(json: &str) -> LedgerResult<Self> {
        let config: VaultConfig = serde_json::from_str(json)
            .map_err(|e| LedgerError::Validation(format!("Invalid vault config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> LedgerResult<()> {
        if self.address.is_zero() {
            return Err(LedgerError::Validation(
                "Vault address cannot be zero".to_string(),
            ));
        }

        if self.native_symbol.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Native symbol cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
