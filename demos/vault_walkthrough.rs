//! Vault walkthrough example
//!
//! Run with `RUST_LOG=vault_core=debug cargo run --example vault_walkthrough`
//! to see the ledger's own log lines alongside the output.

use tracing_subscriber::EnvFilter;
use vault_core::assets::{LocalChain, StandardToken, TokenRegistry};
use vault_core::units::{format_units, parse_units};
use vault_core::utils::MemoryStorage;
use vault_core::{Address, Amount, Vault, VaultApi, VaultConfig, VaultService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    println!("🏦 Vault Core - Walkthrough\n");

    let config = VaultConfig::from_json_str(
        r#"{ "address": "0x5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a", "native_symbol": "ETH" }"#,
    )?;
    let vault = Vault::from_config(MemoryStorage::new(), &config)?;

    let alice = Address::repeat_byte(0xa1);
    let usdc: Address = "0x1010101010101010101010101010101010101010".parse()?;
    let dai: Address = "0x2020202020202020202020202020202020202020".parse()?;

    // 1. Deploy two tokens and give alice some of each
    println!("🪙 Deploying tokens...");
    let mut registry = TokenRegistry::new();
    for (address, name, symbol, decimals) in [
        (usdc, "USD Coin", "USDC", 6u8),
        (dai, "Dai Stablecoin", "DAI", 18u8),
    ] {
        let mut token = StandardToken::new(name.to_string(), symbol.to_string(), decimals);
        let supply = parse_units("1000", decimals)?;
        token.mint(&alice, &supply)?;
        token.approve(&alice, &vault.address(), &supply);
        registry.register(address, token)?;
        println!("  ✓ {} ({}) at {}", name, symbol, address);
    }
    println!();

    let service = VaultService::new(vault, LocalChain::with_tokens(registry));

    // 2. Native currency
    println!("💰 Native currency...");
    service.deposit_native(alice, parse_units("1.0", 18)?).await?;
    service.withdraw_native(alice, parse_units("0.5", 18)?).await?;
    let native = service.native_balance(alice).await?;
    println!("  ✓ Deposited 1.0 {0}, withdrew 0.5 {0}", config.native_symbol);
    println!(
        "  → Balance: {} {}\n",
        format_units(&native, config.native_decimals),
        config.native_symbol
    );

    // 3. Tokens
    println!("📥 Tokens...");
    service.deposit_token(alice, usdc, parse_units("100", 6)?).await?;
    service.deposit_token(alice, dai, parse_units("50", 18)?).await?;
    service.deposit_token(alice, usdc, parse_units("25", 6)?).await?;
    service.withdraw_token(alice, usdc, parse_units("5", 6)?).await?;

    let tracked = service.tracked_tokens(alice).await?;
    let snapshot = service.balance_snapshot(alice, tracked).await?;
    for (token, balance) in &snapshot.tokens {
        let decimals = service.token_decimals(*token).await?;
        println!("  ✓ {}: {}", token, format_units(balance, decimals));
    }
    println!();

    // 4. A failed call leaves no trace
    println!("🚫 Over-withdrawal...");
    match service.withdraw_native(alice, Amount::from(u64::MAX)).await {
        Ok(()) => println!("  ✗ unexpectedly succeeded"),
        Err(err) => println!("  ✓ Rejected: {}", err),
    }
    println!();

    // 5. Event log and integrity
    println!("📜 Events...");
    for record in service.events().await? {
        println!("  #{} {}", record.sequence, serde_json::to_string(&record.event)?);
    }
    println!();

    let report = service.integrity_report().await?;
    println!("🔍 Integrity check:");
    println!("  Valid: {}", report.is_valid);
    println!("  Native recorded: {}", report.total_native_balances);
    println!("  Native custody:  {}", report.native_custody);
    for custody in &report.token_custody {
        println!(
            "  {} recorded {} / held {}",
            custody.token, custody.recorded, custody.held
        );
    }

    Ok(())
}
