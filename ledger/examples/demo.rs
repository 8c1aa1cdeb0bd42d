//! Walkthrough of the full Tessera ledger lifecycle.
//!
//! Registers an asset with three owners, mints a token against it under
//! the default reserve policy, moves balances around, burns supply, and
//! finishes by replaying an owner's balance history from the version log.
//!
//! Run with:
//!   cargo run --example demo
//!
//! Set RUST_LOG=debug to watch the operation-level tracing output.

use anyhow::Result;
use chrono::Utc;
use serde_json::json;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use tessera_ledger::config::LedgerConfig;
use tessera_ledger::ops::OperationRegistry;
use tessera_ledger::store::db::SledStore;

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

fn tx() -> String {
    Uuid::new_v4().to_string()
}

fn step(title: &str) {
    println!();
    println!("{BOLD}== {title} =={RESET}");
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let registry = OperationRegistry::new(LedgerConfig::default());
    let store = SledStore::open_temporary()?;

    step("Register the asset");
    store.invoke(&tx(), Utc::now(), |inv| {
        registry.dispatch(
            inv,
            "CreateAsset",
            &json!({
                "id": "plot-7",
                "docType": "ASSET",
                "desc": "Seven acres, riverside",
                "name": "Riverside Plot",
                "address": "7 River Rd",
                "owner": ["alice", "bob", "carol"],
                "isActive": true
            })
            .to_string(),
        )
    })?;
    println!("plot-7 registered to alice, bob, carol");

    step("Mint 100 shares against it");
    store.invoke(&tx(), Utc::now(), |inv| {
        registry.dispatch(
            inv,
            "MintToken",
            &json!({
                "id": "tkn-1",
                "docType": "TOKEN",
                "name": "Riverside Shares",
                "symbol": "RVS",
                "assetId": "plot-7",
                "totalToken": 100,
                "reserveToken": 0,
                "pricePerToken": 9.5
            })
            .to_string(),
        )
    })?;
    println!("75 reserved, 25 distributed in owner order");
    for owner in ["alice", "bob", "carol"] {
        let balance = store.invoke(&tx(), Utc::now(), |inv| {
            registry.dispatch(
                inv,
                "BalanceOf",
                &json!({"owner": owner, "tokenId": "tkn-1"}).to_string(),
            )
        })?;
        println!("  {owner:<6} {balance}");
    }

    step("Carol sends 5 shares to dave");
    let transfer_tx = tx();
    store.invoke(&transfer_tx, Utc::now(), |inv| {
        registry.dispatch(
            inv,
            "TransferToken",
            &json!({
                "tokenId": "tkn-1",
                "sender": "carol",
                "receiver": "dave",
                "amount": 5
            })
            .to_string(),
        )
    })?;
    println!("audit record written under {DIM}{transfer_tx}{RESET}");

    step("Bob burns 6 shares");
    store.invoke(&tx(), Utc::now(), |inv| {
        registry.dispatch(
            inv,
            "BurnToken",
            &json!({"tokenId": "tkn-1", "owner": "bob", "amount": 6}).to_string(),
        )
    })?;

    step("Where the supply stands");
    for owner in ["alice", "bob", "carol", "dave"] {
        let balance = store.invoke(&tx(), Utc::now(), |inv| {
            registry.dispatch(
                inv,
                "BalanceOf",
                &json!({"owner": owner, "tokenId": "tkn-1"}).to_string(),
            )
        })?;
        println!("  {owner:<6} {balance}");
    }

    step("Carol's balance history, straight from the version log");
    let history = store.invoke(&tx(), Utc::now(), |inv| {
        registry.dispatch(
            inv,
            "GetOwnerHistory",
            &json!({"id": "tkn-1", "owner": "carol"}).to_string(),
        )
    })?;
    for entry in history.as_array().into_iter().flatten() {
        let balance = entry["record"]["balance"].clone();
        let deleted = entry["isDelete"].as_bool().unwrap_or(false);
        println!(
            "  tx {DIM}{}{RESET}  balance {}  deleted {}",
            entry["txId"], balance, deleted
        );
    }

    println!();
    println!("{BOLD}Done.{RESET} Value conserved, arithmetic checked, history intact.");
    Ok(())
}
