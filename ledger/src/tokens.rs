//! # Token Issuance Engine
//!
//! Minting fungible tokens against a registered asset. A mint fixes the
//! token's supply split: `reserve_token` is held back (defaulting to 75%
//! of total when the input leaves it at zero) and the remaining
//! `available_token` is distributed across the asset's owners, in owner
//! list order, with the integer-division remainder assigned to the final
//! owner so not a single unit is lost to rounding.
//!
//! `available_token + reserve_token == total_token` holds on every token
//! this module writes.

use tracing::{debug, warn};

use crate::assets;
use crate::config::{LedgerConfig, ReservePolicy, BPS_DENOMINATOR, DEFAULT_RESERVE_BPS, RESERVE_CAP_BPS};
use crate::entity::{DocType, OwnerBalance, Token};
use crate::error::{LedgerError, LedgerResult};
use crate::store::{EntityStore, StateStore};

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_token_input(input: &Token) -> LedgerResult<()> {
    if input.id.trim().is_empty() {
        return Err(LedgerError::Validation(
            "token id must not be empty".to_string(),
        ));
    }
    if input.name.trim().is_empty() {
        return Err(LedgerError::Validation(
            "token name must not be empty".to_string(),
        ));
    }
    if input.symbol.trim().is_empty() {
        return Err(LedgerError::Validation(
            "token symbol must not be empty".to_string(),
        ));
    }
    if input.doc_type != DocType::Token {
        return Err(LedgerError::Validation(format!(
            "doc type for a token must be \"TOKEN\", got \"{}\"",
            input.doc_type
        )));
    }
    if input.total_token <= 0 {
        return Err(LedgerError::Validation(format!(
            "total token count must be positive, got {}",
            input.total_token
        )));
    }
    if input.reserve_token < 0 {
        return Err(LedgerError::Validation(format!(
            "reserve token count must not be negative, got {}",
            input.reserve_token
        )));
    }
    if !(input.price_per_token > 0.0) {
        return Err(LedgerError::Validation(format!(
            "price per token must be positive, got {}",
            input.price_per_token
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Supply split
// ---------------------------------------------------------------------------

fn default_reserve(total: i64) -> i64 {
    (total as i128 * DEFAULT_RESERVE_BPS as i128 / BPS_DENOMINATOR as i128) as i64
}

fn exceeds_reserve_cap(reserve: i64, total: i64) -> bool {
    reserve as i128 * BPS_DENOMINATOR as i128 > total as i128 * RESERVE_CAP_BPS as i128
}

/// Splits `available` across `owner_count` holders: equal integer shares,
/// remainder on the trailing owner. The shares always sum to `available`.
fn distribute(available: i64, owner_count: usize) -> Vec<i64> {
    let n = owner_count as i64;
    let per_owner = available / n;
    let mut shares = vec![per_owner; owner_count];
    if let Some(last) = shares.last_mut() {
        *last = available - per_owner * (n - 1);
    }
    shares
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Mints a token against an existing asset and distributes the available
/// supply across the asset's owners.
///
/// # Errors
///
/// Validation error on malformed input or (under
/// [`ReservePolicy::Enforced`]) a reserve above the 75% cap; conflict on
/// a duplicate token id; not-found when the referenced asset is absent.
/// Nothing is written on failure.
pub fn mint_token<S: StateStore + ?Sized>(
    store: &mut S,
    config: &LedgerConfig,
    input: Token,
) -> LedgerResult<()> {
    validate_token_input(&input)?;

    if store.get_token(&input.id)?.is_some() {
        return Err(LedgerError::Conflict("token", input.id));
    }

    let asset = assets::query_asset(store, &input.asset_id)?;
    if asset.owner.is_empty() {
        return Err(LedgerError::Validation(format!(
            "asset {} has no owners to distribute to",
            asset.id
        )));
    }

    let mut token = input;
    token.owner = asset.owner;

    if token.reserve_token == 0 {
        token.reserve_token = default_reserve(token.total_token);
    }
    if token.reserve_token > token.total_token {
        return Err(LedgerError::Validation(format!(
            "reserve token count {} exceeds total supply {}",
            token.reserve_token, token.total_token
        )));
    }
    if exceeds_reserve_cap(token.reserve_token, token.total_token) {
        match config.reserve_policy {
            ReservePolicy::Enforced => {
                return Err(LedgerError::Validation(format!(
                    "reserve token count {} exceeds 75% of total supply {}",
                    token.reserve_token, token.total_token
                )));
            }
            ReservePolicy::Advisory => {
                warn!(
                    token_id = %token.id,
                    reserve = token.reserve_token,
                    total = token.total_token,
                    "reserved tokens exceed 75% of total supply"
                );
            }
        }
    }

    token.available_token = token
        .total_token
        .checked_sub(token.reserve_token)
        .ok_or(LedgerError::ArithmeticOverflow {
            op: "-",
            lhs: token.total_token,
            rhs: token.reserve_token,
        })?;

    debug!(
        token_id = %token.id,
        asset_id = %token.asset_id,
        total = token.total_token,
        reserve = token.reserve_token,
        available = token.available_token,
        "minting token"
    );
    store.put_token(&token)?;

    let shares = distribute(token.available_token, token.owner.len());
    for (owner, share) in token.owner.iter().zip(shares) {
        let record = OwnerBalance::with_balance(owner, &token.id, DocType::Token, share);
        store.put_owner_balance(&record)?;
    }
    Ok(())
}

/// Looks up a token by id.
pub fn query_token<S: StateStore + ?Sized>(store: &S, token_id: &str) -> LedgerResult<Token> {
    store
        .get_token(token_id)?
        .ok_or_else(|| LedgerError::NotFound(format!("token not found with id: {token_id}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::create_asset;
    use crate::entity::Asset;
    use crate::error::ErrorKind;
    use crate::store::db::SledStore;
    use chrono::Utc;

    fn asset(id: &str, owners: &[&str]) -> Asset {
        Asset {
            id: id.to_string(),
            doc_type: DocType::Asset,
            desc: String::new(),
            name: id.to_string(),
            address: String::new(),
            owner: owners.iter().map(|o| o.to_string()).collect(),
            is_active: true,
        }
    }

    fn token_input(id: &str, asset_id: &str, total: i64, reserve: i64) -> Token {
        Token {
            id: id.to_string(),
            doc_type: DocType::Token,
            name: format!("{id} shares"),
            symbol: "TST".into(),
            asset_id: asset_id.to_string(),
            total_token: total,
            available_token: 0,
            reserve_token: reserve,
            owner: Vec::new(),
            price_per_token: 2.5,
        }
    }

    fn store_with_asset(owners: &[&str]) -> SledStore {
        let store = SledStore::open_temporary().unwrap();
        store
            .invoke("tx-asset", Utc::now(), |inv| {
                create_asset(inv, asset("plot-7", owners))
            })
            .unwrap();
        store
    }

    #[test]
    fn distribute_splits_evenly_with_trailing_remainder() {
        assert_eq!(distribute(25, 3), vec![8, 8, 9]);
        assert_eq!(distribute(25, 1), vec![25]);
        assert_eq!(distribute(24, 3), vec![8, 8, 8]);
        assert_eq!(distribute(2, 4), vec![0, 0, 0, 2]);
        assert_eq!(distribute(0, 2), vec![0, 0]);
    }

    #[test]
    fn distribute_never_loses_units() {
        for available in 0..50 {
            for owners in 1..7 {
                let shares = distribute(available, owners);
                assert_eq!(shares.iter().sum::<i64>(), available);
                assert!(shares.iter().all(|&s| s >= 0));
            }
        }
    }

    #[test]
    fn mint_splits_supply_and_seeds_balances() {
        // The canonical scenario: 100 total, default reserve, 3 owners.
        let store = store_with_asset(&["alice", "bob", "carol"]);
        store
            .invoke("tx-mint", Utc::now(), |inv| {
                mint_token(
                    inv,
                    &LedgerConfig::default(),
                    token_input("tkn-1", "plot-7", 100, 0),
                )
            })
            .unwrap();

        store
            .invoke("tx-check", Utc::now(), |inv| {
                let token = query_token(inv, "tkn-1")?;
                assert_eq!(token.reserve_token, 75);
                assert_eq!(token.available_token, 25);
                assert_eq!(token.available_token + token.reserve_token, token.total_token);
                assert_eq!(token.owner, vec!["alice", "bob", "carol"]);

                let balances = [
                    inv.get_owner_balance("alice", "tkn-1")?.unwrap().balance,
                    inv.get_owner_balance("bob", "tkn-1")?.unwrap().balance,
                    inv.get_owner_balance("carol", "tkn-1")?.unwrap().balance,
                ];
                assert_eq!(balances, [8, 8, 9]);
                assert_eq!(balances.iter().sum::<i64>(), token.available_token);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn mint_with_explicit_reserve() {
        let store = store_with_asset(&["alice"]);
        store
            .invoke("tx-mint", Utc::now(), |inv| {
                mint_token(
                    inv,
                    &LedgerConfig::default(),
                    token_input("tkn-1", "plot-7", 100, 40),
                )
            })
            .unwrap();

        let token = store
            .invoke("tx-check", Utc::now(), |inv| query_token(inv, "tkn-1"))
            .unwrap();
        assert_eq!(token.reserve_token, 40);
        assert_eq!(token.available_token, 60);
    }

    #[test]
    fn duplicate_token_id_conflicts() {
        let store = store_with_asset(&["alice"]);
        store
            .invoke("tx-1", Utc::now(), |inv| {
                mint_token(
                    inv,
                    &LedgerConfig::default(),
                    token_input("tkn-1", "plot-7", 100, 0),
                )
            })
            .unwrap();

        let err = store
            .invoke("tx-2", Utc::now(), |inv| {
                mint_token(
                    inv,
                    &LedgerConfig::default(),
                    token_input("tkn-1", "plot-7", 50, 0),
                )
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn mint_against_missing_asset_not_found() {
        let store = SledStore::open_temporary().unwrap();
        let err = store
            .invoke("tx-1", Utc::now(), |inv| {
                mint_token(
                    inv,
                    &LedgerConfig::default(),
                    token_input("tkn-1", "ghost", 100, 0),
                )
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn mint_rejects_bad_numbers() {
        let store = store_with_asset(&["alice"]);
        for input in [
            token_input("tkn-1", "plot-7", 0, 0),
            token_input("tkn-1", "plot-7", -5, 0),
            token_input("tkn-1", "plot-7", 100, -1),
        ] {
            let err = store
                .invoke("tx-1", Utc::now(), |inv| {
                    mint_token(inv, &LedgerConfig::default(), input.clone())
                })
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }

        let mut free = token_input("tkn-1", "plot-7", 100, 0);
        free.price_per_token = 0.0;
        let err = store
            .invoke("tx-1", Utc::now(), |inv| {
                mint_token(inv, &LedgerConfig::default(), free.clone())
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn advisory_policy_accepts_over_reservation() {
        let store = store_with_asset(&["alice"]);
        store
            .invoke("tx-1", Utc::now(), |inv| {
                mint_token(
                    inv,
                    &LedgerConfig::default(),
                    token_input("tkn-1", "plot-7", 100, 90),
                )
            })
            .unwrap();

        let token = store
            .invoke("tx-2", Utc::now(), |inv| query_token(inv, "tkn-1"))
            .unwrap();
        assert_eq!(token.reserve_token, 90);
        assert_eq!(token.available_token, 10);
    }

    #[test]
    fn enforced_policy_rejects_over_reservation() {
        let store = store_with_asset(&["alice"]);
        let err = store
            .invoke("tx-1", Utc::now(), |inv| {
                mint_token(
                    inv,
                    &LedgerConfig::enforced(),
                    token_input("tkn-1", "plot-7", 100, 90),
                )
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        // At the cap is still fine.
        store
            .invoke("tx-2", Utc::now(), |inv| {
                mint_token(
                    inv,
                    &LedgerConfig::enforced(),
                    token_input("tkn-1", "plot-7", 100, 75),
                )
            })
            .unwrap();
    }

    #[test]
    fn reserve_above_total_rejected() {
        let store = store_with_asset(&["alice"]);
        let err = store
            .invoke("tx-1", Utc::now(), |inv| {
                mint_token(
                    inv,
                    &LedgerConfig::default(),
                    token_input("tkn-1", "plot-7", 100, 101),
                )
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn failed_mint_writes_nothing() {
        let store = store_with_asset(&["alice"]);
        // Conflict raised after the asset lookup must leave no token record.
        let _ = store.invoke("tx-1", Utc::now(), |inv| {
            mint_token(
                inv,
                &LedgerConfig::enforced(),
                token_input("tkn-1", "plot-7", 100, 90),
            )
        });

        let err = store
            .invoke("tx-2", Utc::now(), |inv| query_token(inv, "tkn-1"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
