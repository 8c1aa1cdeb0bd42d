//! # Transfer & Burn Engine
//!
//! The multi-record state transitions: moving token balance between
//! owners, replacing an asset's owner set, and burning supply out of
//! existence. Every value-moving operation writes exactly one immutable
//! audit record under the host transaction id before the balances move.
//!
//! Conservation is the contract here. A transfer changes who holds value,
//! never how much exists; a burn destroys exactly the requested amount
//! from both the burner's balance and the token's supply counters.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::assets;
use crate::balances::{apply_credit, apply_debit};
use crate::entity::{DocType, OwnerBalance, TransactionRecord};
use crate::error::{LedgerError, LedgerResult};
use crate::store::{EntityStore, StateStore};
use crate::tokens::query_token;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Input for a token transfer between two owners.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferTokenRequest {
    pub token_id: String,
    pub sender: String,
    pub receiver: String,
    pub amount: i64,
}

/// Input for a wholesale asset ownership transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferAssetRequest {
    pub asset_id: String,
    pub new_owners: Vec<String>,
}

/// Input for burning tokens out of an owner's balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnTokenRequest {
    pub token_id: String,
    pub owner: String,
    pub amount: i64,
}

fn validate_amount(amount: i64) -> LedgerResult<()> {
    if amount <= 0 {
        return Err(LedgerError::Validation(format!(
            "amount must be positive, got {amount}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Token transfer
// ---------------------------------------------------------------------------

/// Moves `amount` of a token from sender to receiver.
///
/// The receiver does not need an existing balance record; one is
/// synthesized at zero and credited. The sender must hold a record: an
/// owner whose balance was pruned at zero reads as absent and is
/// rejected, the same as an owner who never held the token.
pub fn transfer_token<S: StateStore + ?Sized>(
    store: &mut S,
    request: &TransferTokenRequest,
) -> LedgerResult<()> {
    validate_amount(request.amount)?;
    if request.sender == request.receiver {
        // Debit and credit would collapse onto one key, and the later
        // write would erase the earlier one.
        return Err(LedgerError::Validation(
            "sender and receiver must differ".to_string(),
        ));
    }

    query_token(store, &request.token_id)?;

    let sender = store
        .get_owner_balance(&request.sender, &request.token_id)?
        .ok_or_else(|| {
            LedgerError::NotFound(format!(
                "sender details not found for token: {}",
                request.token_id
            ))
        })?;

    if sender.balance < request.amount {
        return Err(LedgerError::InsufficientBalance {
            available: sender.balance,
            requested: request.amount,
        });
    }

    let receiver = store
        .get_owner_balance(&request.receiver, &request.token_id)?
        .unwrap_or_else(|| {
            OwnerBalance::ownership_of(&request.receiver, &request.token_id, DocType::Token)
        });

    debug!(
        token_id = %request.token_id,
        sender = %request.sender,
        receiver = %request.receiver,
        amount = request.amount,
        "transferring token"
    );

    let tx_id = store.tx_id().to_string();
    let record = TransactionRecord::transfer(
        &tx_id,
        &request.token_id,
        &request.sender,
        &request.receiver,
        request.amount,
    );
    store.put_transaction_record(&record)?;

    apply_debit(store, sender, request.amount)?;
    apply_credit(store, receiver, request.amount)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Asset transfer
// ---------------------------------------------------------------------------

/// Replaces an asset's owner set wholesale.
///
/// The asset record is deleted and reinserted under the same key with the
/// new owner list, and the owner index is reconciled against the change:
/// ownership records of removed owners are pruned and zero-balance
/// records are seeded for added owners, so the index never attributes the
/// asset to someone no longer on it.
pub fn transfer_asset<S: StateStore + ?Sized>(
    store: &mut S,
    request: &TransferAssetRequest,
) -> LedgerResult<()> {
    if request.new_owners.is_empty() {
        return Err(LedgerError::Validation(
            "asset transfer must list at least one new owner".to_string(),
        ));
    }
    for (position, owner) in request.new_owners.iter().enumerate() {
        if owner.trim().is_empty() {
            return Err(LedgerError::Validation(format!(
                "new owner {} is empty",
                position + 1
            )));
        }
    }

    let asset = assets::query_asset(store, &request.asset_id)?;
    let previous_owners: BTreeSet<String> = asset.owner.iter().cloned().collect();
    let next_owners: BTreeSet<String> = request.new_owners.iter().cloned().collect();

    debug!(
        asset_id = %request.asset_id,
        from = ?previous_owners,
        to = ?next_owners,
        "transferring asset ownership"
    );

    store.delete_asset(&request.asset_id)?;
    let mut updated = asset;
    updated.owner = request.new_owners.clone();
    store.put_asset(&updated)?;

    for removed in previous_owners.difference(&next_owners) {
        store.delete_owner_balance(removed, &request.asset_id)?;
    }
    for added in next_owners.difference(&previous_owners) {
        let record = OwnerBalance::ownership_of(added, &request.asset_id, DocType::Asset);
        store.put_owner_balance(&record)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Burn
// ---------------------------------------------------------------------------

/// Destroys `amount` of a token from the owner's balance, reducing both
/// `available_token` and `total_token` by the same amount.
pub fn burn_token<S: StateStore + ?Sized>(
    store: &mut S,
    request: &BurnTokenRequest,
) -> LedgerResult<()> {
    validate_amount(request.amount)?;

    let mut token = query_token(store, &request.token_id)?;

    let owner = store
        .get_owner_balance(&request.owner, &request.token_id)?
        .ok_or_else(|| {
            LedgerError::NotFound(format!(
                "owner details not found for token: {}",
                request.token_id
            ))
        })?;

    debug!(
        token_id = %request.token_id,
        owner = %request.owner,
        amount = request.amount,
        "burning token"
    );

    apply_debit(store, owner, request.amount)?;

    if request.amount > token.available_token {
        return Err(LedgerError::InsufficientBalance {
            available: token.available_token,
            requested: request.amount,
        });
    }
    token.available_token -= request.amount;
    token.total_token -= request.amount;
    store.put_token(&token)?;

    let tx_id = store.tx_id().to_string();
    let record = TransactionRecord::burn(&tx_id, &request.token_id, &request.owner, request.amount);
    store.put_transaction_record(&record)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
