//! # Owner Balance Ledger
//!
//! The core accounting primitive. Every balance mutation in the system
//! flows through exactly two operations, [`debit`] and [`credit`], both
//! expressed as pure functions over an [`OwnerBalance`] value: they take
//! the record, return the updated record (or a prune decision), and leave
//! the single side-effecting write to [`apply_debit`] / [`apply_credit`].
//! That split keeps the read-modify-write step a testable computation.
//!
//! Rules enforced here:
//!
//! - A balance is never negative. A debit larger than the balance fails
//!   with an insufficient-balance error before any arithmetic happens.
//! - All arithmetic is checked. Overflow is fatal; it signals corrupted
//!   invariants, not bad user input.
//! - A balance that reaches exactly zero is pruned: the record is deleted
//!   so the owner index only lists active holders. A pruned balance reads
//!   as not-found afterwards, not as zero.

use crate::entity::OwnerBalance;
use crate::error::{LedgerError, LedgerResult};
use crate::keys::{self, Index};
use crate::store::{decode_entity, EntityStore, StateStore};

// ---------------------------------------------------------------------------
// Checked arithmetic
// ---------------------------------------------------------------------------

fn checked_add(lhs: i64, rhs: i64) -> LedgerResult<i64> {
    lhs.checked_add(rhs)
        .ok_or(LedgerError::ArithmeticOverflow { op: "+", lhs, rhs })
}

fn checked_sub(lhs: i64, rhs: i64) -> LedgerResult<i64> {
    lhs.checked_sub(rhs)
        .ok_or(LedgerError::ArithmeticOverflow { op: "-", lhs, rhs })
}

// ---------------------------------------------------------------------------
// Pure transitions
// ---------------------------------------------------------------------------

/// Outcome of a debit: either an updated record to persist, or a prune
/// decision carrying the drained record so the caller can address its key.
#[derive(Debug, Clone, PartialEq)]
pub enum Debited {
    Updated(OwnerBalance),
    Pruned(OwnerBalance),
}

/// Subtracts `amount` from the record's balance.
pub fn debit(record: OwnerBalance, amount: i64) -> LedgerResult<Debited> {
    if amount < 0 {
        return Err(LedgerError::Validation(format!(
            "debit amount must be non-negative, got {amount}"
        )));
    }
    if amount > record.balance {
        return Err(LedgerError::InsufficientBalance {
            available: record.balance,
            requested: amount,
        });
    }
    let remaining = checked_sub(record.balance, amount)?;
    let updated = OwnerBalance {
        balance: remaining,
        ..record
    };
    if remaining == 0 {
        Ok(Debited::Pruned(updated))
    } else {
        Ok(Debited::Updated(updated))
    }
}

/// Adds `amount` to the record's balance.
pub fn credit(record: OwnerBalance, amount: i64) -> LedgerResult<OwnerBalance> {
    if amount < 0 {
        return Err(LedgerError::Validation(format!(
            "credit amount must be non-negative, got {amount}"
        )));
    }
    let balance = checked_add(record.balance, amount)?;
    Ok(OwnerBalance { balance, ..record })
}

// ---------------------------------------------------------------------------
// Write-through
// ---------------------------------------------------------------------------

/// Debits `amount` and persists the outcome: the updated record, or a
/// deletion when the balance drained to exactly zero.
pub fn apply_debit<S: StateStore + ?Sized>(
    store: &mut S,
    record: OwnerBalance,
    amount: i64,
) -> LedgerResult<()> {
    match debit(record, amount)? {
        Debited::Updated(updated) => store.put_owner_balance(&updated),
        Debited::Pruned(drained) => store.delete_owner_balance(&drained.id, &drained.parent_id),
    }
}

/// Credits `amount` and persists the updated record. Pass a fresh
/// [`OwnerBalance::ownership_of`] record when the owner had no prior
/// balance under this parent.
pub fn apply_credit<S: StateStore + ?Sized>(
    store: &mut S,
    record: OwnerBalance,
    amount: i64,
) -> LedgerResult<()> {
    let updated = credit(record, amount)?;
    store.put_owner_balance(&updated)
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// The balance an owner holds in a token.
///
/// A record pruned at zero reads as not-found, never as zero.
pub fn balance_of<S: StateStore + ?Sized>(
    store: &S,
    owner_id: &str,
    token_id: &str,
) -> LedgerResult<i64> {
    match store.get_owner_balance(owner_id, token_id)? {
        Some(record) => Ok(record.balance),
        None => Err(LedgerError::NotFound(format!(
            "owner details not found for owner {owner_id} and token {token_id}"
        ))),
    }
}

/// Every holding record of one owner, across assets and tokens, via a
/// prefix scan of the owner index by the owner segment alone.
pub fn owner_holdings<S: StateStore + ?Sized>(
    store: &S,
    owner_id: &str,
) -> LedgerResult<Vec<OwnerBalance>> {
    let prefix = keys::prefix_key(Index::Owner, &[owner_id])?;
    let mut holdings = Vec::new();
    for entry in store.scan_prefix(&prefix)? {
        let (key, bytes) = entry?;
        holdings.push(decode_entity(&key, &bytes)?);
    }
    Ok(holdings)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
