//! # Store Layer
//!
//! Two things live here: the [`StateStore`] trait, which is the ledger
//! core's entire view of the externally supplied versioned key-value
//! store, and the typed [`EntityStore`] adapter that every higher module
//! goes through instead of touching raw bytes.
//!
//! One `StateStore` instance corresponds to one host invocation. The host
//! guarantees all-or-nothing visibility for the writes of an invocation;
//! the core's side of that contract is to read every key before mutating
//! it and to never retain state between invocations outside the store.
//!
//! Range and history results are lazy boxed iterators borrowing the
//! store, so the underlying resources are released by `Drop` on every
//! exit path, early returns and errors included.
//!
//! The [`db`](crate::store::db) submodule provides the sled-backed
//! reference implementation used by tests and the demo.

pub mod db;

use chrono::{DateTime, Utc};

use crate::entity::{Asset, OwnerBalance, Token, TransactionRecord};
use crate::error::{LedgerError, LedgerResult};
use crate::keys;

// ---------------------------------------------------------------------------
// Version log
// ---------------------------------------------------------------------------

/// One entry of a key's immutable version log.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyVersion {
    /// Transaction that wrote this version.
    pub tx_id: String,
    /// The bytes written, or `None` when the version is a deletion.
    pub value: Option<Vec<u8>>,
    /// Host commit timestamp of the writing transaction.
    pub timestamp: DateTime<Utc>,
    /// Whether this version deleted the key.
    pub is_delete: bool,
}

/// Lazy sequence of `(key, value)` pairs from a prefix scan.
pub type KvIter<'a> = Box<dyn Iterator<Item = LedgerResult<(String, Vec<u8>)>> + 'a>;

/// Lazy sequence of a key's versions, oldest first.
pub type VersionIter<'a> = Box<dyn Iterator<Item = LedgerResult<KeyVersion>> + 'a>;

// ---------------------------------------------------------------------------
// StateStore
// ---------------------------------------------------------------------------

/// The external versioned key-value store, scoped to one invocation.
pub trait StateStore {
    /// The host-assigned id of the current transaction.
    fn tx_id(&self) -> &str;

    /// Current value under `key`, if any. Reads observe writes buffered
    /// earlier in the same invocation.
    fn get(&self, key: &str) -> LedgerResult<Option<Vec<u8>>>;

    /// Stages a write of `value` under `key`.
    fn put(&mut self, key: &str, value: Vec<u8>) -> LedgerResult<()>;

    /// Stages a deletion of `key`.
    fn delete(&mut self, key: &str) -> LedgerResult<()>;

    /// All current `(key, value)` pairs whose key starts with `prefix`,
    /// in key order.
    fn scan_prefix(&self, prefix: &str) -> LedgerResult<KvIter<'_>>;

    /// The committed version log of `key`, oldest first. Writes staged in
    /// the current invocation are not part of history until they commit.
    fn history(&self, key: &str) -> LedgerResult<VersionIter<'_>>;
}

// ---------------------------------------------------------------------------
// Typed entity adapter
// ---------------------------------------------------------------------------

fn encode<T: serde::Serialize>(entity: &T) -> LedgerResult<Vec<u8>> {
    serde_json::to_vec(entity).map_err(|err| LedgerError::Store(err.to_string()))
}

/// Decodes stored bytes, surfacing failure as corruption rather than a
/// business error.
pub fn decode_entity<T: serde::de::DeserializeOwned>(key: &str, bytes: &[u8]) -> LedgerResult<T> {
    serde_json::from_slice(bytes).map_err(|err| LedgerError::Deserialization {
        key: key.to_string(),
        detail: err.to_string(),
    })
}

/// Typed read/write helpers over any [`StateStore`].
///
/// This is the only place entity bytes are produced or consumed; business
/// modules never see serialized forms.
pub trait EntityStore: StateStore {
    fn get_asset(&self, asset_id: &str) -> LedgerResult<Option<Asset>> {
        let key = keys::asset_key(asset_id)?;
        match self.get(&key)? {
            Some(bytes) => Ok(Some(decode_entity(&key, &bytes)?)),
            None => Ok(None),
        }
    }

    fn put_asset(&mut self, asset: &Asset) -> LedgerResult<()> {
        let key = keys::asset_key(&asset.id)?;
        self.put(&key, encode(asset)?)
    }

    fn delete_asset(&mut self, asset_id: &str) -> LedgerResult<()> {
        let key = keys::asset_key(asset_id)?;
        self.delete(&key)
    }

    fn get_token(&self, token_id: &str) -> LedgerResult<Option<Token>> {
        let key = keys::token_key(token_id)?;
        match self.get(&key)? {
            Some(bytes) => Ok(Some(decode_entity(&key, &bytes)?)),
            None => Ok(None),
        }
    }

    fn put_token(&mut self, token: &Token) -> LedgerResult<()> {
        let key = keys::token_key(&token.id)?;
        self.put(&key, encode(token)?)
    }

    fn get_owner_balance(
        &self,
        owner_id: &str,
        parent_id: &str,
    ) -> LedgerResult<Option<OwnerBalance>> {
        let key = keys::owner_key(owner_id, parent_id)?;
        match self.get(&key)? {
            Some(bytes) => Ok(Some(decode_entity(&key, &bytes)?)),
            None => Ok(None),
        }
    }

    fn put_owner_balance(&mut self, record: &OwnerBalance) -> LedgerResult<()> {
        let key = keys::owner_key(&record.id, &record.parent_id)?;
        self.put(&key, encode(record)?)
    }

    fn delete_owner_balance(&mut self, owner_id: &str, parent_id: &str) -> LedgerResult<()> {
        let key = keys::owner_key(owner_id, parent_id)?;
        self.delete(&key)
    }

    /// Writes the audit record under its bare transaction id. Audit keys
    /// deliberately live outside every composite index namespace.
    fn put_transaction_record(&mut self, record: &TransactionRecord) -> LedgerResult<()> {
        let key = record.id.clone();
        self.put(&key, encode(record)?)
    }
}

impl<S: StateStore + ?Sized> EntityStore for S {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
