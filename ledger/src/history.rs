//! # History Reconstructor
//!
//! Replays a key's immutable version log into a chronological sequence of
//! typed snapshots. Each version becomes one [`HistoryEntry`]: the entity
//! decoded through the schema its doc type selects, unless the version is
//! a deletion, in which case the snapshot is absent and only the marker
//! remains. Transaction ids and timestamps are carried through verbatim
//! from the store.
//!
//! This is a pure read path. Nothing here writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{DocType, Record};
use crate::error::{LedgerError, LedgerResult};
use crate::keys;
use crate::store::StateStore;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One reconstructed point-in-time state of a key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// The entity as of this version; `None` when the version deleted
    /// the key.
    pub record: Option<Record>,
    /// Transaction that wrote the version.
    pub tx_id: String,
    /// Host commit timestamp of that transaction.
    pub timestamp: DateTime<Utc>,
    pub is_delete: bool,
}

/// Input for a history query over any entity key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetHistoryRequest {
    /// Asset id, token id, or (for the OWNER doc type) the parent id.
    pub id: String,
    pub doc_type: DocType,
    /// Owner id; required when `doc_type` is OWNER, ignored otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

/// Input for a history query over one owner balance record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetOwnerHistoryRequest {
    /// The parent id (asset or token) the balance is held against.
    pub id: String,
    pub owner: String,
}

// ---------------------------------------------------------------------------
// Reconstruction
// ---------------------------------------------------------------------------

fn replay<S: StateStore + ?Sized>(
    store: &S,
    key: &str,
    doc_type: DocType,
) -> LedgerResult<Vec<HistoryEntry>> {
    let mut entries = Vec::new();
    for version in store.history(key)? {
        let version = version?;
        let record = match (&version.value, version.is_delete) {
            (Some(bytes), false) => Some(Record::decode(doc_type, key, bytes)?),
            _ => None,
        };
        entries.push(HistoryEntry {
            record,
            tx_id: version.tx_id,
            timestamp: version.timestamp,
            is_delete: version.is_delete,
        });
    }
    Ok(entries)
}

/// The full version history of an asset, token, or owner balance record,
/// oldest first. A key that was never written yields an empty sequence.
pub fn get_history<S: StateStore + ?Sized>(
    store: &S,
    request: &GetHistoryRequest,
) -> LedgerResult<Vec<HistoryEntry>> {
    let key = match request.doc_type {
        DocType::Asset => keys::asset_key(&request.id)?,
        DocType::Token => keys::token_key(&request.id)?,
        DocType::Owner => {
            let owner = request.owner.as_deref().filter(|o| !o.trim().is_empty()).ok_or_else(
                || {
                    LedgerError::Validation(
                        "owner is required for OWNER doc type history".to_string(),
                    )
                },
            )?;
            keys::owner_key(owner, &request.id)?
        }
    };
    replay(store, &key, request.doc_type)
}

/// The version history of one (owner, parent) balance record.
pub fn get_owner_history<S: StateStore + ?Sized>(
    store: &S,
    request: &GetOwnerHistoryRequest,
) -> LedgerResult<Vec<HistoryEntry>> {
    let key = keys::owner_key(&request.owner, &request.id)?;
    replay(store, &key, DocType::Owner)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
