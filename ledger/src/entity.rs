//! # Entity Records
//!
//! The four record shapes the ledger persists, plus the closed tag enums
//! that couple each record to its index namespace. Records serialize as
//! JSON with the wire-stable camelCase field names; what is written today
//! must deserialize forever, so field renames are off the table.
//!
//! Doc types are a closed enum rather than free-form strings: the decode
//! path for stored bytes is selected by [`DocType`] variant, which keeps
//! a record's index namespace and payload schema statically coupled and
//! makes typo-class bugs unrepresentable.

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

// ---------------------------------------------------------------------------
// DocType
// ---------------------------------------------------------------------------

/// Tag identifying which entity schema a stored record follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocType {
    #[serde(rename = "ASSET")]
    Asset,
    #[serde(rename = "TOKEN")]
    Token,
    #[serde(rename = "OWNER")]
    Owner,
}

impl DocType {
    /// The wire-stable tag string.
    pub fn tag(self) -> &'static str {
        match self {
            DocType::Asset => "ASSET",
            DocType::Token => "TOKEN",
            DocType::Owner => "OWNER",
        }
    }
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Tag identifying the kind of an audit transaction record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxKind {
    #[serde(rename = "TRANSFER")]
    Transfer,
    #[serde(rename = "BURN")]
    Burn,
}

// ---------------------------------------------------------------------------
// Asset
// ---------------------------------------------------------------------------

/// A registered physical or abstract asset and its current owner set.
///
/// Created once; the owner set may later be replaced wholesale by an
/// asset transfer. Never physically deleted except inside the transfer's
/// delete-then-reinsert of the same key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    /// Caller-assigned, globally unique within the asset namespace.
    pub id: String,
    /// Always [`DocType::Asset`]; validated on input.
    pub doc_type: DocType,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    /// Ordered owner ids. Order matters: mint distribution follows it.
    pub owner: Vec<String>,
    #[serde(default)]
    pub is_active: bool,
}

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// A fungible token minted against a registered asset.
///
/// `available_token + reserve_token == total_token` holds at mint; burn
/// decreases `available_token` and `total_token` by the same amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub id: String,
    /// Always [`DocType::Token`]; validated on input.
    pub doc_type: DocType,
    pub name: String,
    pub symbol: String,
    /// The asset this token is minted against. Must exist at mint time.
    pub asset_id: String,
    /// Currently minted supply. Strictly positive at mint.
    pub total_token: i64,
    /// Unreserved, distributable supply.
    #[serde(default)]
    pub available_token: i64,
    /// Supply held back from initial distribution.
    #[serde(default)]
    pub reserve_token: i64,
    /// Copied from the referenced asset's owner set at mint time.
    #[serde(default)]
    pub owner: Vec<String>,
    pub price_per_token: f64,
}

// ---------------------------------------------------------------------------
// OwnerBalance
// ---------------------------------------------------------------------------

/// A per-(owner, parent) holding record, where the parent is an asset or
/// a token.
///
/// Asset parents carry ownership only (balance 0). Token parents carry a
/// strictly non-negative balance; a balance that reaches exactly zero is
/// pruned from the store rather than retained, so the owner index only
/// ever lists active holders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerBalance {
    /// The owner id.
    pub id: String,
    /// Always [`DocType::Owner`].
    pub doc_type: DocType,
    /// Asset id or token id this record is held against.
    pub parent_id: String,
    /// Which namespace `parent_id` lives in.
    pub parent_doc_type: DocType,
    #[serde(default)]
    pub balance: i64,
}

impl OwnerBalance {
    /// A zero-balance record marking ownership under the given parent.
    pub fn ownership_of(owner_id: &str, parent_id: &str, parent_doc_type: DocType) -> Self {
        Self::with_balance(owner_id, parent_id, parent_doc_type, 0)
    }

    /// A record carrying an explicit balance.
    pub fn with_balance(
        owner_id: &str,
        parent_id: &str,
        parent_doc_type: DocType,
        balance: i64,
    ) -> Self {
        Self {
            id: owner_id.to_string(),
            doc_type: DocType::Owner,
            parent_id: parent_id.to_string(),
            parent_doc_type,
            balance,
        }
    }
}

// ---------------------------------------------------------------------------
// TransactionRecord
// ---------------------------------------------------------------------------

/// Immutable audit record of one value-moving operation.
///
/// Keyed by the host-assigned transaction id, written exactly once and
/// never updated. Transfers carry sender/receiver, burns carry the
/// burner; the unused fields are omitted from the serialized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Host-assigned transaction id.
    pub id: String,
    pub doc_type: TxKind,
    pub token_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_burner: Option<String>,
    pub amount: i64,
}

impl TransactionRecord {
    /// Audit record for a token transfer.
    pub fn transfer(tx_id: &str, token_id: &str, sender: &str, receiver: &str, amount: i64) -> Self {
        Self {
            id: tx_id.to_string(),
            doc_type: TxKind::Transfer,
            token_id: token_id.to_string(),
            sender: Some(sender.to_string()),
            receiver: Some(receiver.to_string()),
            token_burner: None,
            amount,
        }
    }

    /// Audit record for a token burn.
    pub fn burn(tx_id: &str, token_id: &str, burner: &str, amount: i64) -> Self {
        Self {
            id: tx_id.to_string(),
            doc_type: TxKind::Burn,
            token_id: token_id.to_string(),
            sender: None,
            receiver: None,
            token_burner: Some(burner.to_string()),
            amount,
        }
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// A decoded entity of any doc type. One decode path per variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Record {
    Asset(Asset),
    Token(Token),
    Owner(OwnerBalance),
}

impl Record {
    /// Decodes stored bytes through the schema selected by `doc_type`.
    ///
    /// A failure here is a corruption error, never a business error: the
    /// bytes were written by this ledger and must match the schema.
    pub fn decode(doc_type: DocType, key: &str, bytes: &[u8]) -> LedgerResult<Record> {
        let corrupt = |err: serde_json::Error| LedgerError::Deserialization {
            key: key.to_string(),
            detail: err.to_string(),
        };
        match doc_type {
            DocType::Asset => serde_json::from_slice(bytes).map(Record::Asset).map_err(corrupt),
            DocType::Token => serde_json::from_slice(bytes).map(Record::Token).map_err(corrupt),
            DocType::Owner => serde_json::from_slice(bytes).map(Record::Owner).map_err(corrupt),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
