//! # Composite Key Codec
//!
//! Turns a flat key-value store into a set of queryable indexes. A
//! composite key concatenates an index name with an ordered list of string
//! segments, each terminated by a U+0000 delimiter:
//!
//! ```text
//! \0{index}\0{segment_1}\0{segment_2}\0
//! ```
//!
//! The leading delimiter keeps composite keys out of the plain-key space
//! (transaction records live under bare host tx ids), and the trailing
//! delimiter after every segment makes the encoding injective: no two
//! well-formed segment lists produce the same key, and a key built from a
//! leading subset of segments is a strict prefix of every key that extends
//! it. That prefix property is what makes range scans work, e.g. all
//! balance records of one owner by supplying only the owner segment.
//!
//! ## Index namespaces
//!
//! | Index                | Name              | Segments               |
//! |----------------------|-------------------|------------------------|
//! | [`Index::Owner`]     | `owner~id`        | (ownerId, parentId)    |
//! | [`Index::Asset`]     | `assetId~doctype` | (assetId, "ASSET")     |
//! | [`Index::Token`]     | `tokenId~doctype` | (tokenId, "TOKEN")     |
//!
//! The names are wire-stable; records written under them must remain
//! readable by every future version.
//!
//! Everything in this module is pure. No I/O, no store handle.

use crate::error::{LedgerError, LedgerResult};

/// Segment delimiter. U+0000 cannot appear in any well-formed segment.
const DELIMITER: char = '\u{0000}';

// ---------------------------------------------------------------------------
// Index
// ---------------------------------------------------------------------------

/// The closed set of index namespaces the ledger writes under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Index {
    /// Owner balance records, keyed (ownerId, parentId).
    Owner,
    /// Asset records, keyed (assetId, "ASSET").
    Asset,
    /// Token records, keyed (tokenId, "TOKEN").
    Token,
}

impl Index {
    /// The wire-stable index name.
    pub fn name(self) -> &'static str {
        match self {
            Index::Owner => "owner~id",
            Index::Asset => "assetId~doctype",
            Index::Token => "tokenId~doctype",
        }
    }
}

// ---------------------------------------------------------------------------
// Key construction
// ---------------------------------------------------------------------------

/// Builds the composite key for an index and a full, ordered segment list.
///
/// # Errors
///
/// Validation error if the segment list is empty or any segment contains
/// the internal delimiter (which would break injectivity).
pub fn composite_key(index: Index, segments: &[&str]) -> LedgerResult<String> {
    if segments.is_empty() {
        return Err(LedgerError::Validation(format!(
            "composite key for index {:?} needs at least one segment",
            index.name()
        )));
    }
    encode(index, segments)
}

/// Builds a scan prefix from a leading subset of an index's segments.
///
/// The result is a strict prefix of every composite key whose segment
/// list starts with `leading`. Passing no segments yields the prefix of
/// the whole index namespace.
pub fn prefix_key(index: Index, leading: &[&str]) -> LedgerResult<String> {
    encode(index, leading)
}

fn encode(index: Index, segments: &[&str]) -> LedgerResult<String> {
    let mut key = String::with_capacity(
        2 + index.name().len() + segments.iter().map(|s| s.len() + 1).sum::<usize>(),
    );
    key.push(DELIMITER);
    key.push_str(index.name());
    key.push(DELIMITER);
    for segment in segments {
        if segment.contains(DELIMITER) {
            return Err(LedgerError::Validation(format!(
                "key segment {:?} contains the reserved delimiter",
                segment
            )));
        }
        key.push_str(segment);
        key.push(DELIMITER);
    }
    Ok(key)
}

/// Splits a composite key back into its index name and segments.
///
/// Returns `None` for keys that were not produced by [`composite_key`]
/// (e.g. bare transaction-id keys).
pub fn split_composite_key(key: &str) -> Option<(&str, Vec<&str>)> {
    let rest = key.strip_prefix(DELIMITER)?;
    let mut parts = rest.split(DELIMITER);
    let index_name = parts.next()?;
    let mut segments: Vec<&str> = parts.collect();
    // The trailing delimiter leaves one empty element behind.
    if segments.pop() != Some("") {
        return None;
    }
    if segments.is_empty() {
        return None;
    }
    Some((index_name, segments))
}

// ---------------------------------------------------------------------------
// Entity key shorthands
// ---------------------------------------------------------------------------

/// Key of an asset record.
pub fn asset_key(asset_id: &str) -> LedgerResult<String> {
    composite_key(Index::Asset, &[asset_id, crate::entity::DocType::Asset.tag()])
}

/// Key of a token record.
pub fn token_key(token_id: &str) -> LedgerResult<String> {
    composite_key(Index::Token, &[token_id, crate::entity::DocType::Token.tag()])
}

/// Key of an owner balance record against an asset or token parent.
pub fn owner_key(owner_id: &str, parent_id: &str) -> LedgerResult<String> {
    composite_key(Index::Owner, &[owner_id, parent_id])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
