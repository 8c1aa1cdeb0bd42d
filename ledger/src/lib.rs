// Copyright (c) 2026 Tessera Systems. MIT License.
// See LICENSE for details.

//! # Tessera Ledger: Asset Tokenization Core
//!
//! Tessera tracks who owns what: registered assets (land, buildings,
//! anything with a deed) and the fungible tokens minted against them. It
//! is an accounting core, not a blockchain; it sits on top of an
//! externally supplied versioned key-value store that provides ordering,
//! replication, and all-or-nothing commit per invocation. Tessera's job
//! is everything the store doesn't do: indexing, validation, and the
//! arithmetic that must never be wrong.
//!
//! ## Architecture
//!
//! The crate is split into modules that mirror the actual concerns of a
//! double-entry-adjacent accounting system:
//!
//! - **keys**: Composite key codec. Pure string surgery, zero I/O.
//! - **entity**: The record shapes and their closed doc-type tags.
//! - **store**: The external store trait, the typed entity adapter, and
//!   a sled-backed reference implementation.
//! - **assets**: Asset registration and lookup.
//! - **tokens**: Token issuance, reserve policy, supply distribution.
//! - **balances**: The balance ledger. Checked arithmetic, zero-prune.
//! - **transfer**: Transfers and burns, with their audit records.
//! - **history**: Replay of a key's version log into typed snapshots.
//! - **ops**: The explicit name-to-handler operation table.
//! - **config**: Reserve policy constants and runtime configuration.
//! - **error**: One error taxonomy with machine-checkable kinds.
//!
//! ## Design Philosophy
//!
//! 1. Conservation first: value moves, it is never created or destroyed
//!    outside an explicit mint or burn.
//! 2. Every balance mutation goes through one debit and one credit path,
//!    both checked, both pure until the final write.
//! 3. If it touches money, it has tests. Plural.

pub mod assets;
pub mod balances;
pub mod config;
pub mod entity;
pub mod error;
pub mod history;
pub mod keys;
pub mod ops;
pub mod store;
pub mod tokens;
pub mod transfer;
