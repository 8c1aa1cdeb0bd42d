//! # Error Taxonomy
//!
//! Every failure the ledger core can produce, as one closed enum. Callers
//! need two things from an error: a human-readable message for logs and a
//! stable, machine-checkable kind for programmatic handling. [`LedgerError`]
//! provides the first through `Display`, [`ErrorKind`] the second.
//!
//! Nothing here is retried internally. Retry, if any, belongs to the host
//! at the transaction-submission layer. An error raised before the final
//! write of an invocation must leave no prior write visible; the store's
//! invocation buffer guarantees that.

use thiserror::Error;

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Stable classification of a [`LedgerError`].
///
/// These discriminants are part of the operation surface: hosts branch on
/// them, so variants may be added but never renamed or repurposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or missing input fields. Rejected before any state change.
    Validation,
    /// An entity with the same id already exists in its index namespace.
    Conflict,
    /// A referenced entity is absent.
    NotFound,
    /// A debit exceeds the available balance.
    InsufficientBalance,
    /// A checked add/subtract would overflow the integer domain. Fatal:
    /// this signals corrupted invariants, not a recoverable input problem.
    ArithmeticOverflow,
    /// Stored bytes do not match the expected schema. Fatal: store
    /// corruption or schema drift, never a business error.
    Deserialization,
    /// The underlying key-value store failed.
    Store,
}

// ---------------------------------------------------------------------------
// LedgerError
// ---------------------------------------------------------------------------

/// Errors produced by ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Input failed validation. The message names the offending field.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Create was called with an id that is already taken.
    #[error("{0} already exists with id: {1}")]
    Conflict(&'static str, String),

    /// A referenced entity does not exist. Note that an owner balance
    /// pruned at zero reads as not-found, not as zero.
    #[error("{0}")]
    NotFound(String),

    /// Attempted to debit more than the record holds.
    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance {
        /// Balance currently on the record.
        available: i64,
        /// Amount the debit asked for.
        requested: i64,
    },

    /// Checked arithmetic failed.
    #[error("arithmetic overflow: {lhs} {op} {rhs}")]
    ArithmeticOverflow {
        /// Operator symbol, "+" or "-".
        op: &'static str,
        lhs: i64,
        rhs: i64,
    },

    /// Stored bytes under `key` could not be decoded as the expected
    /// entity schema.
    #[error("corrupt record under key {key:?}: {detail}")]
    Deserialization {
        /// The composite key whose value failed to decode.
        key: String,
        /// Decoder message.
        detail: String,
    },

    /// The underlying store reported a failure.
    #[error("store error: {0}")]
    Store(String),
}

impl LedgerError {
    /// The stable classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Validation(_) => ErrorKind::Validation,
            LedgerError::Conflict(..) => ErrorKind::Conflict,
            LedgerError::NotFound(_) => ErrorKind::NotFound,
            LedgerError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            LedgerError::ArithmeticOverflow { .. } => ErrorKind::ArithmeticOverflow,
            LedgerError::Deserialization { .. } => ErrorKind::Deserialization,
            LedgerError::Store(_) => ErrorKind::Store,
        }
    }
}

impl From<sled::Error> for LedgerError {
    fn from(err: sled::Error) -> Self {
        LedgerError::Store(err.to_string())
    }
}

/// Shorthand used throughout the crate.
pub type LedgerResult<T> = Result<T, LedgerError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
