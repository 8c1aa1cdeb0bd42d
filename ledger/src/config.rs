//! # Ledger Configuration & Constants
//!
//! Every wire-stable constant of the ledger lives here: index namespace
//! names, doc type tags, and the reserve policy numbers. These values are
//! part of the on-ledger data format, so changing them after deployment
//! breaks compatibility with every record already written.

// ---------------------------------------------------------------------------
// Reserve policy numbers
// ---------------------------------------------------------------------------

/// Denominator for basis-point arithmetic. 10,000 bps = 100%.
pub const BPS_DENOMINATOR: i64 = 10_000;

/// Share of a token's total supply held back by default when the mint
/// input leaves `reserveToken` at zero: 75%.
pub const DEFAULT_RESERVE_BPS: i64 = 7_500;

/// Upper bound on the reserved share of total supply: 75%. How a breach
/// of this cap is handled depends on [`ReservePolicy`].
pub const RESERVE_CAP_BPS: i64 = 7_500;

// ---------------------------------------------------------------------------
// ReservePolicy
// ---------------------------------------------------------------------------

/// What to do when a mint reserves more than [`RESERVE_CAP_BPS`] of total
/// supply.
///
/// The cap check exists in the original product but was never enforced,
/// so over-reservation silently succeeded. Whether that was intended is an
/// open product question; until it is answered, enforcement is a
/// deployment choice rather than a hardcoded behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReservePolicy {
    /// Log a warning and accept the mint. Matches observed behavior.
    #[default]
    Advisory,
    /// Reject the mint with a validation error.
    Enforced,
}

// ---------------------------------------------------------------------------
// LedgerConfig
// ---------------------------------------------------------------------------

/// Runtime configuration for the ledger core, fixed at process startup.
#[derive(Debug, Clone, Default)]
pub struct LedgerConfig {
    /// Handling of reserve-cap breaches during mint.
    pub reserve_policy: ReservePolicy,
}

impl LedgerConfig {
    /// Configuration with the cap actively enforced.
    pub fn enforced() -> Self {
        Self {
            reserve_policy: ReservePolicy::Enforced,
        }
    }
}
