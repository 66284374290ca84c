//! Error types for warden
//!
//! Structural failures abort a reconciliation pass and map to one of these
//! variants. Per-role mutation failures are deliberately *not* here — they are
//! isolated inside the propagation executor (see `directory::MutationError`)
//! and surface only as counters in the pass report.

use thiserror::Error;

/// Crate-wide error type
#[derive(Debug, Error)]
pub enum WardenError {
    /// The requesting user has no linked wallet record. Reported to the
    /// caller as an actionable "link a wallet first" condition.
    #[error("no wallet record linked for this user")]
    UserRecordMissing,

    /// The asset-listing service was unreachable or returned an error.
    /// Aborts the whole pass; existing role assignments are left untouched.
    #[error("asset lookup failed: {0}")]
    AssetLookup(String),

    /// Config store (MongoDB) failure
    #[error("database error: {0}")]
    Database(String),

    /// Structural directory-service failure (not a per-role mutation failure)
    #[error("directory error: {0}")]
    Directory(String),

    /// Invalid configuration
    #[error("config error: {0}")]
    Config(String),

    /// Internal invariant violation
    #[error("internal error: {0}")]
    Internal(String),
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, WardenError>;
