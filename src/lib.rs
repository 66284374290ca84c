//! Warden - wallet-gated role reconciliation for community directories
//!
//! Warden computes which community roles a user has earned from the contents
//! of their linked wallet, diffs that against the roles they currently hold,
//! and applies the minimal set of grant/revoke operations against a
//! rate-limited external directory service.
//!
//! ## Pipeline
//!
//! - **Store**: read-only user records and per-community eligibility rules
//! - **Assets**: one holdings snapshot per pass from the listing service
//! - **Engine**: pure evaluation, aggregation, and diffing
//! - **Directory**: throttled grant/revoke with per-role failure isolation

pub mod assets;
pub mod config;
pub mod db;
pub mod directory;
pub mod engine;
pub mod logging;
pub mod store;
pub mod types;

pub use config::Args;
pub use engine::{ReconcileReport, Reconciler};
pub use types::{Result, WardenError};
