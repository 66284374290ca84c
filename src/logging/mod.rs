//! Logging infrastructure for warden
//!
//! Structured tracing plus a JSONL audit trail of reconciliation passes.

pub mod audit;

pub use audit::{AuditLogger, PassStatus, ReconcileEvent};
