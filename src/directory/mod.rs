//! Directory service boundary
//!
//! The directory is the external system that actually holds role assignments
//! (a chat platform's guild/member API). The engine only depends on this
//! trait; tests substitute a fake, production uses [`HttpDirectoryClient`].

mod client;
mod limiter;

pub use client::{DirectoryClientConfig, HttpDirectoryClient};
pub use limiter::{LimiterConfig, MutationLimiter};

use async_trait::async_trait;
use std::collections::BTreeSet;
use thiserror::Error;

use crate::engine::RoleIdentifier;
use crate::types::Result;

/// Failure of a single grant/revoke call.
///
/// Never aborts a reconciliation pass: the executor records the outcome and
/// moves on. Rate limiting is its own class because a burst of throttle
/// rejections is retryable on the next pass, unlike a permission rejection.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MutationError {
    /// The directory service throttled the call (retryable next pass)
    #[error("rate limited by directory service")]
    RateLimited,
    /// The directory refused the mutation (missing permission, role deleted)
    #[error("mutation rejected: {0}")]
    Rejected(String),
    /// Transport-level failure (timeout, connection reset)
    #[error("transport error: {0}")]
    Transport(String),
}

/// Outcome of a single mutation call
pub type MutationResult = std::result::Result<(), MutationError>;

/// Role assignment read/write operations against the directory service.
///
/// `grant_role` and `revoke_role` must be idempotent: re-applying a grant to
/// an already-held role or a revoke to an already-absent role succeeds.
#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// Roles the user currently holds in one community. Must be a fresh read:
    /// the diff engine assumes no staleness.
    async fn assigned_roles(&self, user_id: &str, community_id: &str) -> Result<BTreeSet<String>>;

    /// Grant one role to the user
    async fn grant_role(&self, user_id: &str, role: &RoleIdentifier) -> MutationResult;

    /// Revoke one role from the user
    async fn revoke_role(&self, user_id: &str, role: &RoleIdentifier) -> MutationResult;
}
