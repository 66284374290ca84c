//! Propagation executor
//!
//! Applies a role diff against the directory service. Every grant/revoke is
//! attempted independently: one role failing (permission gone, role deleted,
//! transient network error) never aborts the rest of the pass. Failed roles
//! are excluded from the confirmed maps so the caller reports what actually
//! changed, not what was intended. There is no in-pass retry; the next
//! user-triggered pass picks up whatever was left.

use futures::future::join_all;
use tracing::{debug, warn};

use super::diff::RoleDiff;
use super::roles::{insert_role, role_count, RoleIdentifier, RoleMap};
use crate::directory::{DirectoryService, MutationError, MutationLimiter};

/// Confirmed post-execution state of one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationOutcome {
    /// Roles confirmed granted
    pub added: RoleMap,
    /// Roles that required no call
    pub persisted: RoleMap,
    /// Roles confirmed revoked
    pub removed: RoleMap,
    /// Mutations rejected or lost to transport errors
    pub failed: usize,
    /// Mutations rejected by the directory's rate limiter (retryable next pass)
    pub rate_limited: usize,
}

impl PropagationOutcome {
    /// True when mutations were attempted and none succeeded
    pub fn all_mutations_failed(&self) -> bool {
        let confirmed = role_count(&self.added) + role_count(&self.removed);
        confirmed == 0 && (self.failed + self.rate_limited) > 0
    }
}

enum Op {
    Grant(RoleIdentifier),
    Revoke(RoleIdentifier),
}

/// Apply `diff` for `user_id`, throttled by `limiter`.
pub async fn propagate(
    directory: &dyn DirectoryService,
    limiter: &MutationLimiter,
    user_id: &str,
    diff: &RoleDiff,
) -> PropagationOutcome {
    let mut ops = Vec::new();
    for (community_id, roles) in &diff.added {
        for role in roles {
            ops.push(Op::Grant(RoleIdentifier::new(community_id, role)));
        }
    }
    for (community_id, roles) in &diff.removed {
        for role in roles {
            ops.push(Op::Revoke(RoleIdentifier::new(community_id, role)));
        }
    }

    // Operations run concurrently; the limiter keeps us inside the
    // directory's quota
    let results = join_all(ops.into_iter().map(|op| async move {
        let _permit = limiter.acquire().await;
        match op {
            Op::Grant(role) => {
                let result = directory.grant_role(user_id, &role).await;
                (role, true, result)
            }
            Op::Revoke(role) => {
                let result = directory.revoke_role(user_id, &role).await;
                (role, false, result)
            }
        }
    }))
    .await;

    // Persisted roles need no call and are confirmed as-is. Empty
    // per-community sets are kept so the report shape stays uniform.
    let mut outcome = PropagationOutcome {
        persisted: diff.persisted.clone(),
        ..Default::default()
    };
    for community_id in diff.added.keys().chain(diff.removed.keys()) {
        outcome.added.entry(community_id.clone()).or_default();
        outcome.removed.entry(community_id.clone()).or_default();
    }

    for (role, was_grant, result) in results {
        match result {
            Ok(()) => {
                debug!(role = %role, grant = was_grant, "mutation confirmed");
                let map = if was_grant { &mut outcome.added } else { &mut outcome.removed };
                insert_role(map, &role.community_id, &role.role_id);
            }
            Err(MutationError::RateLimited) => {
                warn!(role = %role, grant = was_grant, "mutation rate limited");
                outcome.rate_limited += 1;
            }
            Err(e) => {
                warn!(role = %role, grant = was_grant, error = %e, "mutation failed");
                outcome.failed += 1;
            }
        }
    }

    outcome
}
