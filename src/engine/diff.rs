//! Role diff engine
//!
//! Compares the desired role set against the user's current assignments and
//! classifies every config-known role as added, persisted, or removed. Pure
//! and deterministic — the grant/revoke policy is unit-testable with no
//! network in sight.

use super::roles::RoleMap;

/// Partition of `(active ∪ current)` per community, restricted to roles the
/// current config knows about.
///
/// The three maps are pairwise disjoint. Roles the user holds that appear in
/// neither the active nor the inactive set (e.g. manually assigned) land in
/// none of them: the engine never touches roles it does not recognize.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleDiff {
    /// Earned but not currently assigned — needs a grant
    pub added: RoleMap,
    /// Earned and already assigned — no call needed
    pub persisted: RoleMap,
    /// No longer earned but currently assigned — needs a revoke
    pub removed: RoleMap,
}

/// Compute the per-community diff between desired and current role state.
pub fn diff(active: &RoleMap, inactive: &RoleMap, current: &RoleMap) -> RoleDiff {
    let mut result = RoleDiff::default();

    for (community_id, active_roles) in active {
        let held = current.get(community_id);
        let (added, persisted): (Vec<_>, Vec<_>) = active_roles
            .iter()
            .partition(|role| !held.map(|h| h.contains(*role)).unwrap_or(false));

        result
            .added
            .insert(community_id.clone(), added.into_iter().cloned().collect());
        result
            .persisted
            .insert(community_id.clone(), persisted.into_iter().cloned().collect());
    }

    for (community_id, inactive_roles) in inactive {
        let removed = match current.get(community_id) {
            Some(held) => inactive_roles.intersection(held).cloned().collect(),
            None => Default::default(),
        };
        result.removed.insert(community_id.clone(), removed);
    }

    result
}
