//! Role identity and role-map types
//!
//! A role exists only within one community: the same rule concept configured in
//! two communities yields two distinct identifiers. Maps are BTree-based so the
//! presentation layer gets stable ordering for free.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A role within one community. No cross-community identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoleIdentifier {
    /// Community (server/guild) the role belongs to
    pub community_id: String,
    /// Role within that community's namespace
    pub role_id: String,
}

impl RoleIdentifier {
    pub fn new(community_id: impl Into<String>, role_id: impl Into<String>) -> Self {
        Self {
            community_id: community_id.into(),
            role_id: role_id.into(),
        }
    }
}

impl fmt::Display for RoleIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.community_id, self.role_id)
    }
}

/// Roles keyed by community id
pub type RoleMap = BTreeMap<String, BTreeSet<String>>;

/// Total number of roles across all communities in a map
pub fn role_count(map: &RoleMap) -> usize {
    map.values().map(|roles| roles.len()).sum()
}

/// True when the map holds no roles at all (empty per-community sets count as none)
pub fn is_role_map_empty(map: &RoleMap) -> bool {
    map.values().all(|roles| roles.is_empty())
}

/// Insert a role into the map, creating the community entry if needed
pub fn insert_role(map: &mut RoleMap, community_id: &str, role_id: &str) {
    map.entry(community_id.to_string())
        .or_default()
        .insert(role_id.to_string());
}
