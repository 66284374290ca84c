//! Community config schema
//!
//! One document per community, holding its eligibility rules. Administered by
//! the community-management surface; warden only reads.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::db::schemas::Metadata;
use crate::engine::EligibilityRule;

/// Collection name for community configs
pub const COMMUNITY_CONFIG_COLLECTION: &str = "community_configs";

/// Community config document
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct CommunityConfigDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Community (server/guild) identifier in the directory service
    pub community_id: String,

    /// Human-readable name, for logs and admin tooling
    #[serde(default)]
    pub name: String,

    /// Ordered eligibility rules (predicate → role)
    #[serde(default)]
    pub rules: Vec<EligibilityRule>,
}

impl IntoIndexes for CommunityConfigDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "community_id": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("community_id_unique".to_string())
                    .build(),
            ),
        )]
    }
}
