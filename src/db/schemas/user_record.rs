//! User record schema
//!
//! Maps a directory user to their linked wallet address. One wallet per user
//! in the current model. Written by the wallet-linking flow (not warden);
//! warden treats the collection as read-only and a missing document as the
//! first-class "no wallet linked" condition, not an empty wallet.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::db::schemas::Metadata;

/// Collection name for user records
pub const USER_RECORD_COLLECTION: &str = "user_records";

/// User record document
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserRecordDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Directory-service user identifier
    pub user_id: String,

    /// Linked wallet address (opaque on-chain identity)
    pub wallet_address: String,
}

impl IntoIndexes for UserRecordDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on user_id: one wallet per user
            (
                doc! { "user_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("user_id_unique".to_string())
                        .build(),
                ),
            ),
            // Index on wallet_address for reverse lookups
            (
                doc! { "wallet_address": 1 },
                Some(
                    IndexOptions::builder()
                        .name("wallet_address_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}
