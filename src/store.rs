//! Config store boundary
//!
//! Read-only access to the persisted user records and community configs. The
//! engine depends on the trait; production wires the Mongo-backed impl, tests
//! substitute an in-memory fake.

use async_trait::async_trait;
use bson::doc;
use tracing::debug;

use crate::db::schemas::{
    CommunityConfigDoc, UserRecordDoc, COMMUNITY_CONFIG_COLLECTION, USER_RECORD_COLLECTION,
};
use crate::db::MongoClient;
use crate::engine::CommunityConfig;
use crate::types::Result;

/// A user's linked wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub user_id: String,
    pub wallet_address: String,
}

/// Read-only configuration store
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Fetch the user's wallet record. `None` means no wallet is linked,
    /// which the engine reports as `UserRecordMissing`.
    async fn get_user_record(&self, user_id: &str) -> Result<Option<UserRecord>>;

    /// All community configs. An empty list is valid (no communities
    /// registered yet).
    async fn list_community_configs(&self) -> Result<Vec<CommunityConfig>>;
}

/// Mongo-backed config store
#[derive(Clone)]
pub struct MongoConfigStore {
    client: MongoClient,
}

impl MongoConfigStore {
    pub fn new(client: MongoClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ConfigStore for MongoConfigStore {
    async fn get_user_record(&self, user_id: &str) -> Result<Option<UserRecord>> {
        let collection = self
            .client
            .collection::<UserRecordDoc>(USER_RECORD_COLLECTION)
            .await?;

        let doc = collection.find_one(doc! { "user_id": user_id }).await?;

        Ok(doc.map(|d| UserRecord {
            user_id: d.user_id,
            wallet_address: d.wallet_address,
        }))
    }

    async fn list_community_configs(&self) -> Result<Vec<CommunityConfig>> {
        let collection = self
            .client
            .collection::<CommunityConfigDoc>(COMMUNITY_CONFIG_COLLECTION)
            .await?;

        let docs = collection.find_many(doc! {}).await?;
        debug!(count = docs.len(), "community configs loaded");

        Ok(docs
            .into_iter()
            .map(|d| CommunityConfig {
                community_id: d.community_id,
                name: d.name,
                rules: d.rules,
            })
            .collect())
    }
}
