//! HTTP directory client
//!
//! REST client for the role-assignment API fronting the directory service.
//! Grant is a PUT and revoke a DELETE, so both are idempotent at the wire
//! level; a 404 on revoke means the role was already absent and counts as
//! success.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::debug;

use super::{DirectoryService, MutationError, MutationResult};
use crate::engine::RoleIdentifier;
use crate::types::{Result, WardenError};

/// Configuration for the HTTP directory client
#[derive(Debug, Clone)]
pub struct DirectoryClientConfig {
    /// Base URL of the role-assignment API, e.g. "https://directory.internal"
    pub base_url: String,
    /// Bearer token for the API
    pub auth_token: Option<String>,
    /// Per-request timeout
    pub request_timeout: Duration,
}

/// Wire shape of the assigned-roles response
#[derive(Debug, Deserialize)]
struct AssignedRolesResponse {
    roles: Vec<String>,
}

/// Production directory client backed by reqwest
pub struct HttpDirectoryClient {
    config: DirectoryClientConfig,
    http_client: reqwest::Client,
}

impl HttpDirectoryClient {
    pub fn new(config: DirectoryClientConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent("warden/0.1")
            .build()
            .unwrap_or_default();

        Self {
            config,
            http_client,
        }
    }

    fn role_url(&self, user_id: &str, role: &RoleIdentifier) -> String {
        format!(
            "{}/users/{}/communities/{}/roles/{}",
            self.config.base_url.trim_end_matches('/'),
            user_id,
            role.community_id,
            role.role_id
        )
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.auth_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Map a mutation response status to an outcome. 404 on revoke is success
    /// (the role was already absent); 429 is the throttle class.
    fn mutation_outcome(status: reqwest::StatusCode, revoke: bool) -> MutationResult {
        if status.is_success() || (revoke && status == reqwest::StatusCode::NOT_FOUND) {
            Ok(())
        } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Err(MutationError::RateLimited)
        } else {
            Err(MutationError::Rejected(format!("HTTP {status}")))
        }
    }
}

#[async_trait]
impl DirectoryService for HttpDirectoryClient {
    async fn assigned_roles(&self, user_id: &str, community_id: &str) -> Result<BTreeSet<String>> {
        let url = format!(
            "{}/users/{}/communities/{}/roles",
            self.config.base_url.trim_end_matches('/'),
            user_id,
            community_id
        );

        let response = self
            .authorize(self.http_client.get(&url))
            .send()
            .await
            .map_err(|e| WardenError::Directory(format!("assigned-roles request failed: {e}")))?;

        // A user the directory has never seen in this community holds no roles
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(BTreeSet::new());
        }

        if !response.status().is_success() {
            return Err(WardenError::Directory(format!(
                "assigned-roles returned HTTP {} for {}",
                response.status(),
                community_id
            )));
        }

        let body: AssignedRolesResponse = response
            .json()
            .await
            .map_err(|e| WardenError::Directory(format!("assigned-roles decode failed: {e}")))?;

        Ok(body.roles.into_iter().collect())
    }

    async fn grant_role(&self, user_id: &str, role: &RoleIdentifier) -> MutationResult {
        let url = self.role_url(user_id, role);
        debug!(role = %role, "granting role");

        let response = self
            .authorize(self.http_client.put(&url))
            .send()
            .await
            .map_err(|e| MutationError::Transport(e.to_string()))?;

        Self::mutation_outcome(response.status(), false)
    }

    async fn revoke_role(&self, user_id: &str, role: &RoleIdentifier) -> MutationResult {
        let url = self.role_url(user_id, role);
        debug!(role = %role, "revoking role");

        let response = self
            .authorize(self.http_client.delete(&url))
            .send()
            .await
            .map_err(|e| MutationError::Transport(e.to_string()))?;

        Self::mutation_outcome(response.status(), true)
    }
}
