//! Asset holdings lookup
//!
//! Maps a wallet address to the assets it currently owns, via an external
//! listing service. An unreachable service is a distinct failure from an
//! empty wallet: the engine aborts the pass rather than treating silence as
//! "owns nothing" and revoking roles on an inconclusive read.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::engine::Asset;
use crate::types::{Result, WardenError};

/// Wallet → owned assets boundary
#[async_trait]
pub trait AssetClient: Send + Sync {
    /// List the assets the wallet currently owns. An empty list is a valid
    /// answer; upstream unavailability is `WardenError::AssetLookup`.
    async fn get_holdings(&self, wallet_address: &str) -> Result<Vec<Asset>>;
}

/// Configuration for the HTTP asset client
#[derive(Debug, Clone)]
pub struct AssetClientConfig {
    /// Base URL of the asset listing API
    pub base_url: String,
    /// Per-request timeout
    pub request_timeout: Duration,
}

/// Wire shape of the holdings response
#[derive(Debug, Deserialize)]
struct HoldingsResponse {
    assets: Vec<Asset>,
}

/// Production asset client backed by reqwest
pub struct HttpAssetClient {
    config: AssetClientConfig,
    http_client: reqwest::Client,
}

impl HttpAssetClient {
    pub fn new(config: AssetClientConfig) -> Self {
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
}

#[async_trait]
impl AssetClient for HttpAssetClient {
    async fn get_holdings(&self, wallet_address: &str) -> Result<Vec<Asset>> {
        let url = format!(
            "{}/wallets/{}/assets",
            self.config.base_url.trim_end_matches('/'),
            wallet_address
        );
        debug!(wallet = %wallet_address, url = %url, "fetching holdings");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| WardenError::AssetLookup(format!("holdings request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(WardenError::AssetLookup(format!(
                "holdings lookup returned HTTP {}",
                response.status()
            )));
        }

        let body: HoldingsResponse = response
            .json()
            .await
            .map_err(|e| WardenError::AssetLookup(format!("holdings decode failed: {e}")))?;

        debug!(wallet = %wallet_address, count = body.assets.len(), "holdings fetched");
        Ok(body.assets)
    }
}
