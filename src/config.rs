//! Configuration for warden
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

use crate::assets::AssetClientConfig;
use crate::directory::{DirectoryClientConfig, LimiterConfig};

/// Warden - wallet-gated role reconciliation for community directories
#[derive(Parser, Debug, Clone)]
#[command(name = "warden")]
#[command(about = "Reconciles community roles against wallet holdings")]
pub struct Args {
    /// Unique node identifier for this warden instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Directory user to reconcile
    #[arg(long, env = "USER_ID")]
    pub user_id: String,

    /// MongoDB connection URI (user records + community configs)
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "warden")]
    pub mongodb_db: String,

    /// Base URL of the asset listing service
    #[arg(long, env = "ASSETS_URL", default_value = "http://localhost:8070")]
    pub assets_url: String,

    /// Base URL of the directory role-assignment API
    #[arg(long, env = "DIRECTORY_URL", default_value = "http://localhost:8071")]
    pub directory_url: String,

    /// Bearer token for the directory API
    #[arg(long, env = "DIRECTORY_TOKEN")]
    pub directory_token: Option<String>,

    /// Outbound request timeout in milliseconds (holdings + directory calls)
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "10000")]
    pub request_timeout_ms: u64,

    /// Maximum directory mutations in flight at once
    #[arg(long, env = "MUTATION_MAX_INFLIGHT", default_value = "4")]
    pub mutation_max_inflight: usize,

    /// Minimum spacing between directory mutations in milliseconds
    #[arg(long, env = "MUTATION_MIN_INTERVAL_MS", default_value = "50")]
    pub mutation_min_interval_ms: u64,

    /// Append reconciliation audit events to this JSONL file
    #[arg(long, env = "AUDIT_LOG")]
    pub audit_log: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Shared outbound request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Asset client configuration
    pub fn asset_client_config(&self) -> AssetClientConfig {
        AssetClientConfig {
            base_url: self.assets_url.clone(),
            request_timeout: self.request_timeout(),
        }
    }

    /// Directory client configuration
    pub fn directory_client_config(&self) -> DirectoryClientConfig {
        DirectoryClientConfig {
            base_url: self.directory_url.clone(),
            auth_token: self.directory_token.clone(),
            request_timeout: self.request_timeout(),
        }
    }

    /// Mutation throttle configuration
    pub fn limiter_config(&self) -> LimiterConfig {
        LimiterConfig {
            max_inflight: self.mutation_max_inflight,
            min_interval: Duration::from_millis(self.mutation_min_interval_ms),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.user_id.trim().is_empty() {
            return Err("USER_ID must not be empty".to_string());
        }

        if self.request_timeout_ms == 0 {
            return Err("REQUEST_TIMEOUT_MS must be greater than zero".to_string());
        }

        if self.mutation_max_inflight == 0 {
            return Err("MUTATION_MAX_INFLIGHT must be greater than zero".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> Args {
        Args::parse_from(["warden", "--user-id", "user-1"])
    }

    #[test]
    fn test_defaults() {
        let args = args();
        assert_eq!(args.request_timeout_ms, 10000);
        assert_eq!(args.mutation_max_inflight, 4);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_timeout() {
        let mut args = args();
        args.request_timeout_ms = 0;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_empty_user() {
        let mut args = args();
        args.user_id = "  ".into();
        assert!(args.validate().is_err());
    }
}
