//! Warden - wallet-gated role reconciliation for community directories

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use warden::{
    assets::HttpAssetClient,
    config::Args,
    db::MongoClient,
    directory::HttpDirectoryClient,
    engine::{role_count, Reconciler},
    logging::{AuditLogger, PassStatus},
    store::MongoConfigStore,
    WardenError,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("warden={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Warden - role reconciliation");
    info!("  build {} ({})", env!("GIT_COMMIT_SHORT"), env!("BUILD_TIMESTAMP"));
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("User: {}", args.user_id);
    info!("MongoDB: {}", args.mongodb_uri);
    info!("Assets: {}", args.assets_url);
    info!("Directory: {}", args.directory_url);
    info!("Request timeout: {}ms", args.request_timeout_ms);
    info!(
        "Mutation throttle: {} in flight, {}ms spacing",
        args.mutation_max_inflight, args.mutation_min_interval_ms
    );
    info!("======================================");

    let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => client,
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            std::process::exit(1);
        }
    };

    let audit = AuditLogger::new(args.node_id.to_string());
    if let Some(path) = &args.audit_log {
        if let Err(e) = audit.init_file(path.clone()).await {
            error!("Failed to open audit log {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }

    let reconciler = Reconciler::new(
        Arc::new(MongoConfigStore::new(mongo)),
        Arc::new(HttpAssetClient::new(args.asset_client_config())),
        Arc::new(HttpDirectoryClient::new(args.directory_client_config())),
        args.limiter_config(),
    );

    let mut event = audit.event(&args.user_id);
    let started = std::time::Instant::now();

    match reconciler.reconcile(&args.user_id).await {
        Ok(report) => {
            event.wallet_address = Some(report.wallet_address.clone());
            event.status = PassStatus::Completed;
            event.communities = report.communities;
            event.added = role_count(&report.added);
            event.persisted = role_count(&report.persisted);
            event.removed = role_count(&report.removed);
            event.failed_mutations = report.failed_mutations;
            event.rate_limited = report.rate_limited;
            event.skipped_communities = report.skipped_communities;
            event.duration_ms = report.duration_ms;
            audit.log(event).await;

            info!(
                "Reconciliation complete: +{} ={} -{} (failed {}, rate limited {}, skipped {})",
                role_count(&report.added),
                role_count(&report.persisted),
                role_count(&report.removed),
                report.failed_mutations,
                report.rate_limited,
                report.skipped_communities
            );

            if report.all_mutations_failed() {
                error!("Every attempted mutation failed; directory state unchanged");
                std::process::exit(2);
            }

            Ok(())
        }
        Err(e) => {
            event.duration_ms = started.elapsed().as_millis() as u64;
            event.status = match &e {
                WardenError::UserRecordMissing => PassStatus::UserRecordMissing,
                WardenError::AssetLookup(_) => PassStatus::AssetLookupFailed,
                _ => PassStatus::Failed,
            };
            audit.log(event).await;

            match e {
                WardenError::UserRecordMissing => {
                    // Actionable for the user: link a wallet, then retry
                    error!("No wallet linked for user {}", args.user_id);
                    std::process::exit(3);
                }
                WardenError::AssetLookup(msg) => {
                    // Roles stay frozen until the listing service recovers
                    error!("Asset listing unavailable, roles left untouched: {}", msg);
                    std::process::exit(4);
                }
                other => {
                    error!("Reconciliation failed: {}", other);
                    std::process::exit(5);
                }
            }
        }
    }
}
