//! Audit logging for reconciliation passes
//!
//! Writes one JSONL line per pass so operators can answer "what changed for
//! this user and when" without grepping service logs. Every event is also
//! emitted through tracing; the file sink is optional.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

/// Outcome class of a reconciliation pass
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PassStatus {
    /// Pipeline ran to completion (possibly with isolated mutation failures)
    Completed,
    /// No wallet linked for the user
    UserRecordMissing,
    /// Asset listing service unavailable; pass aborted, roles frozen
    AssetLookupFailed,
    /// Structural failure (config store, directory reads)
    Failed,
}

/// One reconciliation pass, as an audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileEvent {
    /// Event timestamp
    pub timestamp: DateTime<Utc>,
    /// Node that ran the pass
    pub node_id: String,
    /// User the pass was for
    pub user_id: String,
    /// Wallet address, when the record lookup succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    /// How the pass ended
    pub status: PassStatus,
    /// Communities evaluated
    pub communities: usize,
    /// Roles confirmed granted
    pub added: usize,
    /// Roles unchanged
    pub persisted: usize,
    /// Roles confirmed revoked
    pub removed: usize,
    /// Mutations that failed (excluding rate limiting)
    pub failed_mutations: usize,
    /// Mutations rejected by the directory rate limiter
    pub rate_limited: usize,
    /// Communities skipped because their assignment read failed
    pub skipped_communities: usize,
    /// Wall-clock duration of the pass
    pub duration_ms: u64,
}

impl ReconcileEvent {
    pub fn new(node_id: String, user_id: String) -> Self {
        Self {
            timestamp: Utc::now(),
            node_id,
            user_id,
            wallet_address: None,
            status: PassStatus::Completed,
            communities: 0,
            added: 0,
            persisted: 0,
            removed: 0,
            failed_mutations: 0,
            rate_limited: 0,
            skipped_communities: 0,
            duration_ms: 0,
        }
    }

    /// Convert to a JSONL line
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Audit logger that appends events to a JSONL file
#[derive(Clone)]
pub struct AuditLogger {
    inner: Arc<Mutex<AuditLoggerInner>>,
    node_id: String,
}

struct AuditLoggerInner {
    writer: Option<BufWriter<File>>,
}

impl AuditLogger {
    /// Create a logger with no file sink (tracing only)
    pub fn new(node_id: String) -> Self {
        Self {
            inner: Arc::new(Mutex::new(AuditLoggerInner { writer: None })),
            node_id,
        }
    }

    /// Initialize the file sink
    pub async fn init_file(&self, path: PathBuf) -> std::io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        let mut inner = self.inner.lock().await;
        inner.writer = Some(BufWriter::new(file));

        info!("Audit logging initialized to {}", path.display());
        Ok(())
    }

    /// Start an event for one pass
    pub fn event(&self, user_id: &str) -> ReconcileEvent {
        ReconcileEvent::new(self.node_id.clone(), user_id.to_string())
    }

    /// Record a pass
    pub async fn log(&self, event: ReconcileEvent) {
        info!(
            user_id = %event.user_id,
            status = ?event.status,
            added = event.added,
            persisted = event.persisted,
            removed = event.removed,
            failed = event.failed_mutations,
            rate_limited = event.rate_limited,
            duration_ms = event.duration_ms,
            "reconciliation pass"
        );

        let jsonl = match event.to_jsonl() {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialize audit event: {}", e);
                return;
            }
        };

        let mut inner = self.inner.lock().await;
        if let Some(ref mut writer) = inner.writer {
            if let Err(e) = writeln!(writer, "{}", jsonl) {
                error!("Failed to write audit event: {}", e);
            }
            // Flush per event for durability; pass volume is low
            if let Err(e) = writer.flush() {
                error!("Failed to flush audit log: {}", e);
            }
        }
    }
}
