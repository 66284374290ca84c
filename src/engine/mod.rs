//! Role reconciliation engine
//!
//! One reconciliation pass runs as a single async pipeline: user record →
//! community configs → holdings → per-community evaluation → fresh assignment
//! reads → diff → throttled propagation. All collaborators are traits so the
//! whole pipeline runs against fakes in tests.

pub mod aggregate;
pub mod diff;
pub mod evaluate;
pub mod propagate;
pub mod roles;
pub mod rules;

pub use aggregate::{aggregate, AggregateResult};
pub use diff::{diff, RoleDiff};
pub use evaluate::{evaluate, role_universe};
pub use propagate::{propagate, PropagationOutcome};
pub use roles::{insert_role, is_role_map_empty, role_count, RoleIdentifier, RoleMap};
pub use rules::{Asset, CommunityConfig, EligibilityRule, RulePredicate};

use dashmap::DashMap;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::assets::AssetClient;
use crate::directory::{DirectoryService, LimiterConfig, MutationLimiter};
use crate::store::ConfigStore;
use crate::types::{Result, WardenError};

/// Everything the presentation layer needs to render one pass.
///
/// The engine never formats user-facing text; callers turn these maps into
/// whatever their surface wants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Wallet the pass evaluated
    pub wallet_address: String,
    /// Communities evaluated
    pub communities: usize,
    /// Roles earned per community
    pub active: RoleMap,
    /// Config-known roles not earned per community
    pub inactive: RoleMap,
    /// Roles confirmed granted this pass
    pub added: RoleMap,
    /// Roles already held and still earned
    pub persisted: RoleMap,
    /// Roles confirmed revoked this pass
    pub removed: RoleMap,
    /// Mutations rejected or lost to transport errors
    pub failed_mutations: usize,
    /// Mutations rejected by the directory's rate limiter
    pub rate_limited: usize,
    /// Communities skipped because their assignment read failed
    pub skipped_communities: usize,
    /// Wall-clock duration of the pass in milliseconds
    pub duration_ms: u64,
}

impl ReconcileReport {
    /// True when mutations were attempted and none succeeded
    pub fn all_mutations_failed(&self) -> bool {
        role_count(&self.added) + role_count(&self.removed) == 0
            && (self.failed_mutations + self.rate_limited) > 0
    }
}

/// Runs reconciliation passes against the configured collaborators.
///
/// Concurrent passes for *different* users are independent; passes for the
/// same user serialize on a per-user lock so a later trigger cannot race an
/// earlier one onto a stale diff base.
pub struct Reconciler {
    store: Arc<dyn ConfigStore>,
    assets: Arc<dyn AssetClient>,
    directory: Arc<dyn DirectoryService>,
    limiter: MutationLimiter,
    user_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn ConfigStore>,
        assets: Arc<dyn AssetClient>,
        directory: Arc<dyn DirectoryService>,
        limiter_config: LimiterConfig,
    ) -> Self {
        Self {
            store,
            assets,
            directory,
            limiter: MutationLimiter::new(limiter_config),
            user_locks: DashMap::new(),
        }
    }

    /// Run one end-to-end reconciliation pass for a user.
    ///
    /// Structural failures (missing user record, holdings outage, config
    /// store errors) abort and propagate; per-role mutation failures are
    /// swallowed into the report counters.
    pub async fn reconcile(&self, user_id: &str) -> Result<ReconcileReport> {
        let lock = self
            .user_locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let started = Instant::now();

        let record = self
            .store
            .get_user_record(user_id)
            .await?
            .ok_or(WardenError::UserRecordMissing)?;

        let configs = self.store.list_community_configs().await?;
        if configs.is_empty() {
            // No communities registered: nothing to evaluate, and no reason
            // to touch the asset service
            info!(user_id = %user_id, "no communities configured, empty pass");
            return Ok(ReconcileReport {
                wallet_address: record.wallet_address,
                duration_ms: started.elapsed().as_millis() as u64,
                ..Default::default()
            });
        }

        // One holdings snapshot for the whole pass
        let holdings = Arc::new(self.assets.get_holdings(&record.wallet_address).await?);
        info!(
            user_id = %user_id,
            wallet = %record.wallet_address,
            assets = holdings.len(),
            communities = configs.len(),
            "holdings fetched"
        );

        let mut agg = aggregate(holdings, &configs).await;

        // Fresh assignment reads, one per community. A failed read makes that
        // community's diff base inconclusive, so it is dropped from the pass
        // rather than risking a bad revoke.
        let reads = join_all(configs.iter().map(|config| {
            let directory = Arc::clone(&self.directory);
            let community_id = config.community_id.clone();
            async move {
                let result = directory.assigned_roles(user_id, &community_id).await;
                (community_id, result)
            }
        }))
        .await;

        let mut current = RoleMap::new();
        let mut skipped = 0usize;
        for (community_id, result) in reads {
            match result {
                Ok(roles) => {
                    current.insert(community_id, roles);
                }
                Err(e) => {
                    warn!(community_id = %community_id, error = %e, "assignment read failed, skipping community");
                    agg.active.remove(&community_id);
                    agg.inactive.remove(&community_id);
                    skipped += 1;
                }
            }
        }

        let role_diff = diff(&agg.active, &agg.inactive, &current);
        let outcome = propagate(self.directory.as_ref(), &self.limiter, user_id, &role_diff).await;

        Ok(ReconcileReport {
            wallet_address: record.wallet_address,
            communities: configs.len(),
            active: agg.active,
            inactive: agg.inactive,
            added: outcome.added,
            persisted: outcome.persisted,
            removed: outcome.removed,
            failed_mutations: outcome.failed,
            rate_limited: outcome.rate_limited,
            skipped_communities: skipped,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{MutationError, MutationResult};
    use crate::store::UserRecord;
    use async_trait::async_trait;
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    struct FakeStore {
        record: Option<UserRecord>,
        configs: Vec<CommunityConfig>,
        config_calls: AtomicUsize,
    }

    #[async_trait]
    impl ConfigStore for FakeStore {
        async fn get_user_record(&self, _user_id: &str) -> Result<Option<UserRecord>> {
            Ok(self.record.clone())
        }

        async fn list_community_configs(&self) -> Result<Vec<CommunityConfig>> {
            self.config_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.configs.clone())
        }
    }

    struct FakeAssets {
        holdings: Result<Vec<Asset>>,
        calls: AtomicUsize,
    }

    impl FakeAssets {
        fn ok(holdings: Vec<Asset>) -> Self {
            Self {
                holdings: Ok(holdings),
                calls: AtomicUsize::new(0),
            }
        }

        fn down() -> Self {
            Self {
                holdings: Err(WardenError::AssetLookup("listing service unreachable".into())),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl AssetClient for FakeAssets {
        async fn get_holdings(&self, _wallet_address: &str) -> Result<Vec<Asset>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.holdings {
                Ok(assets) => Ok(assets.clone()),
                Err(_) => Err(WardenError::AssetLookup("listing service unreachable".into())),
            }
        }
    }

    /// Stateful fake directory: mutations actually change the assignment
    /// state, so back-to-back passes exercise idempotence end to end.
    #[derive(Default)]
    struct FakeDirectory {
        assignments: StdMutex<BTreeMap<String, BTreeSet<String>>>,
        fail_grants: BTreeSet<String>,
        fail_reads_for: BTreeSet<String>,
        mutation_calls: AtomicUsize,
    }

    impl FakeDirectory {
        fn with_assignment(self, community_id: &str, role_id: &str) -> Self {
            self.assignments
                .lock()
                .unwrap()
                .entry(community_id.to_string())
                .or_default()
                .insert(role_id.to_string());
            self
        }
    }

    #[async_trait]
    impl DirectoryService for FakeDirectory {
        async fn assigned_roles(&self, _user_id: &str, community_id: &str) -> Result<BTreeSet<String>> {
            if self.fail_reads_for.contains(community_id) {
                return Err(WardenError::Directory("read failed".into()));
            }
            Ok(self
                .assignments
                .lock()
                .unwrap()
                .get(community_id)
                .cloned()
                .unwrap_or_default())
        }

        async fn grant_role(&self, _user_id: &str, role: &RoleIdentifier) -> MutationResult {
            self.mutation_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_grants.contains(&role.to_string()) {
                return Err(MutationError::Rejected("missing permission".into()));
            }
            self.assignments
                .lock()
                .unwrap()
                .entry(role.community_id.clone())
                .or_default()
                .insert(role.role_id.clone());
            Ok(())
        }

        async fn revoke_role(&self, _user_id: &str, role: &RoleIdentifier) -> MutationResult {
            self.mutation_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(roles) = self.assignments.lock().unwrap().get_mut(&role.community_id) {
                roles.remove(&role.role_id);
            }
            Ok(())
        }
    }

    fn guild_x_config() -> CommunityConfig {
        CommunityConfig {
            community_id: "guild-x".into(),
            name: "Guild X".into(),
            rules: vec![EligibilityRule {
                role_id: "member".into(),
                predicate: RulePredicate::OwnsFromCollection {
                    collection: "collection-a".into(),
                },
            }],
        }
    }

    fn linked_record() -> Option<UserRecord> {
        Some(UserRecord {
            user_id: "user-1".into(),
            wallet_address: "wallet-abc".into(),
        })
    }

    fn reconciler(
        store: FakeStore,
        assets: FakeAssets,
        directory: FakeDirectory,
    ) -> (Reconciler, Arc<FakeAssets>, Arc<FakeDirectory>) {
        let assets = Arc::new(assets);
        let directory = Arc::new(directory);
        let r = Reconciler::new(
            Arc::new(store),
            Arc::clone(&assets) as Arc<dyn AssetClient>,
            Arc::clone(&directory) as Arc<dyn DirectoryService>,
            LimiterConfig {
                max_inflight: 4,
                min_interval: std::time::Duration::ZERO,
            },
        );
        (r, assets, directory)
    }

    #[tokio::test]
    async fn test_missing_user_record_short_circuits() {
        let store = Arc::new(FakeStore {
            record: None,
            configs: vec![guild_x_config()],
            config_calls: AtomicUsize::new(0),
        });
        let assets = Arc::new(FakeAssets::ok(vec![]));
        let directory = Arc::new(FakeDirectory::default());
        let r = Reconciler::new(
            Arc::clone(&store) as Arc<dyn ConfigStore>,
            Arc::clone(&assets) as Arc<dyn AssetClient>,
            Arc::clone(&directory) as Arc<dyn DirectoryService>,
            LimiterConfig::default(),
        );

        let err = r.reconcile("user-1").await.unwrap_err();
        assert!(matches!(err, WardenError::UserRecordMissing));

        // Nothing beyond the record fetch was attempted
        assert_eq!(store.config_calls.load(Ordering::SeqCst), 0);
        assert_eq!(assets.calls.load(Ordering::SeqCst), 0);
        assert_eq!(directory.mutation_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_asset_outage_aborts_without_mutations() {
        let store = FakeStore {
            record: linked_record(),
            configs: vec![guild_x_config()],
            config_calls: AtomicUsize::new(0),
        };
        let directory = FakeDirectory::default().with_assignment("guild-x", "member");
        let (r, _assets, directory) = reconciler(store, FakeAssets::down(), directory);

        let err = r.reconcile("user-1").await.unwrap_err();
        assert!(matches!(err, WardenError::AssetLookup(_)));

        // Fail-safe: the previously held role was not revoked
        assert_eq!(directory.mutation_calls.load(Ordering::SeqCst), 0);
        assert!(directory.assignments.lock().unwrap()["guild-x"].contains("member"));
    }

    #[tokio::test]
    async fn test_empty_config_set_short_circuits_before_holdings() {
        let store = FakeStore {
            record: linked_record(),
            configs: vec![],
            config_calls: AtomicUsize::new(0),
        };
        let (r, assets, _directory) =
            reconciler(store, FakeAssets::ok(vec![Asset::new("collection-a", "1")]), FakeDirectory::default());

        let report = r.reconcile("user-1").await.unwrap();
        assert!(report.active.is_empty());
        assert!(report.inactive.is_empty());
        assert_eq!(assets.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_new_holder_gets_role_granted() {
        let store = FakeStore {
            record: linked_record(),
            configs: vec![guild_x_config()],
            config_calls: AtomicUsize::new(0),
        };
        let (r, _assets, directory) = reconciler(
            store,
            FakeAssets::ok(vec![Asset::new("collection-a", "1")]),
            FakeDirectory::default(),
        );

        let report = r.reconcile("user-1").await.unwrap();

        assert_eq!(report.active["guild-x"], BTreeSet::from(["member".to_string()]));
        assert_eq!(report.added["guild-x"], BTreeSet::from(["member".to_string()]));
        assert!(report.persisted["guild-x"].is_empty());
        assert!(report.removed["guild-x"].is_empty());
        assert!(directory.assignments.lock().unwrap()["guild-x"].contains("member"));
    }

    #[tokio::test]
    async fn test_existing_holder_persists_without_calls() {
        let store = FakeStore {
            record: linked_record(),
            configs: vec![guild_x_config()],
            config_calls: AtomicUsize::new(0),
        };
        let directory = FakeDirectory::default().with_assignment("guild-x", "member");
        let (r, _assets, directory) = reconciler(
            store,
            FakeAssets::ok(vec![Asset::new("collection-a", "1")]),
            directory,
        );

        let report = r.reconcile("user-1").await.unwrap();

        assert_eq!(report.persisted["guild-x"], BTreeSet::from(["member".to_string()]));
        assert!(report.added["guild-x"].is_empty());
        assert_eq!(directory.mutation_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sold_out_holder_gets_role_revoked() {
        let store = FakeStore {
            record: linked_record(),
            configs: vec![guild_x_config()],
            config_calls: AtomicUsize::new(0),
        };
        let directory = FakeDirectory::default().with_assignment("guild-x", "member");
        let (r, _assets, directory) = reconciler(store, FakeAssets::ok(vec![]), directory);

        let report = r.reconcile("user-1").await.unwrap();

        assert_eq!(report.inactive["guild-x"], BTreeSet::from(["member".to_string()]));
        assert_eq!(report.removed["guild-x"], BTreeSet::from(["member".to_string()]));
        assert!(!directory.assignments.lock().unwrap()["guild-x"].contains("member"));
    }

    #[tokio::test]
    async fn test_second_pass_is_idempotent() {
        let store = FakeStore {
            record: linked_record(),
            configs: vec![guild_x_config()],
            config_calls: AtomicUsize::new(0),
        };
        let (r, _assets, directory) = reconciler(
            store,
            FakeAssets::ok(vec![Asset::new("collection-a", "1")]),
            FakeDirectory::default(),
        );

        let first = r.reconcile("user-1").await.unwrap();
        assert_eq!(role_count(&first.added), 1);

        let second = r.reconcile("user-1").await.unwrap();
        assert!(is_role_map_empty(&second.added));
        assert!(is_role_map_empty(&second.removed));
        assert_eq!(second.persisted, first.active);
    }

    #[tokio::test]
    async fn test_no_matching_holdings_issue_no_mutations() {
        let store = FakeStore {
            record: linked_record(),
            configs: vec![guild_x_config()],
            config_calls: AtomicUsize::new(0),
        };
        let (r, _assets, directory) = reconciler(
            store,
            FakeAssets::ok(vec![Asset::new("collection-unrelated", "9")]),
            FakeDirectory::default(),
        );

        let report = r.reconcile("user-1").await.unwrap();
        assert!(is_role_map_empty(&report.active));
        assert_eq!(directory.mutation_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_assignment_read_skips_community_only() {
        let mut configs = vec![guild_x_config()];
        configs.push(CommunityConfig {
            community_id: "guild-y".into(),
            name: "Guild Y".into(),
            rules: vec![EligibilityRule {
                role_id: "holder".into(),
                predicate: RulePredicate::OwnsFromCollection {
                    collection: "collection-a".into(),
                },
            }],
        });
        let store = FakeStore {
            record: linked_record(),
            configs,
            config_calls: AtomicUsize::new(0),
        };
        let directory = FakeDirectory {
            fail_reads_for: BTreeSet::from(["guild-y".to_string()]),
            ..Default::default()
        };
        let (r, _assets, directory) = reconciler(
            store,
            FakeAssets::ok(vec![Asset::new("collection-a", "1")]),
            directory,
        );

        let report = r.reconcile("user-1").await.unwrap();

        assert_eq!(report.skipped_communities, 1);
        assert!(!report.active.contains_key("guild-y"));
        assert_eq!(report.added["guild-x"], BTreeSet::from(["member".to_string()]));
        // Only guild-x's grant was issued
        assert_eq!(directory.mutation_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_partial_grant_failure_does_not_fail_pass() {
        let config = CommunityConfig {
            community_id: "guild-x".into(),
            name: "Guild X".into(),
            rules: vec![
                EligibilityRule {
                    role_id: "member".into(),
                    predicate: RulePredicate::OwnsFromCollection {
                        collection: "collection-a".into(),
                    },
                },
                EligibilityRule {
                    role_id: "holder".into(),
                    predicate: RulePredicate::OwnsFromCollection {
                        collection: "collection-a".into(),
                    },
                },
            ],
        };
        let store = FakeStore {
            record: linked_record(),
            configs: vec![config],
            config_calls: AtomicUsize::new(0),
        };
        let directory = FakeDirectory {
            fail_grants: BTreeSet::from(["guild-x/member".to_string()]),
            ..Default::default()
        };
        let (r, _assets, _directory) = reconciler(
            store,
            FakeAssets::ok(vec![Asset::new("collection-a", "1")]),
            directory,
        );

        let report = r.reconcile("user-1").await.unwrap();

        assert_eq!(report.failed_mutations, 1);
        assert!(!report.added["guild-x"].contains("member"));
        assert!(report.added["guild-x"].contains("holder"));
        assert!(!report.all_mutations_failed());
    }
}
