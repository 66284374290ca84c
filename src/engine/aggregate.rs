//! Multi-community aggregator
//!
//! Runs the evaluator across every configured community and merges the results
//! into active/inactive role maps. Holdings are fetched once by the caller and
//! shared across communities so every community sees the same snapshot.

use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, error};

use super::evaluate::{evaluate, role_universe};
use super::roles::RoleMap;
use super::rules::{Asset, CommunityConfig};

/// Active and inactive role sets per community.
///
/// For each community the two sets are mutually exclusive and together cover
/// every role referenced by that community's config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateResult {
    pub active: RoleMap,
    pub inactive: RoleMap,
}

/// Evaluate every community against one holdings snapshot.
///
/// Per-community evaluation has no cross-community data dependency, so each
/// community runs as its own task. An empty config list yields empty maps.
pub async fn aggregate(holdings: Arc<Vec<Asset>>, configs: &[CommunityConfig]) -> AggregateResult {
    let tasks = configs.iter().cloned().map(|config| {
        let holdings = Arc::clone(&holdings);
        tokio::spawn(async move {
            let active = evaluate(&holdings, &config);
            let mut inactive = role_universe(&config);
            inactive.retain(|role| !active.contains(role));
            (config.community_id, active, inactive)
        })
    });

    let mut result = AggregateResult::default();
    for joined in join_all(tasks).await {
        // Evaluation is pure and cannot panic; a join error here is a bug
        let (community_id, active, inactive) = match joined {
            Ok(parts) => parts,
            Err(e) => {
                error!("community evaluation task panicked: {e}");
                continue;
            }
        };
        debug!(
            community_id = %community_id,
            active = active.len(),
            inactive = inactive.len(),
            "community evaluated"
        );
        result.active.insert(community_id.clone(), active);
        result.inactive.insert(community_id, inactive);
    }

    result
}
