//! Eligibility evaluator
//!
//! Decides which roles a wallet has earned in one community. Pure function of
//! its inputs — no side effects, no external calls — which is what lets the
//! aggregator run it concurrently and the tests exercise it in isolation.

use std::collections::BTreeSet;

use super::rules::{Asset, CommunityConfig};

/// Evaluate one community's rules against a wallet's holdings.
///
/// Rules are independent; duplicate grants from multiple matching rules
/// collapse by set union. A config with zero rules yields an empty set.
pub fn evaluate(holdings: &[Asset], config: &CommunityConfig) -> BTreeSet<String> {
    config
        .rules
        .iter()
        .filter(|rule| rule.predicate.matches(holdings))
        .map(|rule| rule.role_id.clone())
        .collect()
}

/// Every role referenced anywhere in a community's config.
///
/// This is the community's role universe: the diff engine never touches roles
/// outside it.
pub fn role_universe(config: &CommunityConfig) -> BTreeSet<String> {
    config.rules.iter().map(|rule| rule.role_id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::rules::{EligibilityRule, RulePredicate};

    fn config(rules: Vec<EligibilityRule>) -> CommunityConfig {
        CommunityConfig {
            community_id: "guild-x".into(),
            name: "Guild X".into(),
            rules,
        }
    }

    fn owns(collection: &str, role: &str) -> EligibilityRule {
        EligibilityRule {
            role_id: role.into(),
            predicate: RulePredicate::OwnsFromCollection {
                collection: collection.into(),
            },
        }
    }

    #[test]
    fn test_zero_rules_yields_empty_set() {
        let holdings = vec![Asset::new("collection-a", "1")];
        assert!(evaluate(&holdings, &config(vec![])).is_empty());
        assert!(role_universe(&config(vec![])).is_empty());
    }

    #[test]
    fn test_matching_rule_grants_role() {
        let holdings = vec![Asset::new("collection-a", "1")];
        let cfg = config(vec![owns("collection-a", "member"), owns("collection-b", "whale")]);

        let earned = evaluate(&holdings, &cfg);
        assert_eq!(earned, BTreeSet::from(["member".to_string()]));
    }

    #[test]
    fn test_duplicate_role_grants_collapse() {
        // Two rules targeting the same role: OR semantics, one grant
        let holdings = vec![
            Asset::new("collection-a", "1"),
            Asset::new("collection-b", "2"),
        ];
        let cfg = config(vec![owns("collection-a", "member"), owns("collection-b", "member")]);

        let earned = evaluate(&holdings, &cfg);
        assert_eq!(earned.len(), 1);
        assert!(earned.contains("member"));
    }

    #[test]
    fn test_empty_holdings_earn_nothing() {
        let cfg = config(vec![owns("collection-a", "member")]);
        assert!(evaluate(&[], &cfg).is_empty());
        // The universe is unaffected by holdings
        assert_eq!(role_universe(&cfg).len(), 1);
    }
}
