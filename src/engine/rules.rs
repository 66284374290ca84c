//! Eligibility rules and their predicates
//!
//! A community's config is an ordered list of rules, each mapping an
//! asset-ownership predicate to a role in that community. Predicates are a
//! closed tagged-variant type evaluated by a single dispatch function, so the
//! evaluator stays pure and exhaustively testable. The `type` tag keeps rule
//! documents in the config store human-editable.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One owned asset as reported by the asset lookup service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Asset {
    /// Collection (contract/series) the asset belongs to
    pub collection: String,
    /// Token identifier within the collection
    pub token_id: String,
    /// Flat trait map, e.g. {"rarity": "legendary"}
    #[serde(default)]
    pub traits: HashMap<String, String>,
}

impl Asset {
    pub fn new(collection: impl Into<String>, token_id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            token_id: token_id.into(),
            traits: HashMap::new(),
        }
    }

    pub fn with_trait(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.traits.insert(name.into(), value.into());
        self
    }
}

/// Asset-ownership predicate for one eligibility rule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RulePredicate {
    /// Holds at least one asset from the collection
    OwnsFromCollection { collection: String },
    /// Holds an asset carrying the given trait, optionally restricted
    /// to one collection
    OwnsWithTrait {
        #[serde(skip_serializing_if = "Option::is_none")]
        collection: Option<String>,
        trait_name: String,
        trait_value: String,
    },
    /// Holds at least `count` assets from the collection
    OwnsAtLeastN { collection: String, count: usize },
}

impl RulePredicate {
    /// Test the predicate against a wallet's holdings. Pure.
    pub fn matches(&self, holdings: &[Asset]) -> bool {
        match self {
            RulePredicate::OwnsFromCollection { collection } => {
                holdings.iter().any(|a| &a.collection == collection)
            }
            RulePredicate::OwnsWithTrait {
                collection,
                trait_name,
                trait_value,
            } => holdings.iter().any(|a| {
                let in_scope = collection
                    .as_ref()
                    .map(|c| &a.collection == c)
                    .unwrap_or(true);
                in_scope && a.traits.get(trait_name) == Some(trait_value)
            }),
            RulePredicate::OwnsAtLeastN { collection, count } => {
                holdings.iter().filter(|a| &a.collection == collection).count() >= *count
            }
        }
    }
}

/// One eligibility rule: predicate → role within the owning community
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EligibilityRule {
    /// Role granted when the predicate matches
    pub role_id: String,
    /// Ownership predicate
    pub predicate: RulePredicate,
}

/// One community's eligibility configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommunityConfig {
    /// Community (server/guild) identifier in the directory service
    pub community_id: String,
    /// Human-readable community name, for logs only
    pub name: String,
    /// Ordered rule list; multiple rules may target the same role (OR semantics)
    pub rules: Vec<EligibilityRule>,
}
