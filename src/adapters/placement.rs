//! In-Memory Placement Rules
//!
//! A simple rule table implementing the `PlacementRules` port. The CLI and
//! tests use it where no real cluster map is available.

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::{PlacementRules, RuleMode};
use crate::error::{Error, Result};

/// A single placement rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementRule {
    pub id: i32,
    pub name: String,
    pub root: String,
    pub failure_domain: String,
    pub mode: RuleMode,
}

/// Rule table keyed by name; ids are assigned sequentially from zero.
#[derive(Debug, Default)]
pub struct InMemoryPlacementRules {
    rules: BTreeMap<String, PlacementRule>,
    next_id: i32,
}

impl InMemoryPlacementRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&PlacementRule> {
        self.rules.get(name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl PlacementRules for InMemoryPlacementRules {
    fn rule_id(&self, name: &str) -> Option<i32> {
        self.rules.get(name).map(|r| r.id)
    }

    fn add_simple_rule(
        &mut self,
        name: &str,
        root: &str,
        failure_domain: &str,
        mode: RuleMode,
    ) -> Result<i32> {
        if name.is_empty() || root.is_empty() || failure_domain.is_empty() {
            return Err(Error::Placement(
                "rule name, root and failure domain must be non-empty".into(),
            ));
        }
        if self.rules.contains_key(name) {
            return Err(Error::Placement(format!("rule {} already exists", name)));
        }

        let id = self.next_id;
        self.next_id += 1;
        self.rules.insert(
            name.to_string(),
            PlacementRule {
                id,
                name: name.to_string(),
                root: root.to_string(),
                failure_domain: failure_domain.to_string(),
                mode,
            },
        );
        debug!(rule = name, id, root, failure_domain, %mode, "rule added");
        Ok(id)
    }
}
