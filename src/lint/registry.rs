//! Rule registry.
//!
//! The [`RuleRegistry`] stores all available rules and a prebuilt table
//! from [`NodeKind`] to the rules interested in it, so the dispatcher finds
//! the rules for a node with one hash lookup.

use std::collections::HashMap;
use std::sync::Arc;

use super::rule::{Rule, RuleId};
use super::rules::{
    BoolComparisonRule, CombineLinqRule, CountComparisonRule, FileNameRule, RedundantElseRule,
};
use crate::syntax::NodeKind;

/// Registry of all available rules, in registration order.
#[derive(Default)]
pub struct RuleRegistry {
    rules: Vec<Arc<dyn Rule>>,
    by_id: HashMap<RuleId, usize>,
    by_kind: HashMap<NodeKind, Vec<usize>>,
}

impl RuleRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with all built-in rules.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(BoolComparisonRule));
        registry.register(Arc::new(CountComparisonRule));
        registry.register(Arc::new(CombineLinqRule));
        registry.register(Arc::new(FileNameRule));
        registry.register(Arc::new(RedundantElseRule));
        registry
    }

    /// Register a rule. A rule with an existing ID replaces the old one.
    pub fn register(&mut self, rule: Arc<dyn Rule>) {
        let id = rule.id();
        if let Some(&index) = self.by_id.get(&id) {
            tracing::debug!(rule = %id, "replacing registered rule");
            for rules in self.by_kind.values_mut() {
                rules.retain(|r| *r != index);
            }
            self.index_kinds(index, rule.as_ref());
            self.rules[index] = rule;
            return;
        }
        let index = self.rules.len();
        self.index_kinds(index, rule.as_ref());
        self.by_id.insert(id, index);
        self.rules.push(rule);
    }

    fn index_kinds(&mut self, index: usize, rule: &dyn Rule) {
        for kind in rule.interests() {
            let rules = self.by_kind.entry(*kind).or_default();
            if !rules.contains(&index) {
                rules.push(index);
                rules.sort_unstable();
            }
        }
    }

    /// Get a rule by ID.
    pub fn get(&self, id: &RuleId) -> Option<&dyn Rule> {
        self.by_id.get(id).map(|&i| self.rules[i].as_ref())
    }

    /// Rule at a registration index.
    pub fn rule(&self, index: usize) -> &dyn Rule {
        self.rules[index].as_ref()
    }

    /// Registration indices of the rules interested in `kind`.
    pub fn rules_for(&self, kind: NodeKind) -> &[usize] {
        self.by_kind.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterate over all rules in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    /// Get the number of registered rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.rules.iter().map(|r| r.id()))
            .finish()
    }
}
