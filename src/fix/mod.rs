//! Turning diagnostics into verified source rewrites.
//!
//! A [`CodeFix`] computes one [`TextEdit`] for one diagnostic. The
//! [`FixEngine`] applies single fixes and runs the iterative batch fix that
//! combines many non-overlapping edits per pass.

pub mod edit;
pub mod engine;

pub use edit::{apply_edits, TextEdit};
pub use engine::{BatchReport, BatchState, FixEngine, DEFAULT_MAX_PASSES};

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::lint::rules::{BoolComparisonRule, CombineLinqRule, CountComparisonRule, RedundantElseRule};
use crate::lint::{Diagnostic, RuleContext, RuleId};

/// Computes the rewrite for diagnostics of one rule.
///
/// Fixes are pure: they read the tree and semantic model of the context the
/// diagnostic was reported against and return an edit relative to that
/// tree's source. Shapes a fix cannot handle are reported as
/// [`Error::NotFixable`](crate::error::Error::NotFixable).
pub trait CodeFix: Send + Sync {
    /// The rule whose diagnostics this fix handles.
    fn rule_id(&self) -> RuleId;

    /// Short description shown to users.
    fn title(&self) -> &str;

    /// Compute the edit for `diagnostic`.
    fn compute(&self, ctx: &RuleContext<'_>, diagnostic: &Diagnostic) -> Result<TextEdit>;
}

/// Fixes keyed by rule ID.
#[derive(Default)]
pub struct FixRegistry {
    fixes: HashMap<RuleId, Arc<dyn CodeFix>>,
}

impl FixRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the fixes of all built-in rules.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(BoolComparisonRule));
        registry.register(Arc::new(CountComparisonRule));
        registry.register(Arc::new(CombineLinqRule));
        registry.register(Arc::new(RedundantElseRule));
        registry
    }

    /// Register a fix, replacing any fix for the same rule.
    pub fn register(&mut self, fix: Arc<dyn CodeFix>) {
        self.fixes.insert(fix.rule_id(), fix);
    }

    pub fn get(&self, rule_id: &RuleId) -> Option<&dyn CodeFix> {
        self.fixes.get(rule_id).map(|f| f.as_ref())
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }
}

impl std::fmt::Debug for FixRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<_> = self.fixes.keys().collect();
        ids.sort();
        f.debug_list().entries(ids).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_cover_fixable_rules() {
        let registry = FixRegistry::with_builtins();
        assert_eq!(registry.len(), 4);
        for id in ["MA0029", "MA0031", "MA0073", "RF0001"] {
            assert!(registry.get(&RuleId::new(id)).is_some(), "{}", id);
        }
        assert!(registry.get(&RuleId::new("MA0048")).is_none());
    }

    #[test]
    fn builtin_rules_advertise_fixes() {
        let rules = crate::lint::RuleRegistry::with_builtins();
        let fixes = FixRegistry::with_builtins();
        for rule in rules.iter() {
            assert_eq!(rule.supports_fix(), fixes.get(&rule.id()).is_some(), "{}", rule.id());
        }
    }
}
