//! Rule definitions.
//!
//! This module provides the core traits and types for defining rules:
//!
//! - [`Rule`] - The trait that all rules must implement
//! - [`RuleId`] - Unique identifier for a rule
//! - [`Severity`] - Severity level for diagnostics (Hidden, Info, Warning, Error)
//! - [`RuleContext`] - Everything a rule may look at while checking a node

use std::path::Path;

use serde::Serialize;

use super::diagnostic::DiagnosticSink;
use crate::config::AnalyzerConfig;
use crate::semantic::SemanticModel;
use crate::syntax::{NodeId, NodeKind, Tree};

/// Unique identifier for a rule, e.g. `MA0031`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RuleId(pub String);

impl RuleId {
    /// Create a new rule ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Reported to tooling only, never shown by default.
    Hidden,
    /// Informational suggestion.
    Info,
    /// Warning that should be addressed.
    Warning,
    /// Error that should fail the check.
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Hidden => write!(f, "hidden"),
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Inputs available to a rule invocation.
///
/// Configuration is passed explicitly; rules never consult global state.
#[derive(Clone, Copy)]
pub struct RuleContext<'a> {
    pub model: &'a SemanticModel,
    pub config: &'a AnalyzerConfig,
    /// Path of the analyzed file, when it came from disk.
    pub path: Option<&'a Path>,
}

impl<'a> RuleContext<'a> {
    pub fn new(model: &'a SemanticModel, config: &'a AnalyzerConfig, path: Option<&'a Path>) -> Self {
        Self {
            model,
            config,
            path,
        }
    }

    pub fn tree(&self) -> &'a Tree {
        self.model.tree()
    }
}

/// A check over syntax nodes.
///
/// Rules are registered once and shared across threads, so they hold no
/// mutable state. The dispatcher calls [`Rule::check`] for every node whose
/// kind appears in [`Rule::interests`].
pub trait Rule: Send + Sync {
    /// Unique identifier for this rule.
    fn id(&self) -> RuleId;

    /// Human-readable name of the rule.
    fn name(&self) -> &str;

    /// Description of what this rule checks.
    fn description(&self) -> &str;

    /// Default severity for this rule.
    fn default_severity(&self) -> Severity;

    /// Node kinds this rule wants to see.
    fn interests(&self) -> &[NodeKind];

    /// Check one node and report findings to `sink`.
    fn check(&self, ctx: &RuleContext<'_>, node: NodeId, sink: &mut DiagnosticSink);

    /// Whether this rule supports auto-fix.
    fn supports_fix(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_id_equality() {
        let id1 = RuleId::new("MA0031");
        let id2 = RuleId::new("MA0031");
        let id3 = RuleId::new("MA0020");

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
        assert!(id3 < id1);
    }

    #[test]
    fn rule_id_display() {
        let id = RuleId::new("MA0073");
        assert_eq!(format!("{}", id), "MA0073");
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Hidden < Severity::Info);
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
    }

    #[test]
    fn severity_display() {
        assert_eq!(format!("{}", Severity::Hidden), "hidden");
        assert_eq!(format!("{}", Severity::Info), "info");
        assert_eq!(format!("{}", Severity::Warning), "warning");
        assert_eq!(format!("{}", Severity::Error), "error");
    }
}
