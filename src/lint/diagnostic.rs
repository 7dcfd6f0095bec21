//! Diagnostics and the diagnostic engine.
//!
//! Rules emit [`Diagnostic`]s into a [`DiagnosticSink`]. Once traversal is
//! finished, [`DiagnosticEngine::finalize`] removes duplicates, applies the
//! configured severity and puts the list in a stable order. Everything here
//! is plain data; nothing is printed or logged.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use super::rule::{RuleId, Severity};
use crate::config::AnalyzerConfig;
use crate::syntax::TextSpan;

/// A finding produced by a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// The rule that produced this diagnostic.
    pub rule_id: RuleId,
    /// Severity of this diagnostic.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// Where the finding is anchored.
    pub span: TextSpan,
    /// Related locations, in the order the rule added them.
    pub additional_spans: Vec<TextSpan>,
    /// Rule-computed data handed to the fix.
    pub properties: BTreeMap<String, String>,
}

impl Diagnostic {
    /// Create a new diagnostic.
    pub fn new(
        rule_id: RuleId,
        severity: Severity,
        span: TextSpan,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id,
            severity,
            message: message.into(),
            span,
            additional_spans: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    /// Add a related location.
    pub fn with_additional_span(mut self, span: TextSpan) -> Self {
        self.additional_spans.push(span);
        self
    }

    /// Attach a property for the fix.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Look up a property.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// Collects the diagnostics of one rule invocation.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
    skip_descendants: bool,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a finding.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Mark the current node's subtree as handled; no rule visits its
    /// descendants.
    pub fn skip_descendants(&mut self) {
        self.skip_descendants = true;
    }

    pub fn skips_descendants(&self) -> bool {
        self.skip_descendants
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

/// Aggregates raw rule output into the final diagnostic list.
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticEngine<'a> {
    config: &'a AnalyzerConfig,
}

impl<'a> DiagnosticEngine<'a> {
    pub fn new(config: &'a AnalyzerConfig) -> Self {
        Self { config }
    }

    /// De-duplicate by `(rule_id, span)` keeping the first occurrence, apply
    /// configured severity (dropping disabled rules) and sort stably by
    /// `(span.start, rule_id)`.
    pub fn finalize(&self, raw: Vec<Diagnostic>) -> Vec<Diagnostic> {
        let mut seen = HashSet::new();
        let mut diagnostics: Vec<Diagnostic> = raw
            .into_iter()
            .filter(|d| seen.insert((d.rule_id.clone(), d.span)))
            .filter_map(|mut d| {
                d.severity = self.config.severity_for(&d.rule_id, d.severity)?;
                Some(d)
            })
            .collect();
        diagnostics.sort_by(|a, b| {
            a.span
                .start
                .cmp(&b.span.start)
                .then_with(|| a.rule_id.cmp(&b.rule_id))
        });
        diagnostics
    }
}

/// Counts of diagnostics by severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
    pub hidden: usize,
}

impl Summary {
    pub fn of<'d>(diagnostics: impl IntoIterator<Item = &'d Diagnostic>) -> Self {
        diagnostics
            .into_iter()
            .fold(Summary::default(), |mut summary, d| {
                summary.total += 1;
                match d.severity {
                    Severity::Error => summary.errors += 1,
                    Severity::Warning => summary.warnings += 1,
                    Severity::Info => summary.infos += 1,
                    Severity::Hidden => summary.hidden += 1,
                }
                summary
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diag(rule: &str, start: usize, message: &str) -> Diagnostic {
        Diagnostic::new(
            RuleId::new(rule),
            Severity::Warning,
            TextSpan::new(start, start + 1),
            message,
        )
    }

    #[test]
    fn diagnostic_creation() {
        let d = diag("MA0001", 3, "Test message")
            .with_additional_span(TextSpan::new(9, 10))
            .with_property("replacement", "Any");

        assert_eq!(d.rule_id, RuleId::new("MA0001"));
        assert_eq!(d.severity, Severity::Warning);
        assert_eq!(d.additional_spans, vec![TextSpan::new(9, 10)]);
        assert_eq!(d.property("replacement"), Some("Any"));
        assert_eq!(d.property("missing"), None);
    }

    #[test]
    fn finalize_keeps_first_duplicate() {
        let config = AnalyzerConfig::new();
        let engine = DiagnosticEngine::new(&config);
        let out = engine.finalize(vec![diag("MA0001", 3, "first"), diag("MA0001", 3, "second")]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].message, "first");
    }

    #[test]
    fn finalize_sorts_by_start_then_rule() {
        let config = AnalyzerConfig::new();
        let engine = DiagnosticEngine::new(&config);
        let out = engine.finalize(vec![
            diag("MA0002", 5, "c"),
            diag("MA0002", 1, "b"),
            diag("MA0001", 5, "a"),
        ]);
        let order: Vec<_> = out.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[test]
    fn finalize_applies_configured_severity() {
        let config = AnalyzerConfig::new()
            .with("MA0001.severity", "error")
            .with("MA0002.severity", "none");
        let engine = DiagnosticEngine::new(&config);
        let out = engine.finalize(vec![diag("MA0001", 0, "a"), diag("MA0002", 1, "b")]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].severity, Severity::Error);
    }

    #[test]
    fn sink_tracks_skip_requests() {
        let mut sink = DiagnosticSink::new();
        assert!(sink.is_empty());
        sink.report(diag("MA0001", 0, "a"));
        sink.skip_descendants();
        assert!(sink.skips_descendants());
        assert_eq!(sink.into_diagnostics().len(), 1);
    }

    #[test]
    fn summary_counts_by_severity() {
        let mut error = diag("MA0001", 0, "e");
        error.severity = Severity::Error;
        let summary = Summary::of(&[error, diag("MA0002", 1, "w")]);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.warnings, 1);
    }
}
