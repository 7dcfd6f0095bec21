//! Test support for rules and fixes.
//!
//! Expected locations are written inline with `[|...|]` markers (or `[||]`
//! for an empty span):
//!
//! ```
//! use ruleforge::lint::rules::BoolComparisonRule;
//! use ruleforge::testing::{assert_diagnostics, assert_fix};
//!
//! assert_diagnostics(BoolComparisonRule, "class C { bool M(bool b) => b [|==|] true; }");
//! assert_fix(
//!     BoolComparisonRule,
//!     "class C { bool M(bool b) => b [|==|] false; }",
//!     "class C { bool M(bool b) => !b; }",
//! );
//! ```

use std::path::Path;
use std::sync::Arc;

use anyhow::anyhow;

use crate::config::AnalyzerConfig;
use crate::error::{Error, Result};
use crate::fix::{BatchReport, CodeFix, FixEngine, FixRegistry};
use crate::lint::{
    CancellationToken, Diagnostic, DiagnosticEngine, Dispatcher, Rule, RuleContext, RuleRegistry,
};
use crate::semantic::SemanticModel;
use crate::syntax::{self, TextSpan};

const OPEN: &str = "[|";
const CLOSE: &str = "|]";

/// Source text with its marked spans removed and recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedSource {
    pub source: String,
    /// Marked spans ordered by start, then end.
    pub spans: Vec<TextSpan>,
}

impl MarkedSource {
    /// Strip the markers from `marked`. Markers may nest.
    pub fn parse(marked: &str) -> Result<Self> {
        let mut source = String::with_capacity(marked.len());
        let mut open = Vec::new();
        let mut spans = Vec::new();
        let mut rest = marked;

        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix(OPEN) {
                open.push(source.len());
                rest = after;
            } else if let Some(after) = rest.strip_prefix(CLOSE) {
                let start = open
                    .pop()
                    .ok_or_else(|| anyhow!("'{}' at offset {} has no opening marker", CLOSE, source.len()))?;
                spans.push(TextSpan::new(start, source.len()));
                rest = after;
            } else {
                let mut chars = rest.chars();
                if let Some(c) = chars.next() {
                    source.push(c);
                }
                rest = chars.as_str();
            }
        }
        if let Some(start) = open.pop() {
            return Err(Error::Other(anyhow!(
                "'{}' at offset {} is never closed",
                OPEN,
                start
            )));
        }

        spans.sort_by_key(|s| (s.start, s.end));
        Ok(Self { source, spans })
    }

    /// The only marked span; fails when there are none or several.
    pub fn single_span(&self) -> Result<TextSpan> {
        match self.spans.as_slice() {
            [span] => Ok(*span),
            spans => Err(Error::Other(anyhow!(
                "expected exactly one marked span, found {}",
                spans.len()
            ))),
        }
    }
}

fn marked(text: &str) -> MarkedSource {
    MarkedSource::parse(text).unwrap_or_else(|e| panic!("invalid marked source: {}", e))
}

fn model(source: &str) -> SemanticModel {
    let tree = syntax::parse(source).unwrap_or_else(|e| panic!("test source does not parse: {}", e));
    SemanticModel::new(tree)
}

fn registry<R: Rule + 'static>(rule: Arc<R>) -> RuleRegistry {
    let mut registry = RuleRegistry::new();
    registry.register(rule);
    registry
}

fn run(
    registry: &RuleRegistry,
    model: &SemanticModel,
    config: &AnalyzerConfig,
    path: Option<&Path>,
) -> Vec<Diagnostic> {
    let ctx = RuleContext::new(model, config, path);
    let raw = Dispatcher::new(registry)
        .run(&ctx, &CancellationToken::new())
        .unwrap_or_else(|e| panic!("analysis failed: {}", e));
    DiagnosticEngine::new(config).finalize(raw)
}

fn describe(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| format!("  {} {} {}", d.rule_id, d.span, d.message))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Assert that `rule` reports exactly the marked spans.
pub fn assert_diagnostics<R: Rule + 'static>(rule: R, marked_source: &str) {
    assert_diagnostics_with(rule, marked_source, &AnalyzerConfig::new(), None);
}

/// [`assert_diagnostics`] with explicit configuration and file path.
pub fn assert_diagnostics_with<R: Rule + 'static>(
    rule: R,
    marked_source: &str,
    config: &AnalyzerConfig,
    path: Option<&Path>,
) {
    let marked = marked(marked_source);
    let model = model(&marked.source);
    let diagnostics = run(&registry(Arc::new(rule)), &model, config, path);
    let mut actual: Vec<TextSpan> = diagnostics.iter().map(|d| d.span).collect();
    actual.sort_by_key(|s| (s.start, s.end));
    assert_eq!(
        actual,
        marked.spans,
        "reported spans differ from the marked ones; diagnostics:\n{}",
        describe(&diagnostics)
    );
}

fn diagnostic_at(diagnostics: &[Diagnostic], span: TextSpan) -> &Diagnostic {
    diagnostics
        .iter()
        .find(|d| d.span == span)
        .unwrap_or_else(|| {
            panic!(
                "no diagnostic at marked span {}; diagnostics:\n{}",
                span,
                describe(diagnostics)
            )
        })
}

/// Assert that fixing the diagnostic at the single marked span turns the
/// source into `expected`.
pub fn assert_fix<R: Rule + CodeFix + 'static>(rule: R, marked_source: &str, expected: &str) {
    let marked = marked(marked_source);
    let span = marked.single_span().unwrap_or_else(|e| panic!("{}", e));
    let rule = Arc::new(rule);
    let rules = registry(rule.clone());
    let mut fixes = FixRegistry::new();
    fixes.register(rule);

    let config = AnalyzerConfig::new();
    let model = model(&marked.source);
    let diagnostics = run(&rules, &model, &config, None);
    let diagnostic = diagnostic_at(&diagnostics, span);
    let ctx = RuleContext::new(&model, &config, None);
    let fixed = FixEngine::new(&rules, &fixes)
        .apply_fix(&ctx, diagnostic)
        .unwrap_or_else(|e| panic!("fix failed: {}", e));
    assert_eq!(fixed.source(), expected);
}

/// Assert that the diagnostic at the single marked span exists but its fix
/// reports the shape as unsupported.
pub fn assert_not_fixable<R: Rule + CodeFix + 'static>(rule: R, marked_source: &str) {
    let marked = marked(marked_source);
    let span = marked.single_span().unwrap_or_else(|e| panic!("{}", e));
    let rule = Arc::new(rule);
    let rules = registry(rule.clone());
    let mut fixes = FixRegistry::new();
    fixes.register(rule);

    let config = AnalyzerConfig::new();
    let model = model(&marked.source);
    let diagnostics = run(&rules, &model, &config, None);
    let diagnostic = diagnostic_at(&diagnostics, span);
    let ctx = RuleContext::new(&model, &config, None);
    match FixEngine::new(&rules, &fixes).compute_fix(&ctx, diagnostic) {
        Err(Error::NotFixable { .. }) => {}
        Ok(edit) => panic!("expected no fix, got {:?}", edit),
        Err(e) => panic!("expected NotFixable, got {}", e),
    }
}

/// Run the batch fix for `rule` over `source` and assert the final text.
///
/// Returns the report for further checks on passes and leftovers.
pub fn assert_batch_fix<R: Rule + CodeFix + 'static>(rule: R, source: &str, expected: &str) -> BatchReport {
    let rule = Arc::new(rule);
    let rules = registry(rule.clone());
    let mut fixes = FixRegistry::new();
    fixes.register(rule);

    let tree = syntax::parse(source).unwrap_or_else(|e| panic!("test source does not parse: {}", e));
    let report = FixEngine::new(&rules, &fixes)
        .fix_all(tree, &AnalyzerConfig::new(), None, &CancellationToken::new())
        .unwrap_or_else(|e| panic!("batch fix failed: {}", e));
    assert_eq!(report.source, expected);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lint::rules::BoolComparisonRule;

    #[test]
    fn strips_markers_and_records_spans() {
        let marked = MarkedSource::parse("a [|bc|] d[||]e").unwrap();
        assert_eq!(marked.source, "a bc de");
        assert_eq!(marked.spans, vec![TextSpan::new(2, 4), TextSpan::new(6, 6)]);
    }

    #[test]
    fn nested_markers() {
        let marked = MarkedSource::parse("[|a[|b|]|]").unwrap();
        assert_eq!(marked.source, "ab");
        assert_eq!(marked.spans, vec![TextSpan::new(0, 2), TextSpan::new(1, 2)]);
    }

    #[test]
    fn multibyte_text_keeps_byte_offsets() {
        let marked = MarkedSource::parse("é[|x|]").unwrap();
        assert_eq!(marked.spans, vec![TextSpan::new(2, 3)]);
    }

    #[test]
    fn unbalanced_markers_are_errors() {
        assert!(MarkedSource::parse("a [|b").is_err());
        assert!(MarkedSource::parse("a |]b").is_err());
    }

    #[test]
    fn single_span_requires_exactly_one() {
        assert!(MarkedSource::parse("a").unwrap().single_span().is_err());
        assert!(MarkedSource::parse("[|a|][|b|]").unwrap().single_span().is_err());
        assert_eq!(
            MarkedSource::parse("x[|a|]").unwrap().single_span().unwrap(),
            TextSpan::new(1, 2)
        );
    }

    #[test]
    #[should_panic(expected = "reported spans differ")]
    fn missing_marker_fails_the_assertion() {
        assert_diagnostics(BoolComparisonRule, "class C { bool M(bool b) => b == true; }");
    }
}
