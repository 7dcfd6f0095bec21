//! Single and batch fix application.
//!
//! The batch fix is an explicit state machine:
//!
//! ```text
//! Idle -> Analyzing -> HasDiagnostics -> Selecting -> Applying -> Reparsing -> Analyzing ...
//!                                    \-> Done
//! ```
//!
//! Every pass analyzes the current tree, greedily selects non-overlapping
//! edits in diagnostic order, applies them from the end of the text
//! backwards and re-parses. Edits skipped because they overlap a selected
//! one are recomputed against the new tree in the next pass.

use std::collections::HashSet;
use std::path::Path;

use super::edit::{apply_edits, TextEdit};
use super::FixRegistry;
use crate::config::AnalyzerConfig;
use crate::error::{Error, Result};
use crate::lint::{
    CancellationToken, Diagnostic, DiagnosticEngine, Dispatcher, RuleContext, RuleId, RuleRegistry,
};
use crate::semantic::SemanticModel;
use crate::syntax::Tree;

/// Pass budget used when none is configured.
pub const DEFAULT_MAX_PASSES: usize = 10;

/// States of the batch fixer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    Analyzing,
    HasDiagnostics,
    Selecting,
    Applying,
    Reparsing,
    Done,
}

/// Outcome of a batch fix.
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Source text after the last pass.
    pub source: String,
    /// Number of passes that applied edits.
    pub passes: usize,
    /// Total edits applied.
    pub applied: usize,
    /// All diagnostics of the final analysis.
    pub diagnostics: Vec<Diagnostic>,
    /// Fixable diagnostics left when a pass made no progress.
    pub remaining: Vec<Diagnostic>,
    /// Diagnostics of the final analysis that have no fix.
    pub unfixable: Vec<Diagnostic>,
    /// Every state the fixer went through, in order.
    pub states: Vec<BatchState>,
}

struct Machine {
    state: BatchState,
    pass: usize,
    states: Vec<BatchState>,
}

impl Machine {
    fn new() -> Self {
        Self {
            state: BatchState::Idle,
            pass: 0,
            states: vec![BatchState::Idle],
        }
    }

    fn enter(&mut self, next: BatchState) {
        tracing::trace!(from = ?self.state, to = ?next, pass = self.pass, "batch fix transition");
        self.state = next;
        self.states.push(next);
    }
}

/// A selected or deferred fix candidate.
struct Candidate {
    diagnostic: Diagnostic,
    edit: TextEdit,
}

/// Applies fixes from a [`FixRegistry`] to trees analyzed with a
/// [`RuleRegistry`].
pub struct FixEngine<'r> {
    rules: &'r RuleRegistry,
    fixes: &'r FixRegistry,
    max_passes: usize,
    only: Option<HashSet<RuleId>>,
}

impl<'r> FixEngine<'r> {
    pub fn new(rules: &'r RuleRegistry, fixes: &'r FixRegistry) -> Self {
        Self {
            rules,
            fixes,
            max_passes: DEFAULT_MAX_PASSES,
            only: None,
        }
    }

    /// Maximum number of passes before the batch fix gives up.
    pub fn max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    /// Only fix diagnostics of these rules.
    pub fn only(mut self, rules: impl IntoIterator<Item = RuleId>) -> Self {
        let rules: HashSet<_> = rules.into_iter().collect();
        self.only = (!rules.is_empty()).then_some(rules);
        self
    }

    fn selected(&self, rule_id: &RuleId) -> bool {
        self.only.as_ref().map_or(true, |only| only.contains(rule_id))
    }

    /// Compute the edit for one diagnostic reported against `ctx`'s tree.
    pub fn compute_fix(&self, ctx: &RuleContext<'_>, diagnostic: &Diagnostic) -> Result<TextEdit> {
        let fix = self.fixes.get(&diagnostic.rule_id).ok_or_else(|| {
            Error::not_fixable(diagnostic.rule_id.clone(), "no fix is registered for this rule")
        })?;
        fix.compute(ctx, diagnostic)
    }

    /// Compute and apply one fix, returning the re-parsed tree.
    pub fn apply_fix(&self, ctx: &RuleContext<'_>, diagnostic: &Diagnostic) -> Result<Tree> {
        let edit = self.compute_fix(ctx, diagnostic)?;
        ctx.tree()
            .with_replacement(edit.span, &edit.replacement)
            .map_err(|e| invalid_fix(&diagnostic.rule_id, e))
    }

    fn analyze(
        &self,
        model: &SemanticModel,
        config: &AnalyzerConfig,
        path: Option<&Path>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Diagnostic>> {
        let ctx = RuleContext::new(model, config, path);
        let raw = Dispatcher::new(self.rules).run(&ctx, cancel)?;
        Ok(DiagnosticEngine::new(config).finalize(raw))
    }

    /// Fix everything fixable in `tree`, re-analyzing after every pass.
    pub fn fix_all(
        &self,
        tree: Tree,
        config: &AnalyzerConfig,
        path: Option<&Path>,
        cancel: &CancellationToken,
    ) -> Result<BatchReport> {
        let mut machine = Machine::new();
        let mut model = SemanticModel::new(tree);
        let mut applied = 0;

        loop {
            cancel.check()?;
            machine.enter(BatchState::Analyzing);
            let diagnostics = self.analyze(&model, config, path, cancel)?;

            machine.enter(BatchState::HasDiagnostics);
            let ctx = RuleContext::new(&model, config, path);
            let mut candidates = Vec::new();
            let mut unfixable = Vec::new();
            for diagnostic in &diagnostics {
                if !self.selected(&diagnostic.rule_id) {
                    continue;
                }
                match self.compute_fix(&ctx, diagnostic) {
                    Ok(edit) => candidates.push(Candidate {
                        diagnostic: diagnostic.clone(),
                        edit,
                    }),
                    Err(Error::NotFixable { reason, .. }) => {
                        tracing::trace!(rule = %diagnostic.rule_id, reason = %reason, "diagnostic not fixable");
                        unfixable.push(diagnostic.clone());
                    }
                    Err(e) => return Err(e),
                }
            }

            let source = model.tree().source();
            let (noops, candidates): (Vec<_>, Vec<_>) =
                candidates.into_iter().partition(|c| c.edit.is_noop(source));
            let mut remaining: Vec<Diagnostic> = noops.into_iter().map(|c| c.diagnostic).collect();
            if candidates.is_empty() {
                machine.enter(BatchState::Done);
                tracing::debug!(passes = machine.pass, applied, "batch fix converged");
                return Ok(self.report(model, machine, applied, diagnostics, remaining, unfixable));
            }
            if machine.pass >= self.max_passes {
                tracing::warn!(passes = machine.pass, "batch fix exceeded its pass budget");
                return Err(Error::IterationCapExceeded {
                    passes: machine.pass,
                });
            }

            machine.enter(BatchState::Selecting);
            let (selected, deferred) = select(candidates);
            tracing::debug!(
                pass = machine.pass + 1,
                selected = selected.len(),
                deferred = deferred.len(),
                "selected edits"
            );

            machine.enter(BatchState::Applying);
            let edits: Vec<TextEdit> = selected.iter().map(|c| c.edit.clone()).collect();
            let text = apply_edits(source, &edits)?;
            if text == source {
                machine.enter(BatchState::Done);
                remaining.extend(selected.into_iter().chain(deferred).map(|c| c.diagnostic));
                return Ok(self.report(model, machine, applied, diagnostics, remaining, unfixable));
            }

            machine.enter(BatchState::Reparsing);
            let replacements: Vec<_> = edits
                .iter()
                .map(|e| (e.span, e.replacement.as_str()))
                .collect();
            let tree = match model.tree().with_replacements(&replacements) {
                Ok(tree) => tree,
                Err(e) => return Err(blame(model.tree(), &selected, e)),
            };

            applied += selected.len();
            machine.pass += 1;
            model = SemanticModel::new(tree);
        }
    }

    fn report(
        &self,
        model: SemanticModel,
        machine: Machine,
        applied: usize,
        diagnostics: Vec<Diagnostic>,
        remaining: Vec<Diagnostic>,
        unfixable: Vec<Diagnostic>,
    ) -> BatchReport {
        BatchReport {
            source: model.tree().source().to_string(),
            passes: machine.pass,
            applied,
            diagnostics,
            remaining,
            unfixable,
            states: machine.states,
        }
    }
}

/// Greedily pick edits that do not conflict with an earlier pick.
///
/// Candidates are taken in `(span.start, rule_id)` order of their
/// diagnostics, so on a tie the first diagnostic wins.
fn select(mut candidates: Vec<Candidate>) -> (Vec<Candidate>, Vec<Candidate>) {
    candidates.sort_by(|a, b| {
        a.diagnostic
            .span
            .start
            .cmp(&b.diagnostic.span.start)
            .then_with(|| a.diagnostic.rule_id.cmp(&b.diagnostic.rule_id))
    });
    let mut selected: Vec<Candidate> = Vec::new();
    let mut deferred = Vec::new();
    for candidate in candidates {
        if selected.iter().any(|s| s.edit.conflicts_with(&candidate.edit)) {
            deferred.push(candidate);
        } else {
            selected.push(candidate);
        }
    }
    (selected, deferred)
}

fn invalid_fix(rule_id: &RuleId, error: Error) -> Error {
    Error::InvalidFix {
        rule_id: rule_id.clone(),
        message: error.to_string(),
    }
}

/// Attribute a failed re-parse to the first edit that breaks on its own.
fn blame(tree: &Tree, selected: &[Candidate], error: Error) -> Error {
    let culprit = selected
        .iter()
        .find(|c| tree.with_replacement(c.edit.span, &c.edit.replacement).is_err())
        .or_else(|| selected.first());
    match culprit {
        Some(c) => invalid_fix(&c.diagnostic.rule_id, error),
        None => error,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::fix::CodeFix;
    use crate::lint::{DiagnosticSink, Rule, Severity};
    use crate::syntax::{parse, NodeId, NodeKind};
    use pretty_assertions::assert_eq;

    /// Reports parenthesized expressions and replaces them with `template`,
    /// where `$` stands for the inner expression.
    struct ParenRule {
        template: &'static str,
    }

    impl Rule for ParenRule {
        fn id(&self) -> RuleId {
            RuleId::new("T0001")
        }
        fn name(&self) -> &str {
            "Parentheses"
        }
        fn description(&self) -> &str {
            "reports parentheses"
        }
        fn default_severity(&self) -> Severity {
            Severity::Info
        }
        fn interests(&self) -> &[NodeKind] {
            &[NodeKind::ParenthesizedExpression]
        }
        fn check(&self, ctx: &RuleContext<'_>, node: NodeId, sink: &mut DiagnosticSink) {
            sink.report(Diagnostic::new(
                self.id(),
                self.default_severity(),
                ctx.tree().span(node),
                "parentheses",
            ));
        }
    }

    impl CodeFix for ParenRule {
        fn rule_id(&self) -> RuleId {
            self.id()
        }
        fn title(&self) -> &str {
            "Rewrite parentheses"
        }
        fn compute(&self, ctx: &RuleContext<'_>, diagnostic: &Diagnostic) -> Result<TextEdit> {
            let tree = ctx.tree();
            let node = tree
                .find_node(diagnostic.span, NodeKind::ParenthesizedExpression)
                .ok_or_else(|| Error::not_fixable(self.id(), "gone"))?;
            let inner = tree.child(node, 0).ok_or_else(|| Error::not_fixable(self.id(), "empty"))?;
            Ok(TextEdit::replace(
                diagnostic.span,
                self.template.replace('$', tree.text(inner)),
            ))
        }
    }

    fn registries(template: &'static str) -> (RuleRegistry, FixRegistry) {
        let rule = Arc::new(ParenRule { template });
        let mut rules = RuleRegistry::new();
        rules.register(rule.clone());
        let mut fixes = FixRegistry::new();
        fixes.register(rule);
        (rules, fixes)
    }

    fn run(source: &str, template: &'static str, max_passes: usize) -> Result<BatchReport> {
        let (rules, fixes) = registries(template);
        FixEngine::new(&rules, &fixes).max_passes(max_passes).fix_all(
            parse(source).unwrap(),
            &AnalyzerConfig::new(),
            None,
            &CancellationToken::new(),
        )
    }

    #[test]
    fn overlapping_fixes_take_two_passes() {
        let report = run("class C { bool M(bool a) => ((a)); }", "$", 10).unwrap();
        assert_eq!(report.source, "class C { bool M(bool a) => a; }");
        assert_eq!(report.passes, 2);
        assert_eq!(report.applied, 2);
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn disjoint_fixes_apply_in_one_pass() {
        let report = run("class C { int M(int a, int b) => (a) + (b); }", "$", 10).unwrap();
        assert_eq!(report.source, "class C { int M(int a, int b) => a + b; }");
        assert_eq!(report.passes, 1);
        assert_eq!(report.applied, 2);
    }

    #[test]
    fn state_sequence_of_one_pass() {
        let report = run("class C { int M(int a) => (a); }", "$", 10).unwrap();
        use BatchState::*;
        assert_eq!(
            report.states,
            vec![
                Idle,
                Analyzing,
                HasDiagnostics,
                Selecting,
                Applying,
                Reparsing,
                Analyzing,
                HasDiagnostics,
                Done
            ]
        );
    }

    #[test]
    fn non_converging_fix_hits_pass_cap() {
        let result = run("class C { int M(int a) => (a); }", "(($))", 3);
        assert!(matches!(result, Err(Error::IterationCapExceeded { passes: 3 })));
    }

    #[test]
    fn noop_fix_stops_without_progress() {
        let report = run("class C { int M(int a) => (a); }", "($)", 10).unwrap();
        assert_eq!(report.passes, 0);
        assert_eq!(report.source, "class C { int M(int a) => (a); }");
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.remaining.len(), 1);
    }

    #[test]
    fn unparsable_result_is_invalid_fix() {
        let result = run("class C { int M(int a) => (a); }", "($", 10);
        match result {
            Err(Error::InvalidFix { rule_id, .. }) => assert_eq!(rule_id, RuleId::new("T0001")),
            other => panic!("expected invalid fix, got {:?}", other.map(|r| r.source)),
        }
    }

    #[test]
    fn rule_filter_skips_other_rules() {
        let (rules, fixes) = registries("$");
        let report = FixEngine::new(&rules, &fixes)
            .only([RuleId::new("OTHER")])
            .fix_all(
                parse("class C { int M(int a) => (a); }").unwrap(),
                &AnalyzerConfig::new(),
                None,
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(report.passes, 0);
        assert_eq!(report.diagnostics.len(), 1);
    }

    #[test]
    fn missing_fix_is_not_fixable() {
        let (rules, _) = registries("$");
        let empty = FixRegistry::new();
        let engine = FixEngine::new(&rules, &empty);
        let model = SemanticModel::new(parse("class C { int M(int a) => (a); }").unwrap());
        let config = AnalyzerConfig::new();
        let ctx = RuleContext::new(&model, &config, None);
        let diagnostics = engine
            .analyze(&model, &config, None, &CancellationToken::new())
            .unwrap();
        let err = engine.compute_fix(&ctx, &diagnostics[0]).unwrap_err();
        assert!(matches!(err, Error::NotFixable { .. }));

        let report = engine
            .fix_all(
                parse("class C { int M(int a) => (a); }").unwrap(),
                &config,
                None,
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(report.unfixable.len(), 1);
    }

    #[test]
    fn apply_fix_returns_new_generation() {
        let (rules, fixes) = registries("$");
        let engine = FixEngine::new(&rules, &fixes);
        let model = SemanticModel::new(parse("class C { int M(int a) => (a); }").unwrap());
        let config = AnalyzerConfig::new();
        let ctx = RuleContext::new(&model, &config, None);
        let diagnostics = engine
            .analyze(&model, &config, None, &CancellationToken::new())
            .unwrap();
        let fixed = engine.apply_fix(&ctx, &diagnostics[0]).unwrap();
        assert_eq!(fixed.source(), "class C { int M(int a) => a; }");
        assert_ne!(fixed.generation(), model.generation());
    }

    #[test]
    fn cancelled_batch_fix_stops() {
        let (rules, fixes) = registries("$");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = FixEngine::new(&rules, &fixes).fix_all(
            parse("class C { int M(int a) => (a); }").unwrap(),
            &AnalyzerConfig::new(),
            None,
            &cancel,
        );
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
