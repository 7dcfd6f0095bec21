//! End-to-end scenarios through the public API.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use ruleforge::analyzer::Analyzer;
use ruleforge::config::AnalyzerConfig;
use ruleforge::fix::{BatchState, FixEngine, FixRegistry};
use ruleforge::lint::rules::{BoolComparisonRule, CombineLinqRule};
use ruleforge::lint::{CancellationToken, RuleContext, RuleId, RuleRegistry};
use ruleforge::semantic::SemanticModel;
use ruleforge::syntax;
use ruleforge::Error;
use ruleforge::testing::{assert_batch_fix, assert_diagnostics, assert_fix};

fn analyze(source: &str) -> Vec<String> {
    Analyzer::new()
        .analyze(source, None, &AnalyzerConfig::new(), &CancellationToken::new())
        .unwrap()
        .diagnostics
        .iter()
        .map(|d| format!("{} {}", d.rule_id, d.span))
        .collect()
}

#[test]
fn comparison_with_true_is_reported_on_the_operator_and_removed() {
    assert_diagnostics(
        BoolComparisonRule,
        "class C { void M(bool value) { if (value [|==|] true) { } } }",
    );
    assert_fix(
        BoolComparisonRule,
        "class C { void M(bool value) { if (value [|==|] true) { } } }",
        "class C { void M(bool value) { if (value) { } } }",
    );
}

/// Apply the first remaining diagnostic's fix, re-analyzing in between.
fn fix_one_at_a_time(source: &str, order: &[usize]) -> String {
    let rules = RuleRegistry::with_builtins();
    let fixes = FixRegistry::with_builtins();
    let engine = FixEngine::new(&rules, &fixes);
    let config = AnalyzerConfig::new();
    let cancel = CancellationToken::new();
    let analyzer = Analyzer::new();

    let mut tree = syntax::parse(source).unwrap();
    for &pick in order {
        let analysis = analyzer.analyze_tree(tree, None, &config, &cancel).unwrap();
        let index = pick.min(analysis.diagnostics.len() - 1);
        let ctx = RuleContext::new(&analysis.model, &config, None);
        tree = engine.apply_fix(&ctx, &analysis.diagnostics[index]).unwrap();
    }
    tree.source().to_string()
}

#[test]
fn independent_fixes_land_in_one_pass_in_any_order() {
    let source = "class C { bool M(bool a, bool b) => a == true && b != true; }";
    let expected = "class C { bool M(bool a, bool b) => a && !b; }";

    let report = Analyzer::new()
        .fix(source, None, &AnalyzerConfig::new(), &CancellationToken::new())
        .unwrap();
    assert_eq!(report.source, expected);
    assert_eq!(report.passes, 1);
    assert_eq!(report.applied, 2);

    assert_eq!(fix_one_at_a_time(source, &[0, 0]), expected);
    assert_eq!(fix_one_at_a_time(source, &[1, 0]), expected);
}

#[test]
fn where_then_any_is_combined() {
    let source = "class C { bool M(List<int> enumerable) => enumerable.[|Where(x => x == 0).Any()|]; }";
    assert_diagnostics(CombineLinqRule, source);
    assert_fix(
        CombineLinqRule,
        source,
        "class C { bool M(List<int> enumerable) => enumerable.Any(x => x == 0); }",
    );
}

#[test]
fn dynamic_members_are_left_alone() {
    let source = "class C { bool M(dynamic d) => d.Flag == true || d.Items.Count() > 0 || d.Items.Where(x => x).Any(); }";
    assert_eq!(analyze(source), Vec::<String>::new());
}

#[test]
fn overlapping_fixes_take_two_passes() {
    let report = assert_batch_fix(
        CombineLinqRule,
        "class C { bool M(List<int> items) => items.Where(x => x > 0).Where(y => y < 9).Any(); }",
        "class C { bool M(List<int> items) => items.Any(x => x > 0 && x < 9); }",
    );
    assert_eq!(report.passes, 2);
    assert_eq!(report.applied, 2);
    assert_eq!(
        report.states,
        vec![
            BatchState::Idle,
            BatchState::Analyzing,
            BatchState::HasDiagnostics,
            BatchState::Selecting,
            BatchState::Applying,
            BatchState::Reparsing,
            BatchState::Analyzing,
            BatchState::HasDiagnostics,
            BatchState::Selecting,
            BatchState::Applying,
            BatchState::Reparsing,
            BatchState::Analyzing,
            BatchState::HasDiagnostics,
            BatchState::Done,
        ]
    );
}

#[test]
fn first_pass_fixes_the_earlier_diagnostic() {
    let source = "class C { bool M(List<int> items) => items.Where(x => x > 0).Where(y => y < 9).Any(); }";
    let mut rules = RuleRegistry::new();
    rules.register(Arc::new(CombineLinqRule));
    let fixes = FixRegistry::with_builtins();
    let engine = FixEngine::new(&rules, &fixes);

    let model = SemanticModel::new(syntax::parse(source).unwrap());
    let config = AnalyzerConfig::new();
    let ctx = RuleContext::new(&model, &config, None);
    let analysis = Analyzer::new()
        .only([RuleId::new("MA0029")])
        .analyze(source, None, &config, &CancellationToken::new())
        .unwrap();
    assert_eq!(analysis.diagnostics.len(), 2);
    let fixed = engine.apply_fix(&ctx, &analysis.diagnostics[0]).unwrap();
    assert_eq!(
        fixed.source(),
        "class C { bool M(List<int> items) => items.Where(x => x > 0 && x < 9).Any(); }"
    );

    // one pass is not enough to converge
    let capped = engine
        .max_passes(1)
        .fix_all(syntax::parse(source).unwrap(), &config, None, &CancellationToken::new());
    assert!(matches!(capped, Err(Error::IterationCapExceeded { passes: 1 })));
}
