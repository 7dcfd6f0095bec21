//! Output stability: repeated, parallel and fixed-point runs agree.

use std::path::Path;

use pretty_assertions::assert_eq;
use ruleforge::analyzer::{Analyzer, SourceUnit};
use ruleforge::config::AnalyzerConfig;
use ruleforge::lint::{CancellationToken, FileDiagnostics, HumanFormatter, JsonFormatter, LintFormatter};

const SAMPLE: &str = "class Sample { bool M(bool b, List<int> xs) => b == true && xs.Count() > 0; }";

const MIXED: &str = r#"class Mixed
{
    bool A(bool a, List<int> items) => a != false || items.Where(x => x > 1).Any();

    int B(bool done)
    {
        if (done)
        {
            return 0;
        }
        else
        {
            return 1;
        }
    }

    bool C(List<int> values) => values.Count() == 0 || values.Where(v => v > 2).First() > 0;
}
"#;

fn render<F: LintFormatter>(formatter: F, source: &str) -> String {
    let analysis = Analyzer::new()
        .analyze(source, None, &AnalyzerConfig::new(), &CancellationToken::new())
        .unwrap();
    let file = FileDiagnostics::new(Path::new("Sample.cs"), analysis.line_index(), &analysis.diagnostics);
    let mut out = Vec::new();
    formatter.format(&[file], &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn human_output_is_stable() {
    insta::assert_snapshot!(render(HumanFormatter::new(false), SAMPLE), @r"
info[MA0073]: Remove the comparison to 'true'
  --> Sample.cs:1:50

info[MA0031]: Use 'Any()' instead of comparing 'Count()'
  --> Sample.cs:1:61
   = note: related location at 1:61

Found 0 error(s), 0 warning(s) and 2 info(s) in 1 file(s)
");
}

#[test]
fn repeated_runs_render_identically() {
    let first = render(JsonFormatter::new(), MIXED);
    for _ in 0..5 {
        assert_eq!(render(JsonFormatter::new(), MIXED), first);
    }
}

#[test]
fn parallel_dispatch_matches_sequential() {
    let config = AnalyzerConfig::new();
    let cancel = CancellationToken::new();
    let sequential = Analyzer::new().analyze(MIXED, None, &config, &cancel).unwrap();
    for _ in 0..5 {
        let parallel = Analyzer::new()
            .parallel(true)
            .analyze(MIXED, None, &config, &cancel)
            .unwrap();
        assert_eq!(parallel.diagnostics, sequential.diagnostics);
    }
}

#[test]
fn batch_analysis_keeps_input_order() {
    let units: Vec<SourceUnit> = (0..16)
        .map(|i| {
            let source = if i % 2 == 0 { SAMPLE } else { MIXED };
            SourceUnit::new(format!("Unit{}.cs", i), source, AnalyzerConfig::new())
        })
        .collect();
    let results = Analyzer::new().analyze_all(&units, &CancellationToken::new());
    let paths: Vec<_> = results.iter().map(|r| r.path.clone()).collect();
    let expected: Vec<_> = units.iter().map(|u| u.path.clone()).collect();
    assert_eq!(paths, expected);
    assert!(results.iter().all(|r| r.result.is_ok()));
}

#[test]
fn diagnostics_are_sorted_by_position() {
    let analysis = Analyzer::new()
        .analyze(MIXED, None, &AnalyzerConfig::new(), &CancellationToken::new())
        .unwrap();
    let keys: Vec<_> = analysis
        .diagnostics
        .iter()
        .map(|d| (d.span.start, d.rule_id.clone()))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert!(!keys.is_empty());
}

#[test]
fn fixed_output_has_nothing_left_to_fix() {
    let config = AnalyzerConfig::new();
    let cancel = CancellationToken::new();
    let report = Analyzer::new().fix(MIXED, None, &config, &cancel).unwrap();
    assert!(report.applied > 0);
    assert!(report.remaining.is_empty());

    let again = Analyzer::new().fix(&report.source, None, &config, &cancel).unwrap();
    assert_eq!(again.source, report.source);
    assert_eq!(again.passes, 0);
}

#[test]
fn clean_source_yields_no_diagnostics() {
    let source = "class Clean { bool M(bool b, List<int> xs) => b && xs.Any(x => x > 0); }";
    let analysis = Analyzer::new()
        .analyze(source, None, &AnalyzerConfig::new(), &CancellationToken::new())
        .unwrap();
    assert_eq!(analysis.diagnostics, vec![]);
}
