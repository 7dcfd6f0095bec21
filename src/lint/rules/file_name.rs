//! Top-level type names must match the file they live in.
//!
//! Generic types may encode their arity in the file name as `` Name`1 ``,
//! `Name{T}` or `NameOfT`; all three are accepted as `Name<T>`.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::lint::{Diagnostic, DiagnosticSink, Rule, RuleContext, RuleId, Severity};
use crate::syntax::{NodeId, NodeKind, Tree};

const ONLY_FIRST_TYPE: &str = "only_validate_first_type";

/// Reports top-level types whose name differs from the file name.
pub struct FileNameRule;

/// What may follow the type name in a generic type's file stem.
fn arity_suffix() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(?:`(?P<arity>\d+)|\{(?P<params>[^}]*)\}|Of(?P<of>\w+))$").ok())
        .as_ref()
}

/// File name up to the first `.`: `Widget.Designer.cs` is `Widget`.
fn file_stem(path: &Path) -> Option<&str> {
    let name = path.file_name()?.to_str()?;
    name.split('.').next().filter(|s| !s.is_empty())
}

fn type_parameters<'t>(tree: &'t Tree, declaration: NodeId) -> Vec<&'t str> {
    tree.child_of_kind(declaration, NodeKind::TypeParameterList)
        .map(|list| tree.children(list).iter().map(|p| tree.text(*p)).collect())
        .unwrap_or_default()
}

/// Whether `stem` names the type `name` with the given type parameters.
fn stem_matches(stem: &str, name: &str, parameters: &[&str]) -> bool {
    if stem == name {
        return true;
    }
    if parameters.is_empty() {
        return false;
    }
    let Some(captures) = stem
        .strip_prefix(name)
        .and_then(|suffix| arity_suffix().and_then(|p| p.captures(suffix)))
    else {
        return false;
    };
    if let Some(arity) = captures.name("arity") {
        return arity.as_str().parse::<usize>().ok() == Some(parameters.len());
    }
    if let Some(params) = captures.name("params") {
        return params.as_str().split(',').map(str::trim).eq(parameters.iter().copied());
    }
    captures
        .name("of")
        .is_some_and(|of| of.as_str() == parameters.concat())
}

fn is_top_level(tree: &Tree, declaration: NodeId) -> bool {
    tree.ancestor_of_kind(declaration, NodeKind::TypeDeclaration)
        .is_none()
}

impl Rule for FileNameRule {
    fn id(&self) -> RuleId {
        RuleId::new("MA0048")
    }

    fn name(&self) -> &str {
        "File name must match type name"
    }

    fn description(&self) -> &str {
        "Detects top-level types declared in a file with a different name"
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn interests(&self) -> &[NodeKind] {
        &[NodeKind::TypeDeclaration]
    }

    fn check(&self, ctx: &RuleContext<'_>, node: NodeId, sink: &mut DiagnosticSink) {
        let Some(stem) = ctx.path.and_then(file_stem) else {
            return;
        };
        let tree = ctx.tree();
        if !is_top_level(tree, node) {
            return;
        }
        let only_first = ctx
            .config
            .get_bool(&self.id(), Some(NodeKind::TypeDeclaration), ONLY_FIRST_TYPE, false);
        if only_first {
            // pre-order, so the first type declaration is always top-level
            let first = tree
                .descendants(tree.root())
                .find(|n| tree.kind(*n) == NodeKind::TypeDeclaration);
            if first != Some(node) {
                return;
            }
        }

        let Some(name) = tree.child_of_kind(node, NodeKind::IdentifierToken) else {
            return;
        };
        if stem_matches(stem, tree.text(name), &type_parameters(tree, node)) {
            return;
        }
        sink.report(Diagnostic::new(
            self.id(),
            self.default_severity(),
            tree.span(name),
            format!("File name must match type name '{}'", tree.text(name)),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyzerConfig;
    use crate::testing::assert_diagnostics_with;

    fn check(marked: &str, file: &str) {
        assert_diagnostics_with(FileNameRule, marked, &AnalyzerConfig::new(), Some(Path::new(file)));
    }

    #[test]
    fn stem_is_cut_at_first_dot() {
        assert_eq!(file_stem(Path::new("src/Widget.Designer.cs")), Some("Widget"));
        assert_eq!(file_stem(Path::new("Widget.cs")), Some("Widget"));
        assert_eq!(file_stem(Path::new(".hidden")), None);
    }

    #[test]
    fn arity_encodings() {
        let one = ["T"];
        assert!(stem_matches("Result", "Result", &one));
        assert!(stem_matches("Result`1", "Result", &one));
        assert!(stem_matches("Result{T}", "Result", &one));
        assert!(stem_matches("ResultOfT", "Result", &one));
        assert!(!stem_matches("Result`2", "Result", &one));
        assert!(!stem_matches("Result{K,V}", "Result", &one));
        assert!(!stem_matches("ResultOfU", "Result", &one));
        assert!(!stem_matches("Result{}", "Result", &one));
        assert!(!stem_matches("Result{U}", "Result", &one));

        let two = ["TKey", "TValue"];
        assert!(stem_matches("Map`2", "Map", &two));
        assert!(stem_matches("Map{TKey,TValue}", "Map", &two));
        assert!(stem_matches("Map{TKey, TValue}", "Map", &two));
        assert!(!stem_matches("Map{TValue,TKey}", "Map", &two));
        assert!(stem_matches("MapOfTKeyTValue", "Map", &two));
    }

    #[test]
    fn type_names_containing_of() {
        assert!(stem_matches("ListOfBarOfT", "ListOfBar", &["T"]));
        assert!(stem_matches("ListOfBar`1", "ListOfBar", &["T"]));
        assert!(!stem_matches("ListOfT", "ListOfBar", &["T"]));
        check("class ListOfBar<T> { }", "ListOfBarOfT.cs");
    }

    #[test]
    fn encodings_require_a_generic_type() {
        assert!(!stem_matches("Widget`1", "Widget", &[]));
        assert!(!stem_matches("WidgetOfT", "Widget", &[]));
    }

    #[test]
    fn reports_mismatched_name() {
        check("class [|Widget|] { }", "src/Gadget.cs");
        check("public sealed class Widget { }", "src/Widget.cs");
        check("partial class Widget { }", "src/Widget.Designer.cs");
    }

    #[test]
    fn accepts_generic_file_names() {
        check("class Result<T> { }", "Result`1.cs");
        check("class Result<T> { }", "Result{T}.cs");
        check("class Result<T> { }", "ResultOfT.cs");
        check("class [|Result|]<T> { }", "Result`2.cs");
    }

    #[test]
    fn nested_types_are_ignored() {
        check("class Outer { class Inner { } }", "Outer.cs");
        check("namespace N { class Outer { } }", "Outer.cs");
    }

    #[test]
    fn every_top_level_type_is_checked_by_default() {
        check("class A { } class [|B|] { }", "A.cs");
    }

    #[test]
    fn first_type_only_option() {
        let config = AnalyzerConfig::new().with("MA0048.only_validate_first_type", "true");
        assert_diagnostics_with(FileNameRule, "class A { } class B { }", &config, Some(Path::new("A.cs")));
        assert_diagnostics_with(
            FileNameRule,
            "class [|B|] { } class A { }",
            &config,
            Some(Path::new("A.cs")),
        );
    }

    #[test]
    fn sources_without_a_path_are_skipped() {
        assert_diagnostics_with(FileNameRule, "class Widget { }", &AnalyzerConfig::new(), None);
    }
}
