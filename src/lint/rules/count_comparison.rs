//! `Count()` compared with a constant.
//!
//! A count is never negative, so a comparison with a constant either
//! splits `[0, ∞)` into "empty" and "non-empty", in which case `Any()`
//! says the same thing without enumerating the whole sequence, or it is
//! constant itself.

use super::{diagnosed_node, unsupported};
use crate::error::Result;
use crate::fix::{CodeFix, TextEdit};
use crate::lint::{Diagnostic, DiagnosticSink, Rule, RuleContext, RuleId, Severity};
use crate::semantic::Constant;
use crate::syntax::{NodeId, NodeKind, TextSpan};

const COUNT_METHODS: &[&str] = &["Count", "LongCount"];

/// Reports `Count()` comparisons that can use `Any()` or are constant.
pub struct CountComparisonRule;

/// What a count comparison is equivalent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    AlwaysTrue,
    AlwaysFalse,
    /// `count >= 1`
    Any,
    /// `count == 0`
    NotAny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Op {
    fn parse(text: &str) -> Option<Op> {
        Some(match text {
            "==" => Op::Eq,
            "!=" => Op::Ne,
            "<" => Op::Lt,
            "<=" => Op::Le,
            ">" => Op::Gt,
            ">=" => Op::Ge,
            _ => return None,
        })
    }

    /// The operator with its operands swapped: `k < n` is `n > k`.
    fn mirrored(self) -> Op {
        match self {
            Op::Lt => Op::Gt,
            Op::Le => Op::Ge,
            Op::Gt => Op::Lt,
            Op::Ge => Op::Le,
            other => other,
        }
    }
}

/// Classify `count <op> k` over `count ∈ [0, ∞)`.
///
/// The set of counts satisfying the comparison is an interval (or, for
/// `!=`, the complement of a point). Only four shapes are rewritable: all
/// counts, none, exactly `{0}` and exactly `[1, ∞)`.
fn classify(op: Op, k: i64) -> Option<Outcome> {
    // satisfying counts as [low, high], high None meaning unbounded
    let (low, high): (i64, Option<i64>) = match op {
        Op::Gt => (k.saturating_add(1), None),
        Op::Ge => (k, None),
        Op::Lt => (i64::MIN, Some(k.saturating_sub(1))),
        Op::Le => (i64::MIN, Some(k)),
        Op::Eq => (k, Some(k)),
        Op::Ne => {
            return match k {
                k if k < 0 => Some(Outcome::AlwaysTrue),
                0 => Some(Outcome::Any),
                _ => None,
            };
        }
    };
    let low = low.max(0);
    match high {
        Some(high) if high < low => Some(Outcome::AlwaysFalse),
        Some(0) => Some(Outcome::NotAny),
        Some(_) => None,
        None if low == 0 => Some(Outcome::AlwaysTrue),
        None if low == 1 => Some(Outcome::Any),
        None => None,
    }
}

/// A comparison between a count call and an integer constant.
struct CountComparison {
    invocation: NodeId,
    name: NodeId,
    outcome: Outcome,
}

fn count_comparison(ctx: &RuleContext<'_>, binary: NodeId) -> Option<CountComparison> {
    let tree = ctx.tree();
    let [lhs, operator, rhs] = tree.children(binary) else {
        return None;
    };
    let op = Op::parse(tree.text(*operator))?;

    let is_count = |node: NodeId| {
        tree.kind(node) == NodeKind::InvocationExpression
            && ctx
                .model
                .resolve_symbol(node)
                .is_some_and(|s| COUNT_METHODS.iter().any(|m| s.is_enumerable_method(m)))
    };
    let (invocation, constant, op) = if is_count(*lhs) {
        (*lhs, *rhs, op)
    } else if is_count(*rhs) {
        (*rhs, *lhs, op.mirrored())
    } else {
        return None;
    };

    let Some(Constant::Int(k)) = ctx.model.constant_value(constant) else {
        return None;
    };
    let callee = tree.child(invocation, 0)?;
    if tree.kind(callee) != NodeKind::MemberAccessExpression {
        return None;
    }
    Some(CountComparison {
        invocation,
        name: tree.child(callee, 1)?,
        outcome: classify(op, k)?,
    })
}

impl Rule for CountComparisonRule {
    fn id(&self) -> RuleId {
        RuleId::new("MA0031")
    }

    fn name(&self) -> &str {
        "Optimize Enumerable.Count() usage"
    }

    fn description(&self) -> &str {
        "Detects Count() comparisons that can use Any() or are always true or false"
    }

    fn default_severity(&self) -> Severity {
        Severity::Info
    }

    fn interests(&self) -> &[NodeKind] {
        &[NodeKind::BinaryExpression]
    }

    fn check(&self, ctx: &RuleContext<'_>, node: NodeId, sink: &mut DiagnosticSink) {
        let Some(found) = count_comparison(ctx, node) else {
            return;
        };
        let message = match found.outcome {
            Outcome::AlwaysTrue => "Comparison is always true".to_string(),
            Outcome::AlwaysFalse => "Comparison is always false".to_string(),
            Outcome::Any => "Use 'Any()' instead of comparing 'Count()'".to_string(),
            Outcome::NotAny => "Use '!Any()' instead of comparing 'Count()'".to_string(),
        };
        let tree = ctx.tree();
        sink.report(
            Diagnostic::new(self.id(), self.default_severity(), tree.span(node), message)
                .with_additional_span(tree.span(found.invocation)),
        );
    }

    fn supports_fix(&self) -> bool {
        true
    }
}

impl CodeFix for CountComparisonRule {
    fn rule_id(&self) -> RuleId {
        self.id()
    }

    fn title(&self) -> &str {
        "Replace Count() comparison"
    }

    fn compute(&self, ctx: &RuleContext<'_>, diagnostic: &Diagnostic) -> Result<TextEdit> {
        let tree = ctx.tree();
        let binary = diagnosed_node(tree, diagnostic, NodeKind::BinaryExpression)?;
        let found = count_comparison(ctx, binary)
            .ok_or_else(|| unsupported(self.id(), "not a count comparison"))?;

        let any = || {
            let invocation = tree.span(found.invocation);
            let name = tree.span(found.name);
            // receiver and dot stay as written, the argument list moves over
            format!(
                "{}Any{}",
                tree.text_at(TextSpan::new(invocation.start, name.start)),
                tree.text_at(TextSpan::new(name.end, invocation.end)),
            )
        };
        let replacement = match found.outcome {
            Outcome::AlwaysTrue => "true".to_string(),
            Outcome::AlwaysFalse => "false".to_string(),
            Outcome::Any => any(),
            Outcome::NotAny => format!("!{}", any()),
        };
        Ok(TextEdit::replace(tree.span(binary), replacement))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{assert_diagnostics, assert_fix};

    fn method(body: &str) -> String {
        format!(
            "class C {{ bool M(List<int> items) => {}; }}",
            body
        )
    }

    #[test]
    fn interval_classification() {
        let cases = [
            (Op::Gt, 0, Some(Outcome::Any)),
            (Op::Ge, 1, Some(Outcome::Any)),
            (Op::Ne, 0, Some(Outcome::Any)),
            (Op::Eq, 0, Some(Outcome::NotAny)),
            (Op::Lt, 1, Some(Outcome::NotAny)),
            (Op::Le, 0, Some(Outcome::NotAny)),
            (Op::Ge, 0, Some(Outcome::AlwaysTrue)),
            (Op::Gt, -1, Some(Outcome::AlwaysTrue)),
            (Op::Ne, -3, Some(Outcome::AlwaysTrue)),
            (Op::Lt, 0, Some(Outcome::AlwaysFalse)),
            (Op::Eq, -1, Some(Outcome::AlwaysFalse)),
            (Op::Le, -1, Some(Outcome::AlwaysFalse)),
            (Op::Gt, 1, None),
            (Op::Eq, 2, None),
            (Op::Lt, 5, None),
            (Op::Ne, 1, None),
        ];
        for (op, k, expected) in cases {
            assert_eq!(classify(op, k), expected, "{:?} {}", op, k);
        }
    }

    #[test]
    fn extreme_constants_do_not_overflow() {
        assert_eq!(classify(Op::Gt, i64::MAX), None);
        assert_eq!(classify(Op::Lt, i64::MIN), Some(Outcome::AlwaysFalse));
    }

    #[test]
    fn greater_than_zero_becomes_any() {
        assert_fix(
            CountComparisonRule,
            &method("[|items.Count() > 0|]"),
            &method("items.Any()"),
        );
    }

    #[test]
    fn mirrored_comparison_keeps_predicate() {
        assert_fix(
            CountComparisonRule,
            &method("[|0 == items.Count(x => x > 2)|]"),
            &method("!items.Any(x => x > 2)"),
        );
    }

    #[test]
    fn constant_comparisons_become_literals() {
        assert_fix(
            CountComparisonRule,
            &method("[|items.Count() >= 0|]"),
            &method("true"),
        );
        assert_fix(
            CountComparisonRule,
            &method("[|items.Count() < 0|]"),
            &method("false"),
        );
    }

    #[test]
    fn ignores_other_constants_and_non_linq_counts() {
        assert_diagnostics(CountComparisonRule, &method("items.Count() > 1"));
        assert_diagnostics(CountComparisonRule, &method("items.Count > 0"));
        assert_diagnostics(
            CountComparisonRule,
            "class C { int Count() => 0; bool M() => Count() > 0; }",
        );
    }

    #[test]
    fn ignores_dynamic_receivers() {
        assert_diagnostics(
            CountComparisonRule,
            "class C { bool M(dynamic items) => items.Count() > 0; }",
        );
    }
}
