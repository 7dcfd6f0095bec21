//! Comparison of a boolean expression with a `true`/`false` literal.
//!
//! `value == true` is `value`, `value != true` is `!value`. Only operands
//! whose type is exactly `bool` are reported; `bool?` comparisons carry
//! null semantics and are left alone.

use super::{diagnosed_node, in_open_context, is_tight, negate, unparenthesize, unsupported};
use crate::error::Result;
use crate::fix::{CodeFix, TextEdit};
use crate::lint::{Diagnostic, DiagnosticSink, Rule, RuleContext, RuleId, Severity};
use crate::syntax::{NodeId, NodeKind, Tree};

/// Reports `==`/`!=` comparisons against a boolean literal.
pub struct BoolComparisonRule;

/// The parts of a reportable comparison.
struct Comparison {
    binary: NodeId,
    operator: NodeId,
    operand: NodeId,
    literal: bool,
    equals: bool,
}

fn literal_value(tree: &Tree, node: NodeId) -> Option<bool> {
    match tree.kind(unparenthesize(tree, node)) {
        NodeKind::TrueLiteral => Some(true),
        NodeKind::FalseLiteral => Some(false),
        _ => None,
    }
}

fn comparison(ctx: &RuleContext<'_>, binary: NodeId) -> Option<Comparison> {
    let tree = ctx.tree();
    let [lhs, operator, rhs] = tree.children(binary) else {
        return None;
    };
    let equals = match tree.text(*operator) {
        "==" => true,
        "!=" => false,
        _ => return None,
    };
    let (operand, literal) = match (literal_value(tree, *lhs), literal_value(tree, *rhs)) {
        (_, Some(value)) => (*lhs, value),
        (Some(value), None) => (*rhs, value),
        (None, None) => return None,
    };
    if !ctx.model.type_of(operand)?.is_bool() {
        return None;
    }
    Some(Comparison {
        binary,
        operator: *operator,
        operand,
        literal,
        equals,
    })
}

impl Rule for BoolComparisonRule {
    fn id(&self) -> RuleId {
        RuleId::new("MA0073")
    }

    fn name(&self) -> &str {
        "Avoid comparison with bool constant"
    }

    fn description(&self) -> &str {
        "Detects boolean expressions compared with 'true' or 'false'"
    }

    fn default_severity(&self) -> Severity {
        Severity::Info
    }

    fn interests(&self) -> &[NodeKind] {
        &[NodeKind::BinaryExpression]
    }

    fn check(&self, ctx: &RuleContext<'_>, node: NodeId, sink: &mut DiagnosticSink) {
        let Some(found) = comparison(ctx, node) else {
            return;
        };
        let tree = ctx.tree();
        sink.report(Diagnostic::new(
            self.id(),
            self.default_severity(),
            tree.span(found.operator),
            format!("Remove the comparison to '{}'", found.literal),
        ));
    }

    fn supports_fix(&self) -> bool {
        true
    }
}

impl CodeFix for BoolComparisonRule {
    fn rule_id(&self) -> RuleId {
        self.id()
    }

    fn title(&self) -> &str {
        "Remove comparison with bool constant"
    }

    fn compute(&self, ctx: &RuleContext<'_>, diagnostic: &Diagnostic) -> Result<TextEdit> {
        let tree = ctx.tree();
        let operator = diagnosed_node(tree, diagnostic, NodeKind::OperatorToken)?;
        let found = tree
            .parent(operator)
            .and_then(|binary| comparison(ctx, binary))
            .ok_or_else(|| unsupported(self.id(), "operator is not a bool comparison"))?;

        let operand = unparenthesize(tree, found.operand);
        let replacement = if found.equals != found.literal {
            negate(tree, operand)
        } else if is_tight(tree.kind(operand)) || in_open_context(tree, found.binary) {
            tree.text(operand).to_string()
        } else {
            format!("({})", tree.text(operand))
        };
        Ok(TextEdit::replace(tree.span(found.binary), replacement))
    }
}
