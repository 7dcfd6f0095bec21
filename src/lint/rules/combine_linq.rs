//! `Where(p)` followed by a predicate-taking LINQ call.
//!
//! `xs.Where(p).Any(q)` is `xs.Any(x => p(x) && q(x))`, and
//! `xs.Where(p).Any()` is `xs.Any(p)`.

use std::collections::HashSet;

use super::unsupported;
use crate::error::Result;
use crate::fix::{CodeFix, TextEdit};
use crate::lint::{Diagnostic, DiagnosticSink, Rule, RuleContext, RuleId, Severity};
use crate::syntax::{NodeId, NodeKind, TextSpan, Tree};

/// Methods whose predicate overload is equivalent to filtering first.
const COMBINABLE: &[&str] = &[
    "Any",
    "Count",
    "First",
    "FirstOrDefault",
    "Last",
    "LastOrDefault",
    "LongCount",
    "Single",
    "SingleOrDefault",
    "Where",
];

const FRESH_NAMES: &[&str] = &["x", "item", "element", "value", "arg"];

/// Reports `Where(...)` calls that can be merged into the following call.
pub struct CombineLinqRule;

/// A `receiver.Where(p).Method(q?)` chain.
struct Chain {
    /// The outer invocation.
    outer: NodeId,
    /// The `Where` name node.
    where_name: NodeId,
    /// The outer method name node.
    method: NodeId,
    filter: NodeId,
    predicate: Option<NodeId>,
}

/// Invocation parts: the member name and the argument nodes.
fn call_parts(tree: &Tree, invocation: NodeId) -> Option<(NodeId, NodeId, &[NodeId])> {
    if tree.kind(invocation) != NodeKind::InvocationExpression {
        return None;
    }
    let callee = tree.child(invocation, 0)?;
    if tree.kind(callee) != NodeKind::MemberAccessExpression {
        return None;
    }
    let receiver = tree.child(callee, 0)?;
    let name = tree.child(callee, 1)?;
    let args = tree.child_of_kind(invocation, NodeKind::ArgumentList)?;
    Some((receiver, name, tree.children(args)))
}

fn chain(ctx: &RuleContext<'_>, outer: NodeId) -> Option<Chain> {
    let tree = ctx.tree();
    let model = ctx.model;
    let (inner, method, outer_args) = call_parts(tree, outer)?;
    let (_, where_name, inner_args) = call_parts(tree, inner)?;

    let outer_symbol = model.resolve_symbol(outer)?;
    if !COMBINABLE.iter().any(|m| outer_symbol.is_enumerable_method(m)) {
        return None;
    }
    if !model.resolve_symbol(inner)?.is_enumerable_method("Where") {
        return None;
    }

    let [filter] = inner_args else {
        return None;
    };
    let predicate = match outer_args {
        [] => None,
        [predicate] => Some(*predicate),
        _ => return None,
    };
    // the indexed overload Where((x, i) => ...) has no combined form
    if lambda_parts(tree, *filter).is_none() && tree.kind(*filter) == NodeKind::LambdaExpression {
        return None;
    }
    if predicate.is_some_and(|p| tree.kind(p) == NodeKind::LambdaExpression && lambda_parts(tree, p).is_none()) {
        return None;
    }

    Some(Chain {
        outer,
        where_name,
        method,
        filter: *filter,
        predicate,
    })
}

/// Parameter node and expression body of a one-parameter lambda.
fn lambda_parts(tree: &Tree, lambda: NodeId) -> Option<(NodeId, NodeId)> {
    if tree.kind(lambda) != NodeKind::LambdaExpression {
        return None;
    }
    let params = tree.child(lambda, 0)?;
    let [param] = tree.children(params) else {
        return None;
    };
    let body = tree.child(lambda, 1)?;
    if tree.kind(body) == NodeKind::Block {
        return None;
    }
    Some((*param, body))
}

/// A predicate normalized to "body text over one parameter".
enum Predicate {
    Lambda { param: NodeId, body: NodeId },
    /// A method group or delegate value, invoked on the parameter.
    Group(NodeId),
}

impl Predicate {
    fn of(tree: &Tree, node: NodeId) -> Option<Predicate> {
        if let Some((param, body)) = lambda_parts(tree, node) {
            return Some(Predicate::Lambda { param, body });
        }
        match tree.kind(node) {
            NodeKind::IdentifierName | NodeKind::MemberAccessExpression => Some(Predicate::Group(node)),
            _ => None,
        }
    }

    fn param_name<'t>(&self, tree: &'t Tree) -> Option<&'t str> {
        match self {
            Predicate::Lambda { param, .. } => {
                tree.child_of_kind(*param, NodeKind::IdentifierToken).map(|n| tree.text(n))
            }
            Predicate::Group(_) => None,
        }
    }

    /// Body text with the parameter called `name`, and whether it needs
    /// parentheses as an operand of `&&`.
    fn body(&self, ctx: &RuleContext<'_>, name: &str) -> (String, bool) {
        let tree = ctx.tree();
        match self {
            Predicate::Lambda { param, body } => {
                let text = rename_parameter(ctx, *param, *body, name);
                (text, binds_looser_than_and(tree, *body))
            }
            Predicate::Group(group) => (format!("{}({})", tree.text(*group), name), false),
        }
    }

    fn root(&self) -> NodeId {
        match self {
            Predicate::Lambda { body, .. } => *body,
            Predicate::Group(group) => *group,
        }
    }
}

fn binds_looser_than_and(tree: &Tree, node: NodeId) -> bool {
    match tree.kind(node) {
        NodeKind::BinaryExpression => tree
            .child(node, 1)
            .is_some_and(|op| matches!(tree.text(op), "||" | "??")),
        NodeKind::ConditionalExpression
        | NodeKind::AssignmentExpression
        | NodeKind::LambdaExpression => true,
        _ => false,
    }
}

/// Text of `body` with every reference to `param` spelled `name`.
fn rename_parameter(ctx: &RuleContext<'_>, param: NodeId, body: NodeId, name: &str) -> String {
    let tree = ctx.tree();
    let base = tree.span(body).start;
    let mut text = tree.text(body).to_string();
    let mut references: Vec<TextSpan> = tree
        .descendants(body)
        .filter(|n| tree.kind(*n) == NodeKind::IdentifierName)
        .filter(|n| {
            ctx.model
                .resolve_symbol(*n)
                .is_some_and(|s| s.declaration == Some(param))
        })
        .map(|n| tree.span(n))
        .collect();
    references.sort_by(|a, b| b.start.cmp(&a.start));
    for span in references {
        text.replace_range(span.start - base..span.end - base, name);
    }
    text
}

/// Names an expression mentions that do not refer to `own_param`.
fn free_names<'t>(ctx: &RuleContext<'t>, root: NodeId, own_param: Option<NodeId>) -> HashSet<&'t str> {
    let tree = ctx.tree();
    tree.descendants(root)
        .filter(|n| matches!(tree.kind(*n), NodeKind::IdentifierName | NodeKind::IdentifierToken))
        .filter(|n| {
            own_param.is_none()
                || ctx
                    .model
                    .resolve_symbol(*n)
                    .map_or(true, |s| s.declaration != own_param)
        })
        .map(|n| tree.text(n))
        .collect()
}

fn fresh_name(taken: &HashSet<&str>) -> String {
    FRESH_NAMES
        .iter()
        .find(|n| !taken.contains(*n))
        .map(|n| n.to_string())
        .unwrap_or_else(|| {
            (1..)
                .map(|i| format!("x{}", i))
                .find(|n| !taken.contains(n.as_str()))
                .unwrap_or_default()
        })
}

impl Rule for CombineLinqRule {
    fn id(&self) -> RuleId {
        RuleId::new("MA0029")
    }

    fn name(&self) -> &str {
        "Combine LINQ methods"
    }

    fn description(&self) -> &str {
        "Detects Where(...) calls that can be merged into the following LINQ call"
    }

    fn default_severity(&self) -> Severity {
        Severity::Info
    }

    fn interests(&self) -> &[NodeKind] {
        &[NodeKind::InvocationExpression]
    }

    fn check(&self, ctx: &RuleContext<'_>, node: NodeId, sink: &mut DiagnosticSink) {
        let Some(found) = chain(ctx, node) else {
            return;
        };
        let tree = ctx.tree();
        let span = TextSpan::new(tree.span(found.where_name).start, tree.span(found.outer).end);
        sink.report(Diagnostic::new(
            self.id(),
            self.default_severity(),
            span,
            format!("Combine 'Where' with '{}'", tree.text(found.method)),
        ));
    }

    fn supports_fix(&self) -> bool {
        true
    }
}

impl CodeFix for CombineLinqRule {
    fn rule_id(&self) -> RuleId {
        self.id()
    }

    fn title(&self) -> &str {
        "Combine LINQ methods"
    }

    fn compute(&self, ctx: &RuleContext<'_>, diagnostic: &Diagnostic) -> Result<TextEdit> {
        let tree = ctx.tree();
        let covering = tree.covering_node(diagnostic.span);
        let outer = std::iter::once(covering)
            .chain(tree.ancestors(covering))
            .find(|n| {
                tree.kind(*n) == NodeKind::InvocationExpression
                    && tree.span(*n).end == diagnostic.span.end
            })
            .ok_or_else(|| unsupported(self.id(), "no invocation at diagnostic"))?;
        let found = chain(ctx, outer).ok_or_else(|| unsupported(self.id(), "not a Where chain"))?;
        let method = tree.text(found.method);

        let Some(predicate) = found.predicate else {
            let replacement = format!("{}({})", method, tree.text(found.filter));
            return Ok(TextEdit::replace(diagnostic.span, replacement));
        };

        let first = Predicate::of(tree, found.filter)
            .ok_or_else(|| unsupported(self.id(), "filter is neither a lambda nor a method group"))?;
        let second = Predicate::of(tree, predicate)
            .ok_or_else(|| unsupported(self.id(), "predicate is neither a lambda nor a method group"))?;

        let first_param = match &first {
            Predicate::Lambda { param, .. } => Some(*param),
            Predicate::Group(_) => None,
        };
        let second_param = match &second {
            Predicate::Lambda { param, .. } => Some(*param),
            Predicate::Group(_) => None,
        };
        let mut taken = free_names(ctx, first.root(), first_param);
        taken.extend(free_names(ctx, second.root(), second_param));

        // two lambdas keep the first parameter name unless the second
        // lambda already uses it for something else
        let name = match (first.param_name(tree), second.param_name(tree)) {
            (Some(a), Some(_)) if !taken.contains(a) => a.to_string(),
            _ => fresh_name(&taken),
        };

        let (left, left_parens) = first.body(ctx, &name);
        let (right, right_parens) = second.body(ctx, &name);
        let operand = |text: String, parens: bool| if parens { format!("({})", text) } else { text };
        let replacement = format!(
            "{}({} => {} && {})",
            method,
            name,
            operand(left, left_parens),
            operand(right, right_parens)
        );
        Ok(TextEdit::replace(diagnostic.span, replacement))
    }
}
