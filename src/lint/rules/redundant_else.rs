//! `else` after a branch that never completes normally.
//!
//! ```text
//! if (done) { return; } else { Work(); }   =>   if (done) { return; }
//!                                               Work();
//! ```

use std::collections::HashSet;

use super::{column_indentation, indentation_at, unsupported};
use crate::error::{Error, Result};
use crate::fix::{CodeFix, TextEdit};
use crate::lint::{Diagnostic, DiagnosticSink, Rule, RuleContext, RuleId, Severity};
use crate::syntax::{NodeId, NodeKind, TextSpan, Tree};

const ELSE_KEYWORD: &str = "else";

/// Reports `else` clauses that can be hoisted into the enclosing block.
pub struct RedundantElseRule;

struct RedundantElse {
    statement: NodeId,
    then_branch: NodeId,
    else_clause: NodeId,
    else_body: NodeId,
}

fn redundant_else(ctx: &RuleContext<'_>, statement: NodeId) -> Option<RedundantElse> {
    let tree = ctx.tree();
    if tree.parent(statement).map(|p| tree.kind(p)) != Some(NodeKind::Block) {
        return None;
    }
    let then_branch = tree.child(statement, 1)?;
    let else_clause = tree.child_of_kind(statement, NodeKind::ElseClause)?;
    let else_body = tree.child(else_clause, 0)?;
    if ctx.model.end_reachable(then_branch) {
        return None;
    }
    Some(RedundantElse {
        statement,
        then_branch,
        else_clause,
        else_body,
    })
}

fn else_keyword(tree: &Tree, else_clause: NodeId) -> TextSpan {
    let start = tree.span(else_clause).start;
    TextSpan::new(start, start + ELSE_KEYWORD.len())
}

fn declared_name(tree: &Tree, token: NodeId) -> Option<&str> {
    let owner = tree.parent(token)?;
    matches!(
        tree.kind(owner),
        NodeKind::VariableDeclarator
            | NodeKind::LocalFunctionStatement
            | NodeKind::Parameter
            | NodeKind::ForEachStatement
    )
    .then(|| tree.text(token))
}

/// Names the else block declares in its own scope.
fn hoisted_names(tree: &Tree, body: NodeId) -> HashSet<&str> {
    if tree.kind(body) != NodeKind::Block {
        return HashSet::new();
    }
    tree.children(body)
        .iter()
        .filter(|s| {
            matches!(
                tree.kind(**s),
                NodeKind::LocalDeclarationStatement | NodeKind::LocalFunctionStatement
            )
        })
        .flat_map(|s| tree.descendants(*s))
        .filter(|n| tree.kind(*n) == NodeKind::IdentifierToken)
        .filter_map(|n| declared_name(tree, n))
        .collect()
}

/// Whether moving the else block's locals up one scope would collide with
/// a name declared elsewhere in the enclosing block.
fn has_name_clash(tree: &Tree, found: &RedundantElse) -> bool {
    let hoisted = hoisted_names(tree, found.else_body);
    if hoisted.is_empty() {
        return false;
    }
    let Some(enclosing) = tree.parent(found.statement) else {
        return false;
    };
    let mut walk = tree.descendants(enclosing);
    while let Some(node) = walk.next() {
        if node == found.else_body {
            walk.skip_children(node);
            continue;
        }
        if tree.kind(node) == NodeKind::IdentifierToken
            && declared_name(tree, node).is_some_and(|name| hoisted.contains(name))
        {
            return true;
        }
    }
    false
}

/// Lines of the else body with their shared indentation removed.
fn body_lines<'t>(tree: &'t Tree, body: NodeId) -> Vec<&'t str> {
    let span = tree.span(body);
    if tree.kind(body) != NodeKind::Block {
        // continuation lines are relative to the line the statement starts on
        let indent = indentation_at(tree, span.start);
        return tree
            .text(body)
            .lines()
            .enumerate()
            .map(|(i, line)| match i {
                0 => line,
                _ => line.strip_prefix(indent).unwrap_or(line),
            })
            .map(str::trim_end)
            .collect();
    }

    let inner = tree.text_at(TextSpan::new(span.start + 1, span.end - 1));
    let mut lines: Vec<&str> = inner.lines().collect();
    while lines.first().is_some_and(|l| l.trim().is_empty()) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    let common = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);
    lines
        .into_iter()
        .map(|l| l.get(common..).unwrap_or_else(|| l.trim_start()).trim_end())
        .collect()
}

impl Rule for RedundantElseRule {
    fn id(&self) -> RuleId {
        RuleId::new("RF0001")
    }

    fn name(&self) -> &str {
        "Remove redundant else"
    }

    fn description(&self) -> &str {
        "Detects else clauses following a branch that always jumps away"
    }

    fn default_severity(&self) -> Severity {
        Severity::Info
    }

    fn interests(&self) -> &[NodeKind] {
        &[NodeKind::IfStatement]
    }

    fn check(&self, ctx: &RuleContext<'_>, node: NodeId, sink: &mut DiagnosticSink) {
        let Some(found) = redundant_else(ctx, node) else {
            return;
        };
        sink.report(Diagnostic::new(
            self.id(),
            self.default_severity(),
            else_keyword(ctx.tree(), found.else_clause),
            "Redundant 'else' after a branch that does not complete",
        ));
    }

    fn supports_fix(&self) -> bool {
        true
    }
}

impl CodeFix for RedundantElseRule {
    fn rule_id(&self) -> RuleId {
        self.id()
    }

    fn title(&self) -> &str {
        "Remove 'else' and unindent its body"
    }

    fn compute(&self, ctx: &RuleContext<'_>, diagnostic: &Diagnostic) -> Result<TextEdit> {
        let tree = ctx.tree();
        let statement = tree
            .ancestor_of_kind(tree.covering_node(diagnostic.span), NodeKind::IfStatement)
            .ok_or_else(|| unsupported(self.id(), "no if statement at the diagnostic"))?;
        let found = redundant_else(ctx, statement)
            .filter(|f| else_keyword(tree, f.else_clause) == diagnostic.span)
            .ok_or_else(|| unsupported(self.id(), "else is not redundant"))?;
        if has_name_clash(tree, &found) {
            return Err(Error::not_fixable(
                self.id(),
                "hoisting the else block would redeclare a local",
            ));
        }

        let indent = column_indentation(tree, tree.span(found.statement).start);
        let mut replacement = String::new();
        for line in body_lines(tree, found.else_body) {
            replacement.push('\n');
            if !line.is_empty() {
                replacement.push_str(&indent);
                replacement.push_str(line);
            }
        }
        let span = TextSpan::new(tree.span(found.then_branch).end, tree.span(found.statement).end);
        Ok(TextEdit::replace(span, replacement))
    }
}
