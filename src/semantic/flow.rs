//! Control-flow queries: reachability and exit points.

use std::collections::HashSet;

use serde::Serialize;

use super::types::Constant;
use super::SemanticModel;
use crate::syntax::{NodeId, NodeKind, TextSpan};

/// How control leaves a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitKind {
    Return,
    Break,
    Continue,
    Goto,
    Throw,
    YieldBreak,
}

/// A jump statement that transfers control out of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitPoint {
    pub kind: ExitKind,
    pub node: NodeId,
    pub span: TextSpan,
}

impl SemanticModel {
    /// Whether control can reach `statement` from the start of its
    /// enclosing function.
    pub fn is_reachable(&self, statement: NodeId) -> bool {
        if let Some(cached) = self.memo_get(&self.reachable, statement) {
            return cached;
        }
        let value = self.compute_reachable(statement);
        self.memo_put(&self.reachable, statement, value);
        value
    }

    /// Whether control can leave `statement` by falling off its end.
    pub fn end_reachable(&self, statement: NodeId) -> bool {
        if let Some(cached) = self.memo_get(&self.end_reachable, statement) {
            return cached;
        }
        let value = self.compute_end_reachable(statement);
        self.memo_put(&self.end_reachable, statement, value);
        value
    }

    /// Jump statements inside `region` that transfer control out of it,
    /// in source order.
    ///
    /// Jumps inside nested lambdas and local functions belong to those
    /// functions. `break`/`continue` aimed at a loop inside the region and
    /// `goto` to a label inside the region stay within it.
    pub fn exit_points(&self, region: NodeId) -> Vec<ExitPoint> {
        let tree = &self.tree;
        let labels: HashSet<&str> = tree
            .descendants(region)
            .filter(|n| tree.kind(*n) == NodeKind::LabeledStatement)
            .filter_map(|n| tree.child(n, 0))
            .map(|n| tree.text(n))
            .collect();

        let mut exits = Vec::new();
        let mut nodes = tree.descendants(region);
        while let Some(node) = nodes.next() {
            let kind = tree.kind(node);
            if node != region && kind.is_function_like() {
                nodes.skip_children(node);
                continue;
            }
            let exit = match kind {
                NodeKind::ReturnStatement => Some(ExitKind::Return),
                NodeKind::ThrowStatement => Some(ExitKind::Throw),
                NodeKind::YieldBreakStatement => Some(ExitKind::YieldBreak),
                NodeKind::BreakStatement | NodeKind::ContinueStatement => {
                    let inside = self
                        .jump_target(node)
                        .is_some_and(|target| self.is_within(target, region));
                    match (inside, kind) {
                        (true, _) => None,
                        (false, NodeKind::BreakStatement) => Some(ExitKind::Break),
                        (false, _) => Some(ExitKind::Continue),
                    }
                }
                NodeKind::GotoStatement => {
                    let label = tree.child(node, 0).map(|l| tree.text(l));
                    match label {
                        Some(label) if labels.contains(label) => None,
                        _ => Some(ExitKind::Goto),
                    }
                }
                _ => None,
            };
            if let Some(kind) = exit {
                exits.push(ExitPoint {
                    kind,
                    node,
                    span: tree.span(node),
                });
            }
        }
        exits
    }

    fn is_within(&self, node: NodeId, region: NodeId) -> bool {
        node == region || self.tree.ancestors(node).any(|a| a == region)
    }

    /// Loop targeted by a `break` or `continue`.
    fn jump_target(&self, jump: NodeId) -> Option<NodeId> {
        let tree = &self.tree;
        tree.ancestors(jump)
            .take_while(|a| !tree.kind(*a).is_function_like())
            .find(|a| tree.kind(*a).is_loop())
    }

    fn loop_has_jump(&self, target: NodeId, jump: NodeKind) -> bool {
        let tree = &self.tree;
        let mut nodes = tree.descendants(target);
        while let Some(node) = nodes.next() {
            if tree.kind(node).is_function_like() {
                nodes.skip_children(node);
                continue;
            }
            if tree.kind(node) == jump && self.jump_target(node) == Some(target) {
                return true;
            }
        }
        false
    }

    fn condition(&self, node: NodeId) -> Option<bool> {
        match self.constant_value(node)? {
            Constant::Bool(b) => Some(b),
            Constant::Int(_) => None,
        }
    }

    fn compute_end_reachable(&self, statement: NodeId) -> bool {
        let tree = &self.tree;
        let child = |n| tree.child(statement, n);
        match tree.kind(statement) {
            NodeKind::ReturnStatement
            | NodeKind::BreakStatement
            | NodeKind::ContinueStatement
            | NodeKind::GotoStatement
            | NodeKind::ThrowStatement
            | NodeKind::YieldBreakStatement => false,
            NodeKind::Block => self.sequence_end_reachable(tree.children(statement)),
            NodeKind::IfStatement => {
                let then_end = child(1).map_or(true, |s| self.end_reachable(s));
                let else_end = child(2)
                    .and_then(|e| tree.child(e, 0))
                    .map_or(true, |s| self.end_reachable(s));
                match child(0).and_then(|c| self.condition(c)) {
                    Some(true) => then_end,
                    Some(false) => else_end,
                    None => then_end || else_end,
                }
            }
            NodeKind::ElseClause => child(0).map_or(true, |s| self.end_reachable(s)),
            NodeKind::WhileStatement => match child(0).and_then(|c| self.condition(c)) {
                Some(true) => self.loop_has_jump(statement, NodeKind::BreakStatement),
                _ => true,
            },
            NodeKind::DoStatement => {
                if self.loop_has_jump(statement, NodeKind::BreakStatement) {
                    return true;
                }
                let body_completes = child(0).map_or(true, |s| self.end_reachable(s))
                    || self.loop_has_jump(statement, NodeKind::ContinueStatement);
                body_completes && child(1).and_then(|c| self.condition(c)) != Some(true)
            }
            NodeKind::LabeledStatement => child(1).map_or(true, |s| self.end_reachable(s)),
            _ => true,
        }
    }

    /// Labeled statements are treated as reachable since a `goto` may
    /// target them.
    fn sequence_end_reachable(&self, statements: &[NodeId]) -> bool {
        let mut reachable = true;
        for &statement in statements {
            if self.tree.kind(statement) == NodeKind::LabeledStatement {
                reachable = true;
            }
            if reachable {
                reachable = self.end_reachable(statement);
            }
        }
        reachable
    }

    fn compute_reachable(&self, statement: NodeId) -> bool {
        let tree = &self.tree;
        let Some(parent) = tree.parent(statement) else {
            return true;
        };
        match tree.kind(parent) {
            NodeKind::Block => {
                if !self.is_reachable(parent) {
                    return false;
                }
                let mut reachable = true;
                for &sibling in tree.children(parent) {
                    if tree.kind(sibling) == NodeKind::LabeledStatement {
                        reachable = true;
                    }
                    if sibling == statement {
                        return reachable;
                    }
                    if reachable {
                        reachable = self.end_reachable(sibling);
                    }
                }
                true
            }
            NodeKind::IfStatement => {
                let condition = tree.child(parent, 0).and_then(|c| self.condition(c));
                self.is_reachable(parent) && condition != Some(false)
            }
            NodeKind::ElseClause => {
                let Some(if_statement) = tree.parent(parent) else {
                    return true;
                };
                let condition = tree.child(if_statement, 0).and_then(|c| self.condition(c));
                self.is_reachable(if_statement) && condition != Some(true)
            }
            NodeKind::WhileStatement => {
                let condition = tree.child(parent, 0).and_then(|c| self.condition(c));
                self.is_reachable(parent) && condition != Some(false)
            }
            kind if kind.is_statement() => self.is_reachable(parent),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{parse, Tree};

    fn model(source: &str) -> SemanticModel {
        SemanticModel::new(parse(source).unwrap())
    }

    fn nodes(tree: &Tree, kind: NodeKind) -> Vec<NodeId> {
        tree.descendants(tree.root())
            .filter(|n| tree.kind(*n) == kind)
            .collect()
    }

    fn then_branch(model: &SemanticModel) -> NodeId {
        let tree = model.tree();
        let if_statement = nodes(tree, NodeKind::IfStatement)[0];
        tree.child(if_statement, 1).unwrap()
    }

    #[test]
    fn return_ends_control_flow() {
        let model = model("class C { void M(bool b) { if (b) { return; } else { M(b); } } }");
        assert!(!model.end_reachable(then_branch(&model)));
    }

    #[test]
    fn if_without_else_completes() {
        let model = model("class C { void M(bool b) { if (b) { return; } } }");
        let tree = model.tree();
        let if_statement = nodes(tree, NodeKind::IfStatement)[0];
        assert!(model.end_reachable(if_statement));
    }

    #[test]
    fn both_branches_terminating_ends_flow() {
        let model = model(
            "class C { int M(bool b) { if (b) { return 1; } else { throw null; } } }",
        );
        let tree = model.tree();
        let if_statement = nodes(tree, NodeKind::IfStatement)[0];
        assert!(!model.end_reachable(if_statement));
    }

    #[test]
    fn statement_after_return_is_unreachable() {
        let model = model("class C { void M() { return; M(); } }");
        let tree = model.tree();
        let call = nodes(tree, NodeKind::ExpressionStatement)[0];
        assert!(!model.is_reachable(call));
    }

    #[test]
    fn labeled_statement_after_goto_is_reachable() {
        let model = model("class C { void M() { goto end; end: return; } }");
        let tree = model.tree();
        let labeled = nodes(tree, NodeKind::LabeledStatement)[0];
        assert!(model.is_reachable(labeled));
    }

    #[test]
    fn infinite_loop_without_break_never_completes() {
        let endless = model("class C { void M() { while (true) { M(); } } }");
        let looped = nodes(endless.tree(), NodeKind::WhileStatement)[0];
        assert!(!endless.end_reachable(looped));

        let breaking = model("class C { void M() { while (true) { break; } } }");
        let looped = nodes(breaking.tree(), NodeKind::WhileStatement)[0];
        assert!(breaking.end_reachable(looped));
    }

    #[test]
    fn constant_false_branch_is_unreachable() {
        let model = model("class C { void M() { if (false) { M(); } } }");
        let tree = model.tree();
        let call = nodes(tree, NodeKind::ExpressionStatement)[0];
        assert!(!model.is_reachable(call));
    }

    #[test]
    fn exit_points_skip_nested_loops_and_lambdas() {
        let model = model(
            "class C { int M(int[] xs) { foreach (var x in xs) { if (x == 0) break; continue; } System.Func<int> f = () => { return 1; }; if (xs == null) throw null; return 0; } }",
        );
        let tree = model.tree();
        let body = nodes(tree, NodeKind::Block)[0];
        let kinds: Vec<_> = model.exit_points(body).iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ExitKind::Throw, ExitKind::Return]);

        let loop_body = tree.child(nodes(tree, NodeKind::ForEachStatement)[0], 3).unwrap();
        let kinds: Vec<_> = model.exit_points(loop_body).iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ExitKind::Break, ExitKind::Continue]);
    }

    #[test]
    fn goto_to_inner_label_is_not_an_exit() {
        let model = model("class C { void M() { again: goto again; goto out; } }");
        let tree = model.tree();
        let body = nodes(tree, NodeKind::Block)[0];
        let exits = model.exit_points(body);
        assert_eq!(exits.len(), 1);
        assert_eq!(exits[0].kind, ExitKind::Goto);
        assert_eq!(tree.text(exits[0].node), "goto out;");
    }
}
