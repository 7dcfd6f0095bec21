//! Built-in rules.
//!
//! This module contains the rules that ship with ruleforge. Each rule also
//! implements [`CodeFix`](crate::fix::CodeFix) when it can rewrite the code
//! it reports; the helpers below are shared by those fixes.

pub mod bool_comparison;
pub mod combine_linq;
pub mod count_comparison;
pub mod file_name;
pub mod redundant_else;

pub use bool_comparison::BoolComparisonRule;
pub use combine_linq::CombineLinqRule;
pub use count_comparison::CountComparisonRule;
pub use file_name::FileNameRule;
pub use redundant_else::RedundantElseRule;

use crate::error::{Error, Result};
use crate::lint::{Diagnostic, RuleId};
use crate::syntax::{NodeId, NodeKind, Tree};

/// Expressions that bind tighter than any binary operator.
pub(crate) fn is_tight(kind: NodeKind) -> bool {
    use NodeKind::*;
    matches!(
        kind,
        IdentifierName
            | ThisExpression
            | TrueLiteral
            | FalseLiteral
            | NullLiteral
            | NumericLiteral
            | StringLiteral
            | CharacterLiteral
            | DefaultLiteral
            | TypeOfExpression
            | ParenthesizedExpression
            | MemberAccessExpression
            | ConditionalAccessExpression
            | InvocationExpression
            | ElementAccessExpression
            | ObjectCreationExpression
            | ArrayCreationExpression
            | PostfixUnaryExpression
            | PrefixUnaryExpression
    )
}

/// Strip any number of enclosing parentheses.
pub(crate) fn unparenthesize(tree: &Tree, mut node: NodeId) -> NodeId {
    while tree.kind(node) == NodeKind::ParenthesizedExpression {
        match tree.child(node, 0) {
            Some(inner) => node = inner,
            None => break,
        }
    }
    node
}

/// Whether the expression at `node` sits where any expression may appear
/// without parentheses.
pub(crate) fn in_open_context(tree: &Tree, node: NodeId) -> bool {
    use NodeKind::*;
    let Some(parent) = tree.parent(node) else {
        return true;
    };
    !matches!(
        tree.kind(parent),
        BinaryExpression
            | PrefixUnaryExpression
            | PostfixUnaryExpression
            | MemberAccessExpression
            | ConditionalAccessExpression
            | InvocationExpression
            | ElementAccessExpression
            | ConditionalExpression
    )
}

/// Logical negation of an expression's text.
pub(crate) fn negate(tree: &Tree, node: NodeId) -> String {
    let text = tree.text(node);
    if is_tight(tree.kind(node)) {
        format!("!{}", text)
    } else {
        format!("!({})", text)
    }
}

/// Leading whitespace of the line containing `offset`.
pub(crate) fn indentation_at(tree: &Tree, offset: usize) -> &str {
    let start = tree.line_index().line_start(offset);
    let line = &tree.source()[start..];
    let width = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..width]
}

/// Whitespace reaching the column of `offset`.
///
/// Equal to [`indentation_at`] when only whitespace precedes `offset` on its
/// line; otherwise the preceding code is padded out with spaces.
pub(crate) fn column_indentation(tree: &Tree, offset: usize) -> String {
    let start = tree.line_index().line_start(offset);
    tree.source()[start..offset]
        .chars()
        .map(|c| if c == '\t' { '\t' } else { ' ' })
        .collect()
}

/// Node of `kind` at exactly the diagnostic's primary span.
pub(crate) fn diagnosed_node(tree: &Tree, diagnostic: &Diagnostic, kind: NodeKind) -> Result<NodeId> {
    tree.find_node(diagnostic.span, kind).ok_or_else(|| {
        Error::not_fixable(
            diagnostic.rule_id.clone(),
            format!("no {} at {}", kind, diagnostic.span),
        )
    })
}

pub(crate) fn unsupported(rule_id: RuleId, shape: &str) -> Error {
    Error::not_fixable(rule_id, format!("unsupported shape: {}", shape))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;

    fn find(tree: &Tree, kind: NodeKind) -> NodeId {
        tree.descendants(tree.root())
            .find(|n| tree.kind(*n) == kind)
            .unwrap()
    }

    #[test]
    fn unparenthesize_strips_nested_parens() {
        let tree = parse("class C { bool M(bool a) => ((a)); }").unwrap();
        let outer = find(&tree, NodeKind::ParenthesizedExpression);
        assert_eq!(tree.text(unparenthesize(&tree, outer)), "a");
    }

    #[test]
    fn negation_parenthesizes_loose_expressions() {
        let tree = parse("class C { bool M(bool a, bool b) => a || b; }").unwrap();
        let binary = find(&tree, NodeKind::BinaryExpression);
        assert_eq!(negate(&tree, binary), "!(a || b)");
        let name = find(&tree, NodeKind::IdentifierName);
        assert_eq!(negate(&tree, name), "!a");
    }

    #[test]
    fn indentation_of_nested_line() {
        let source = "class C\n{\n    void M()\n    {\n    }\n}\n";
        let tree = parse(source).unwrap();
        let method = find(&tree, NodeKind::MethodDeclaration);
        assert_eq!(indentation_at(&tree, tree.span(method).start), "    ");
        assert_eq!(column_indentation(&tree, tree.span(method).start), "    ");
    }
}
