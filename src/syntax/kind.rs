//! Node kind tags.

use std::str::FromStr;

macro_rules! node_kinds {
    ($($kind:ident),+ $(,)?) => {
        /// Kind tag of a syntax node.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum NodeKind {
            $($kind),+
        }

        impl NodeKind {
            /// Every node kind, in declaration order.
            pub const ALL: &'static [NodeKind] = &[$(NodeKind::$kind),+];

            /// Name of the kind as written in configuration keys.
            pub fn name(&self) -> &'static str {
                match self {
                    $(NodeKind::$kind => stringify!($kind)),+
                }
            }
        }

        impl FromStr for NodeKind {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($kind) => Ok(NodeKind::$kind),)+
                    _ => Err(format!("unknown node kind: {}", s)),
                }
            }
        }
    };
}

node_kinds! {
    CompilationUnit,
    UsingDirective,
    NamespaceDeclaration,
    QualifiedName,
    TypeDeclaration,
    TypeParameterList,
    BaseList,
    FieldDeclaration,
    PropertyDeclaration,
    AccessorList,
    AccessorDeclaration,
    MethodDeclaration,
    ConstructorDeclaration,
    ParameterList,
    Parameter,
    ArrowExpressionClause,
    TypeSyntax,
    IdentifierToken,
    VariableDeclarator,
    Block,
    LocalDeclarationStatement,
    LocalFunctionStatement,
    ExpressionStatement,
    IfStatement,
    ElseClause,
    WhileStatement,
    DoStatement,
    ForEachStatement,
    ReturnStatement,
    BreakStatement,
    ContinueStatement,
    ThrowStatement,
    GotoStatement,
    LabeledStatement,
    YieldReturnStatement,
    YieldBreakStatement,
    EmptyStatement,
    BinaryExpression,
    AssignmentExpression,
    ConditionalExpression,
    PrefixUnaryExpression,
    PostfixUnaryExpression,
    ParenthesizedExpression,
    MemberAccessExpression,
    ConditionalAccessExpression,
    InvocationExpression,
    ElementAccessExpression,
    ArgumentList,
    BracketedArgumentList,
    IdentifierName,
    ThisExpression,
    LambdaExpression,
    ObjectCreationExpression,
    ArrayCreationExpression,
    InitializerExpression,
    TypeOfExpression,
    TrueLiteral,
    FalseLiteral,
    NullLiteral,
    DefaultLiteral,
    NumericLiteral,
    StringLiteral,
    CharacterLiteral,
    OperatorToken,
}

impl NodeKind {
    /// Whether nodes of this kind are statements.
    pub fn is_statement(&self) -> bool {
        use NodeKind::*;
        matches!(
            self,
            Block
                | LocalDeclarationStatement
                | LocalFunctionStatement
                | ExpressionStatement
                | IfStatement
                | WhileStatement
                | DoStatement
                | ForEachStatement
                | ReturnStatement
                | BreakStatement
                | ContinueStatement
                | ThrowStatement
                | GotoStatement
                | LabeledStatement
                | YieldReturnStatement
                | YieldBreakStatement
                | EmptyStatement
        )
    }

    /// Whether nodes of this kind are literal expressions.
    pub fn is_literal(&self) -> bool {
        use NodeKind::*;
        matches!(
            self,
            TrueLiteral
                | FalseLiteral
                | NullLiteral
                | DefaultLiteral
                | NumericLiteral
                | StringLiteral
                | CharacterLiteral
        )
    }

    /// Whether nodes of this kind are expressions.
    pub fn is_expression(&self) -> bool {
        use NodeKind::*;
        self.is_literal()
            || matches!(
                self,
                BinaryExpression
                    | AssignmentExpression
                    | ConditionalExpression
                    | PrefixUnaryExpression
                    | PostfixUnaryExpression
                    | ParenthesizedExpression
                    | MemberAccessExpression
                    | ConditionalAccessExpression
                    | InvocationExpression
                    | ElementAccessExpression
                    | IdentifierName
                    | ThisExpression
                    | LambdaExpression
                    | ObjectCreationExpression
                    | ArrayCreationExpression
                    | TypeOfExpression
            )
    }

    /// Whether nodes of this kind introduce a new function body.
    pub fn is_function_like(&self) -> bool {
        matches!(
            self,
            NodeKind::MethodDeclaration
                | NodeKind::ConstructorDeclaration
                | NodeKind::LocalFunctionStatement
                | NodeKind::LambdaExpression
                | NodeKind::AccessorDeclaration
        )
    }

    /// Whether nodes of this kind are loops (targets of `break`/`continue`).
    pub fn is_loop(&self) -> bool {
        matches!(
            self,
            NodeKind::WhileStatement | NodeKind::DoStatement | NodeKind::ForEachStatement
        )
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for kind in NodeKind::ALL {
            assert_eq!(kind.name().parse::<NodeKind>(), Ok(*kind));
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!("Expression".parse::<NodeKind>().is_err());
    }

    #[test]
    fn categories() {
        assert!(NodeKind::IfStatement.is_statement());
        assert!(!NodeKind::IfStatement.is_expression());
        assert!(NodeKind::TrueLiteral.is_expression());
        assert!(NodeKind::LambdaExpression.is_function_like());
        assert!(NodeKind::ForEachStatement.is_loop());
    }
}
