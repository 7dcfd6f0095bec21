//! Type references, type inference and constant evaluation.

use std::fmt;

use super::library;
use super::symbols::{BindingTable, SymbolKind};
use crate::syntax::{NodeId, NodeKind, Tree};

const ALIASES: &[(&str, &str)] = &[
    ("Boolean", "bool"),
    ("Byte", "byte"),
    ("Char", "char"),
    ("Decimal", "decimal"),
    ("Double", "double"),
    ("Int16", "short"),
    ("Int32", "int"),
    ("Int64", "long"),
    ("Object", "object"),
    ("Single", "float"),
    ("String", "string"),
];

const SEQUENCE_TYPES: &[&str] = &[
    "IEnumerable",
    "IOrderedEnumerable",
    "IQueryable",
    "ICollection",
    "IList",
    "IReadOnlyCollection",
    "IReadOnlyList",
    "ISet",
    "List",
    "HashSet",
    "SortedSet",
    "LinkedList",
    "Queue",
    "Stack",
    "Collection",
    "ReadOnlyCollection",
];

const COUNTED_TYPES: &[&str] = &[
    "ICollection",
    "IList",
    "IReadOnlyCollection",
    "IReadOnlyList",
    "ISet",
    "List",
    "HashSet",
    "SortedSet",
    "LinkedList",
    "Queue",
    "Stack",
    "Collection",
    "ReadOnlyCollection",
    "Dictionary",
    "IDictionary",
    "IReadOnlyDictionary",
];

const INTEGRAL: &[&str] = &["sbyte", "byte", "short", "ushort", "int", "uint", "long", "ulong"];

/// A resolved type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// A named type with optional type arguments.
    Named { name: String, args: Vec<TypeRef> },
    /// A single-dimensional array.
    Array(Box<TypeRef>),
    /// A nullable value or reference type (`T?`).
    Nullable(Box<TypeRef>),
}

impl TypeRef {
    /// A named type without type arguments.
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// A named generic type.
    pub fn generic(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        TypeRef::Named {
            name: name.into(),
            args,
        }
    }

    pub fn bool() -> Self {
        Self::named("bool")
    }

    pub fn int() -> Self {
        Self::named("int")
    }

    /// Name of a named type.
    pub fn name(&self) -> Option<&str> {
        match self {
            TypeRef::Named { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Whether this is exactly `bool` (not `bool?`).
    pub fn is_bool(&self) -> bool {
        matches!(self, TypeRef::Named { name, args } if name == "bool" && args.is_empty())
    }

    /// Whether this is a built-in integral type.
    pub fn is_integral(&self) -> bool {
        self.name().is_some_and(|n| INTEGRAL.contains(&n))
    }

    /// Whether this is a built-in numeric type.
    pub fn is_numeric(&self) -> bool {
        self.is_integral()
            || self
                .name()
                .is_some_and(|n| matches!(n, "float" | "double" | "decimal"))
    }

    /// Element type when the value can be enumerated.
    pub fn element_type(&self) -> Option<TypeRef> {
        match self {
            TypeRef::Array(element) => Some((**element).clone()),
            TypeRef::Nullable(_) => None,
            TypeRef::Named { name, args } => match (name.as_str(), args.as_slice()) {
                ("string", []) => Some(TypeRef::named("char")),
                ("Dictionary" | "IDictionary" | "IReadOnlyDictionary", [k, v]) => Some(
                    TypeRef::generic("KeyValuePair", vec![k.clone(), v.clone()]),
                ),
                (n, [element]) if SEQUENCE_TYPES.contains(&n) => Some(element.clone()),
                _ => None,
            },
        }
    }

    /// Whether the value can be enumerated.
    pub fn is_sequence(&self) -> bool {
        self.element_type().is_some()
    }

    /// Type of a well-known size property (`Count`, `Length`).
    pub fn size_property(&self, property: &str) -> Option<TypeRef> {
        match (self, property) {
            (TypeRef::Array(_), "Length") => Some(TypeRef::int()),
            (TypeRef::Named { name, .. }, "Length") if name == "string" => Some(TypeRef::int()),
            (TypeRef::Named { name, .. }, "Count") if COUNTED_TYPES.contains(&name.as_str()) => {
                Some(TypeRef::int())
            }
            _ => None,
        }
    }

    /// Build a type from a `TypeSyntax` node.
    ///
    /// Returns `None` for `var` (the caller infers it) and `dynamic`
    /// (which never has a static type).
    pub fn from_syntax(tree: &Tree, node: NodeId) -> Option<TypeRef> {
        let text = tree.text(node);
        let base_end = text
            .find(|c| matches!(c, '<' | '?' | '['))
            .unwrap_or(text.len());
        let qualified = text[..base_end].trim();
        let base = qualified.rsplit('.').next().unwrap_or(qualified);
        if base == "var" || base == "dynamic" || base == "void" {
            return None;
        }
        let name = ALIASES
            .iter()
            .find(|(alias, _)| *alias == base)
            .map(|(_, keyword)| *keyword)
            .unwrap_or(base);

        let args = tree
            .children(node)
            .iter()
            .map(|c| TypeRef::from_syntax(tree, *c))
            .collect::<Option<Vec<_>>>()?;

        let mut ty = TypeRef::generic(name, args);
        let suffix_start = text.rfind('>').map(|i| i + 1).unwrap_or(base_end);
        let mut rest = &text[suffix_start..];
        loop {
            rest = rest.trim_start();
            if let Some(r) = rest.strip_prefix('?') {
                ty = TypeRef::Nullable(Box::new(ty));
                rest = r;
            } else if let Some(r) = rest.strip_prefix('[') {
                let close = r.find(']')?;
                ty = TypeRef::Array(Box::new(ty));
                rest = &r[close + 1..];
            } else {
                break;
            }
        }
        Some(ty)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named { name, args } if args.is_empty() => f.write_str(name),
            TypeRef::Named { name, args } => {
                let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "{}<{}>", name, args.join(", "))
            }
            TypeRef::Array(element) => write!(f, "{}[]", element),
            TypeRef::Nullable(inner) => write!(f, "{}?", inner),
        }
    }
}

/// A compile-time constant value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constant {
    Bool(bool),
    Int(i64),
}

/// Evaluate simple constant expressions.
pub(crate) fn constant(tree: &Tree, node: NodeId) -> Option<Constant> {
    match tree.kind(node) {
        NodeKind::TrueLiteral => Some(Constant::Bool(true)),
        NodeKind::FalseLiteral => Some(Constant::Bool(false)),
        NodeKind::NumericLiteral => parse_integer(tree.text(node)).map(Constant::Int),
        NodeKind::ParenthesizedExpression => constant(tree, tree.child(node, 0)?),
        NodeKind::PrefixUnaryExpression => {
            let op = tree.text(tree.child(node, 0)?);
            match (op, constant(tree, tree.child(node, 1)?)?) {
                ("!", Constant::Bool(b)) => Some(Constant::Bool(!b)),
                ("-", Constant::Int(i)) => i.checked_neg().map(Constant::Int),
                ("+", c @ Constant::Int(_)) => Some(c),
                _ => None,
            }
        }
        _ => None,
    }
}

fn parse_integer(literal: &str) -> Option<i64> {
    let cleaned: String = literal.chars().filter(|c| *c != '_').collect();
    let lower = cleaned.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        let digits = hex.trim_end_matches(['u', 'l']);
        return i64::from_str_radix(digits, 16).ok();
    }
    if lower.contains('.') || lower.contains('e') || lower.ends_with(['f', 'd', 'm']) {
        return None;
    }
    lower.trim_end_matches(['u', 'l']).parse().ok()
}

fn numeric_literal_type(literal: &str) -> TypeRef {
    let lower = literal.to_ascii_lowercase();
    let is_hex = lower.starts_with("0x");
    let name = if !is_hex && lower.ends_with('f') {
        "float"
    } else if !is_hex && lower.ends_with('m') {
        "decimal"
    } else if !is_hex && (lower.ends_with('d') || lower.contains('.') || lower.contains('e')) {
        "double"
    } else if lower.ends_with("ul") || lower.ends_with("lu") {
        "ulong"
    } else if lower.ends_with('l') {
        "long"
    } else if lower.ends_with('u') {
        "uint"
    } else {
        "int"
    };
    TypeRef::named(name)
}

/// Infer the static type of an expression from the bindings built so far.
pub(crate) fn infer(tree: &Tree, table: &BindingTable, node: NodeId) -> Option<TypeRef> {
    use NodeKind::*;

    match tree.kind(node) {
        TrueLiteral | FalseLiteral => Some(TypeRef::bool()),
        NumericLiteral => Some(numeric_literal_type(tree.text(node))),
        StringLiteral => Some(TypeRef::named("string")),
        CharacterLiteral => Some(TypeRef::named("char")),
        TypeOfExpression => Some(TypeRef::named("Type")),
        ParenthesizedExpression => infer(tree, table, tree.child(node, 0)?),
        AssignmentExpression => infer(tree, table, tree.child(node, 0)?),
        IdentifierName => {
            let symbol = table.referenced.get(&node)?;
            match symbol.kind {
                SymbolKind::Type | SymbolKind::Method | SymbolKind::LocalFunction => None,
                _ => symbol.ty.clone(),
            }
        }
        MemberAccessExpression | ConditionalAccessExpression => {
            let symbol = table.referenced.get(&tree.child(node, 1)?)?;
            match symbol.kind {
                SymbolKind::Field | SymbolKind::Property => symbol.ty.clone(),
                _ => None,
            }
        }
        InvocationExpression => infer_invocation(tree, table, node),
        ElementAccessExpression => {
            let receiver = infer(tree, table, tree.child(node, 0)?)?;
            match receiver {
                TypeRef::Array(element) => Some(*element),
                TypeRef::Named { ref name, ref args } if name == "List" || name == "IList" => {
                    args.first().cloned()
                }
                _ => None,
            }
        }
        ThisExpression => {
            let ty = tree.ancestor_of_kind(node, TypeDeclaration)?;
            let name = tree.child_of_kind(ty, IdentifierToken)?;
            Some(TypeRef::named(tree.text(name)))
        }
        ObjectCreationExpression | ArrayCreationExpression => {
            let syntax = tree.child_of_kind(node, TypeSyntax)?;
            let ty = TypeRef::from_syntax(tree, syntax)?;
            if tree.kind(node) == ArrayCreationExpression
                && tree.child_of_kind(node, BracketedArgumentList).is_some()
            {
                return Some(TypeRef::Array(Box::new(ty)));
            }
            Some(ty)
        }
        PrefixUnaryExpression => {
            let op = tree.text(tree.child(node, 0)?);
            let operand = infer(tree, table, tree.child(node, 1)?)?;
            match op {
                "!" if operand.is_bool() => Some(operand),
                "-" | "+" | "~" | "++" | "--" if operand.is_numeric() => Some(operand),
                _ => None,
            }
        }
        PostfixUnaryExpression => infer(tree, table, tree.child(node, 0)?),
        BinaryExpression => infer_binary(tree, table, node),
        ConditionalExpression => {
            let a = infer(tree, table, tree.child(node, 1)?)?;
            let b = infer(tree, table, tree.child(node, 2)?)?;
            (a == b).then_some(a)
        }
        _ => None,
    }
}

fn infer_binary(tree: &Tree, table: &BindingTable, node: NodeId) -> Option<TypeRef> {
    let op = tree.text(tree.child(node, 1)?);
    match op {
        "==" | "!=" | "<" | ">" | "<=" | ">=" | "&&" | "||" => Some(TypeRef::bool()),
        "??" => match infer(tree, table, tree.child(node, 0)?)? {
            TypeRef::Nullable(inner) => Some(*inner),
            other => Some(other),
        },
        _ => {
            let lhs = infer(tree, table, tree.child(node, 0)?)?;
            let rhs = infer(tree, table, tree.child(node, 2)?)?;
            if op == "+" && (lhs.name() == Some("string") || rhs.name() == Some("string")) {
                return Some(TypeRef::named("string"));
            }
            if lhs == rhs && (lhs.is_numeric() || (lhs.is_bool() && matches!(op, "&" | "|" | "^")))
            {
                return Some(lhs);
            }
            None
        }
    }
}

fn infer_invocation(tree: &Tree, table: &BindingTable, node: NodeId) -> Option<TypeRef> {
    let callee = tree.child(node, 0)?;
    let name_node = match tree.kind(callee) {
        NodeKind::IdentifierName => callee,
        NodeKind::MemberAccessExpression | NodeKind::ConditionalAccessExpression => {
            tree.child(callee, 1)?
        }
        _ => return None,
    };
    let symbol = table.referenced.get(&name_node)?;

    if symbol.is_library() {
        let receiver = infer(tree, table, tree.child(callee, 0)?)?;
        let element = receiver.element_type()?;
        let result = library::enumerable_method(&symbol.name)?;
        return library::result_type(result, element);
    }

    match symbol.kind {
        SymbolKind::Method | SymbolKind::LocalFunction => symbol.ty.clone(),
        _ => None,
    }
}
