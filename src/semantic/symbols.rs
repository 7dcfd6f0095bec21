//! Symbols and the binder that attaches them to syntax.

use std::collections::HashMap;
use std::sync::Arc;

use super::library::{self, ENUMERABLE};
use super::types::{self, TypeRef};
use crate::syntax::{NodeId, NodeKind, Tree};

/// What a symbol stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Type,
    Method,
    Field,
    Property,
    Parameter,
    Local,
    LocalFunction,
}

/// A resolved semantic identity.
///
/// Every node referring to the same declaration shares one `Arc<Symbol>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// Declared type; the return type for methods. `None` when unknown,
    /// `void` or `dynamic`.
    pub ty: Option<TypeRef>,
    /// Declaring node, absent for library members.
    pub declaration: Option<NodeId>,
    /// Fully qualified container for library members.
    pub container: Option<String>,
}

impl Symbol {
    /// Whether the symbol comes from built-in library knowledge.
    pub fn is_library(&self) -> bool {
        self.container.is_some()
    }

    /// Whether this is the `System.Linq.Enumerable` method `name`.
    pub fn is_enumerable_method(&self, name: &str) -> bool {
        self.kind == SymbolKind::Method
            && self.name == name
            && self.container.as_deref() == Some(ENUMERABLE)
    }
}

/// Symbols declared by and referenced from nodes of one tree.
#[derive(Debug, Default)]
pub(crate) struct BindingTable {
    pub(crate) declared: HashMap<NodeId, Arc<Symbol>>,
    pub(crate) referenced: HashMap<NodeId, Arc<Symbol>>,
}

type Scope = HashMap<String, Arc<Symbol>>;

/// Bind every name in `tree`.
pub(crate) fn bind(tree: &Tree) -> BindingTable {
    let mut binder = Binder {
        tree,
        scopes: vec![Scope::new()],
        members: HashMap::new(),
        library: HashMap::new(),
        table: BindingTable::default(),
    };
    binder.collect_types();
    binder.walk(tree.root());
    tracing::trace!(
        declared = binder.table.declared.len(),
        referenced = binder.table.referenced.len(),
        "bound tree"
    );
    binder.table
}

struct Binder<'t> {
    tree: &'t Tree,
    scopes: Vec<Scope>,
    members: HashMap<String, Scope>,
    library: HashMap<String, Arc<Symbol>>,
    table: BindingTable,
}

impl<'t> Binder<'t> {
    fn symbol(
        &mut self,
        declaration: NodeId,
        name: &str,
        kind: SymbolKind,
        ty: Option<TypeRef>,
    ) -> Arc<Symbol> {
        let symbol = Arc::new(Symbol {
            name: name.to_string(),
            kind,
            ty,
            declaration: Some(declaration),
            container: None,
        });
        self.table.declared.insert(declaration, Arc::clone(&symbol));
        symbol
    }

    fn declared_type(&self, owner: NodeId) -> Option<TypeRef> {
        let syntax = self.tree.child_of_kind(owner, NodeKind::TypeSyntax)?;
        TypeRef::from_syntax(self.tree, syntax)
    }

    fn name_of(&self, owner: NodeId) -> Option<&'t str> {
        let tree = self.tree;
        tree.child_of_kind(owner, NodeKind::IdentifierToken)
            .map(|n| tree.text(n))
    }

    fn declare(&mut self, symbol: Arc<Symbol>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(symbol.name.clone(), symbol);
        }
    }

    fn lookup(&self, name: &str) -> Option<Arc<Symbol>> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .cloned()
    }

    /// Record every type declaration and its members up front so members
    /// can be used before they are declared.
    fn collect_types(&mut self) {
        let tree = self.tree;
        let types: Vec<NodeId> = tree
            .descendants(tree.root())
            .filter(|n| tree.kind(*n) == NodeKind::TypeDeclaration)
            .collect();

        for ty in types {
            let Some(type_name) = self.name_of(ty) else {
                continue;
            };
            let type_symbol = self.symbol(
                ty,
                type_name,
                SymbolKind::Type,
                Some(TypeRef::named(type_name)),
            );
            if let Some(root_scope) = self.scopes.first_mut() {
                root_scope.insert(type_name.to_string(), type_symbol);
            }

            let mut members = Scope::new();
            for &member in tree.children(ty) {
                match tree.kind(member) {
                    NodeKind::FieldDeclaration => {
                        let field_type = self.declared_type(member);
                        for &declarator in tree.children(member) {
                            if tree.kind(declarator) != NodeKind::VariableDeclarator {
                                continue;
                            }
                            if let Some(name) = self.name_of(declarator) {
                                let s = self.symbol(
                                    declarator,
                                    name,
                                    SymbolKind::Field,
                                    field_type.clone(),
                                );
                                members.insert(name.to_string(), s);
                            }
                        }
                    }
                    NodeKind::PropertyDeclaration | NodeKind::MethodDeclaration => {
                        let kind = if tree.kind(member) == NodeKind::MethodDeclaration {
                            SymbolKind::Method
                        } else {
                            SymbolKind::Property
                        };
                        if let Some(name) = self.name_of(member) {
                            let ty = self.declared_type(member);
                            let s = self.symbol(member, name, kind, ty);
                            members.insert(name.to_string(), s);
                        }
                    }
                    NodeKind::ParameterList => {
                        // record primary constructor parameters become properties
                        for &param in tree.children(member) {
                            if let Some(name) = self.name_of(param) {
                                let ty = self.declared_type(param);
                                let s = self.symbol(param, name, SymbolKind::Property, ty);
                                members.insert(name.to_string(), s);
                            }
                        }
                    }
                    _ => {}
                }
            }
            self.members.insert(type_name.to_string(), members);
        }
    }

    fn walk(&mut self, node: NodeId) {
        let tree = self.tree;
        match tree.kind(node) {
            NodeKind::TypeDeclaration => {
                let members = self
                    .name_of(node)
                    .and_then(|n| self.members.get(n))
                    .cloned()
                    .unwrap_or_default();
                self.scopes.push(members);
                for &child in tree.children(node) {
                    if tree.kind(child) != NodeKind::ParameterList {
                        self.walk(child);
                    }
                }
                self.scopes.pop();
            }
            NodeKind::MethodDeclaration
            | NodeKind::ConstructorDeclaration
            | NodeKind::LocalFunctionStatement
            | NodeKind::LambdaExpression => {
                self.scopes.push(Scope::new());
                let inferred = if tree.kind(node) == NodeKind::LambdaExpression {
                    self.lambda_parameter_type(node)
                } else {
                    None
                };
                for &child in tree.children(node) {
                    match tree.kind(child) {
                        NodeKind::ParameterList => self.declare_parameters(child, &inferred),
                        NodeKind::TypeSyntax | NodeKind::IdentifierToken => {}
                        _ => self.walk(child),
                    }
                }
                self.scopes.pop();
            }
            NodeKind::Block => {
                self.scopes.push(Scope::new());
                for &statement in tree.children(node) {
                    if tree.kind(statement) == NodeKind::LocalFunctionStatement {
                        if let Some(name) = self.name_of(statement) {
                            let ty = self.declared_type(statement);
                            let s = self.symbol(statement, name, SymbolKind::LocalFunction, ty);
                            self.declare(s);
                        }
                    }
                }
                for &statement in tree.children(node) {
                    self.walk(statement);
                }
                self.scopes.pop();
            }
            NodeKind::LocalDeclarationStatement => {
                let declared = self.declared_type(node);
                let is_var = tree
                    .child_of_kind(node, NodeKind::TypeSyntax)
                    .is_some_and(|t| tree.text(t) == "var");
                for &declarator in tree.children(node) {
                    if tree.kind(declarator) != NodeKind::VariableDeclarator {
                        continue;
                    }
                    let initializer = tree.child(declarator, 1);
                    if let Some(init) = initializer {
                        self.walk(init);
                    }
                    let ty = match (is_var, initializer) {
                        (true, Some(init)) => types::infer(tree, &self.table, init),
                        (true, None) => None,
                        (false, _) => declared.clone(),
                    };
                    if let Some(name) = self.name_of(declarator) {
                        let s = self.symbol(declarator, name, SymbolKind::Local, ty);
                        self.declare(s);
                    }
                }
            }
            NodeKind::ForEachStatement => {
                let children = tree.children(node);
                if let Some(&collection) = children.get(2) {
                    self.walk(collection);
                }
                self.scopes.push(Scope::new());
                if let (Some(&syntax), Some(&name)) = (children.first(), children.get(1)) {
                    let ty = if tree.text(syntax) == "var" {
                        children
                            .get(2)
                            .and_then(|c| types::infer(tree, &self.table, *c))
                            .and_then(|t| t.element_type())
                    } else {
                        TypeRef::from_syntax(tree, syntax)
                    };
                    let s = self.symbol(name, tree.text(name), SymbolKind::Local, ty);
                    self.declare(s);
                }
                for &child in children.iter().skip(3) {
                    self.walk(child);
                }
                self.scopes.pop();
            }
            NodeKind::MemberAccessExpression | NodeKind::ConditionalAccessExpression => {
                if let Some(receiver) = tree.child(node, 0) {
                    self.walk(receiver);
                }
                if let Some(name) = tree.child(node, 1) {
                    self.bind_member(node, name);
                }
            }
            NodeKind::IdentifierName => {
                if let Some(symbol) = self.lookup(tree.text(node)) {
                    self.table.referenced.insert(node, symbol);
                }
            }
            // labels live in their own namespace
            NodeKind::GotoStatement => {}
            _ => {
                for &child in tree.children(node) {
                    self.walk(child);
                }
            }
        }
    }

    fn declare_parameters(&mut self, list: NodeId, inferred: &Option<TypeRef>) {
        let tree = self.tree;
        let single = tree.children(list).len() == 1;
        for &param in tree.children(list) {
            let Some(name) = self.name_of(param) else {
                continue;
            };
            let ty = match tree.child_of_kind(param, NodeKind::TypeSyntax) {
                Some(syntax) => TypeRef::from_syntax(tree, syntax),
                None if single => inferred.clone(),
                None => None,
            };
            for &child in tree.children(param).iter().skip(2) {
                self.walk(child);
            }
            let s = self.symbol(param, name, SymbolKind::Parameter, ty);
            self.declare(s);
        }
    }

    /// Element type for the parameter of a lambda passed to a LINQ method.
    fn lambda_parameter_type(&self, lambda: NodeId) -> Option<TypeRef> {
        let tree = self.tree;
        let args = tree.parent(lambda)?;
        let invocation = tree.parent(args)?;
        if tree.kind(args) != NodeKind::ArgumentList
            || tree.kind(invocation) != NodeKind::InvocationExpression
        {
            return None;
        }
        let callee = tree.child(invocation, 0)?;
        if tree.kind(callee) != NodeKind::MemberAccessExpression {
            return None;
        }
        let method = tree.text(tree.child(callee, 1)?);
        library::enumerable_method(method)?;
        types::infer(tree, &self.table, tree.child(callee, 0)?)?.element_type()
    }

    fn bind_member(&mut self, access: NodeId, name_node: NodeId) {
        let tree = self.tree;
        let Some(receiver) = tree.child(access, 0) else {
            return;
        };
        let name = tree.text(name_node);
        let Some(receiver_type) = types::infer(tree, &self.table, receiver) else {
            return;
        };

        let user_member = receiver_type
            .name()
            .and_then(|n| self.members.get(n))
            .and_then(|m| m.get(name))
            .cloned();
        if let Some(symbol) = user_member {
            self.table.referenced.insert(name_node, symbol);
            return;
        }

        let is_call = tree
            .parent(access)
            .is_some_and(|p| tree.kind(p) == NodeKind::InvocationExpression);
        if is_call && receiver_type.is_sequence() && library::enumerable_method(name).is_some() {
            let symbol = self.library_member(name, SymbolKind::Method, ENUMERABLE, None);
            self.table.referenced.insert(name_node, symbol);
            return;
        }

        if let Some(ty) = receiver_type.size_property(name) {
            let container = receiver_type.to_string();
            let symbol = self.library_member(name, SymbolKind::Property, &container, Some(ty));
            self.table.referenced.insert(name_node, symbol);
        }
    }

    fn library_member(
        &mut self,
        name: &str,
        kind: SymbolKind,
        container: &str,
        ty: Option<TypeRef>,
    ) -> Arc<Symbol> {
        let key = format!("{}.{}", container, name);
        Arc::clone(self.library.entry(key).or_insert_with(|| {
            Arc::new(Symbol {
                name: name.to_string(),
                kind,
                ty,
                declaration: None,
                container: Some(container.to_string()),
            })
        }))
    }
}
