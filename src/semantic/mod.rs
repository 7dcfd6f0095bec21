//! Semantic resolver.
//!
//! A [`SemanticModel`] answers symbol, type and control-flow questions
//! about one [`Tree`] instance. Nothing is computed up front: the binding
//! table is built on first use and every other answer is memoized, so rules
//! that never ask semantic questions never pay for them. A model is tied to
//! the tree generation it was created for; edits produce a new tree and
//! therefore need a new model.
//!
//! Anything the resolver cannot determine is `None`. Unbound names and
//! `dynamic` expressions never have a symbol or type, and rules treat that
//! as "do not report".

mod flow;
pub mod library;
mod symbols;
mod types;

pub use flow::{ExitKind, ExitPoint};
pub use symbols::{Symbol, SymbolKind};
pub use types::{Constant, TypeRef};

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, OnceLock, RwLock};

use crate::syntax::{NodeId, NodeKind, Tree};
use symbols::BindingTable;

/// Lazily computed semantic facts about one tree.
#[derive(Debug)]
pub struct SemanticModel {
    tree: Tree,
    bindings: OnceLock<BindingTable>,
    types: RwLock<HashMap<NodeId, Option<TypeRef>>>,
    reachable: RwLock<HashMap<NodeId, bool>>,
    end_reachable: RwLock<HashMap<NodeId, bool>>,
}

impl SemanticModel {
    /// Create a model for `tree`.
    pub fn new(tree: Tree) -> Self {
        Self {
            tree,
            bindings: OnceLock::new(),
            types: RwLock::default(),
            reachable: RwLock::default(),
            end_reachable: RwLock::default(),
        }
    }

    /// The tree this model describes.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Generation of the tree this model is bound to.
    pub fn generation(&self) -> u64 {
        self.tree.generation()
    }

    fn bindings(&self) -> &BindingTable {
        self.bindings.get_or_init(|| symbols::bind(&self.tree))
    }

    /// Symbol a node refers to or declares.
    ///
    /// Accepts identifier references, member accesses, invocations (the
    /// invoked member), declaration nodes and their name tokens.
    pub fn resolve_symbol(&self, node: NodeId) -> Option<Arc<Symbol>> {
        let tree = &self.tree;
        let bindings = self.bindings();
        match tree.kind(node) {
            NodeKind::IdentifierName => bindings.referenced.get(&node).cloned(),
            NodeKind::MemberAccessExpression | NodeKind::ConditionalAccessExpression => {
                bindings.referenced.get(&tree.child(node, 1)?).cloned()
            }
            NodeKind::InvocationExpression => self.resolve_symbol(tree.child(node, 0)?),
            NodeKind::ParenthesizedExpression => self.resolve_symbol(tree.child(node, 0)?),
            NodeKind::IdentifierToken => {
                let owner = tree.parent(node)?;
                bindings
                    .declared
                    .get(&owner)
                    .or_else(|| bindings.declared.get(&node))
                    .cloned()
            }
            _ => bindings.declared.get(&node).cloned(),
        }
    }

    /// Static type of an expression.
    pub fn type_of(&self, expression: NodeId) -> Option<TypeRef> {
        if let Some(cached) = read(&self.types).get(&expression) {
            return cached.clone();
        }
        let ty = types::infer(&self.tree, self.bindings(), expression);
        write(&self.types).insert(expression, ty.clone());
        ty
    }

    /// Compile-time constant value of an expression.
    pub fn constant_value(&self, expression: NodeId) -> Option<Constant> {
        types::constant(&self.tree, expression)
    }

    fn memo_get<K: Eq + Hash, V: Copy>(&self, memo: &RwLock<HashMap<K, V>>, key: K) -> Option<V> {
        read(memo).get(&key).copied()
    }

    fn memo_put<K: Eq + Hash, V>(&self, memo: &RwLock<HashMap<K, V>>, key: K, value: V) {
        write(memo).insert(key, value);
    }
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;

    fn model(source: &str) -> SemanticModel {
        SemanticModel::new(parse(source).unwrap())
    }

    fn find(model: &SemanticModel, kind: NodeKind, text: &str) -> NodeId {
        let tree = model.tree();
        tree.descendants(tree.root())
            .find(|n| tree.kind(*n) == kind && tree.text(*n) == text)
            .unwrap_or_else(|| panic!("no {} `{}`", kind, text))
    }

    #[test]
    fn model_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SemanticModel>();
    }

    #[test]
    fn parameters_resolve_to_shared_symbol() {
        let model = model("class C { bool M(bool value) { return value && value; } }");
        let tree = model.tree();
        let refs: Vec<_> = tree
            .descendants(tree.root())
            .filter(|n| tree.kind(*n) == NodeKind::IdentifierName)
            .collect();
        assert_eq!(refs.len(), 2);
        let a = model.resolve_symbol(refs[0]).unwrap();
        let b = model.resolve_symbol(refs[1]).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.kind, SymbolKind::Parameter);
        assert_eq!(model.type_of(refs[0]), Some(TypeRef::bool()));
    }

    #[test]
    fn unbound_identifiers_have_no_symbol() {
        let model = model("class C { void M() { missing.Call(); } }");
        let missing = find(&model, NodeKind::IdentifierName, "missing");
        assert!(model.resolve_symbol(missing).is_none());
        assert!(model.type_of(missing).is_none());
    }

    #[test]
    fn dynamic_expressions_never_resolve() {
        let model = model(
            "class C { void M(dynamic d) { var r = d.Where(x => x == 0).Any(); var b = d == true; } }",
        );
        let call = find(&model, NodeKind::InvocationExpression, "d.Where(x => x == 0).Any()");
        assert!(model.resolve_symbol(call).is_none());
        assert!(model.type_of(call).is_none());
        let d = find(&model, NodeKind::IdentifierName, "d");
        assert!(model.type_of(d).is_none());
    }

    #[test]
    fn linq_methods_resolve_through_chains() {
        let model = model(
            "using System.Linq; class C { bool M(List<int> items) => items.Where(x => x > 0).Any(); }",
        );
        let any = find(
            &model,
            NodeKind::InvocationExpression,
            "items.Where(x => x > 0).Any()",
        );
        let symbol = model.resolve_symbol(any).unwrap();
        assert!(symbol.is_enumerable_method("Any"));
        assert_eq!(model.type_of(any), Some(TypeRef::bool()));

        let lambda_param = find(&model, NodeKind::IdentifierName, "x");
        assert_eq!(model.type_of(lambda_param), Some(TypeRef::int()));
    }

    #[test]
    fn var_locals_take_initializer_type() {
        let model = model(
            "class C { void M() { var list = new List<string>(); var n = list.Count; var first = list.First(); } }",
        );
        let n = find(&model, NodeKind::MemberAccessExpression, "list.Count");
        assert_eq!(model.type_of(n), Some(TypeRef::int()));
        let first = find(&model, NodeKind::InvocationExpression, "list.First()");
        assert_eq!(model.type_of(first), Some(TypeRef::named("string")));
    }

    #[test]
    fn members_resolve_before_declaration() {
        let model = model("class C { bool M() => flag == true; bool flag; }");
        let flag = find(&model, NodeKind::IdentifierName, "flag");
        let symbol = model.resolve_symbol(flag).unwrap();
        assert_eq!(symbol.kind, SymbolKind::Field);
        assert_eq!(symbol.ty, Some(TypeRef::bool()));
    }

    #[test]
    fn this_member_access_resolves_fields() {
        let model = model("class C { int count; int M() => this.count + 1; }");
        let access = find(&model, NodeKind::MemberAccessExpression, "this.count");
        assert_eq!(model.type_of(access), Some(TypeRef::int()));
    }

    #[test]
    fn constants_fold_through_parentheses_and_negation() {
        let model = model("class C { int M() => -(1); bool N() => !(true); }");
        let negative = find(&model, NodeKind::PrefixUnaryExpression, "-(1)");
        assert_eq!(model.constant_value(negative), Some(Constant::Int(-1)));
        let not = find(&model, NodeKind::PrefixUnaryExpression, "!(true)");
        assert_eq!(model.constant_value(not), Some(Constant::Bool(false)));
    }

    #[test]
    fn models_are_bound_to_one_generation() {
        let tree = parse("class C { int x; }").unwrap();
        let edited = tree
            .with_replacement(crate::syntax::TextSpan::new(14, 15), "y")
            .unwrap();
        let before = SemanticModel::new(tree);
        let after = SemanticModel::new(edited);
        assert_ne!(before.generation(), after.generation());
    }
}
