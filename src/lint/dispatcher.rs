//! Rule dispatcher.
//!
//! Walks a tree once in pre-order and hands every node to the rules
//! registered for its kind. Top-level members can optionally be checked in
//! parallel; results are merged back in source order.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use super::diagnostic::{Diagnostic, DiagnosticSink};
use super::registry::RuleRegistry;
use super::rule::{RuleContext, RuleId};
use crate::error::{Error, Result};
use crate::syntax::{NodeId, NodeKind};

/// Shared flag for cooperative cancellation.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Every clone observes it.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// `Err(Error::Cancelled)` once cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Nodes that only group members; their children become parallel shards.
fn is_container(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::CompilationUnit | NodeKind::NamespaceDeclaration | NodeKind::TypeDeclaration
    )
}

/// Runs the rules of a registry over a tree.
pub struct Dispatcher<'r> {
    registry: &'r RuleRegistry,
    parallel: bool,
    only: Option<HashSet<RuleId>>,
}

impl<'r> Dispatcher<'r> {
    pub fn new(registry: &'r RuleRegistry) -> Self {
        Self {
            registry,
            parallel: false,
            only: None,
        }
    }

    /// Check top-level members on the rayon thread pool.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Restrict dispatch to the given rules.
    pub fn only(mut self, rules: impl IntoIterator<Item = RuleId>) -> Self {
        let rules: HashSet<_> = rules.into_iter().collect();
        self.only = (!rules.is_empty()).then_some(rules);
        self
    }

    /// Which registered rules run under `ctx`'s configuration.
    ///
    /// Rules configured with severity `none` never run.
    fn enabled(&self, ctx: &RuleContext<'_>) -> Vec<bool> {
        self.registry
            .iter()
            .map(|rule| {
                let id = rule.id();
                let selected = self.only.as_ref().map_or(true, |only| only.contains(&id));
                selected
                    && ctx
                        .config
                        .severity_for(&id, rule.default_severity())
                        .is_some()
            })
            .collect()
    }

    /// Run every enabled rule over the tree and return raw diagnostics in
    /// traversal order.
    pub fn run(&self, ctx: &RuleContext<'_>, cancel: &CancellationToken) -> Result<Vec<Diagnostic>> {
        let enabled = self.enabled(ctx);
        let active = enabled.iter().filter(|e| **e).count();
        let root = ctx.tree().root();

        let diagnostics = if active == 0 {
            Vec::new()
        } else if self.parallel {
            let mut shards = Vec::new();
            let mut out = self.walk(ctx, root, &enabled, cancel, Some(&mut shards))?;
            tracing::trace!(shards = shards.len(), "dispatching shards in parallel");
            let results = shards
                .par_iter()
                .map(|&shard| self.walk(ctx, shard, &enabled, cancel, None))
                .collect::<Result<Vec<_>>>()?;
            out.extend(results.into_iter().flatten());
            out
        } else {
            self.walk(ctx, root, &enabled, cancel, None)?
        };

        tracing::debug!(
            rules = active,
            diagnostics = diagnostics.len(),
            generation = ctx.model.generation(),
            "dispatch complete"
        );
        Ok(diagnostics)
    }

    /// Pre-order walk from `root`.
    ///
    /// With `shards`, the walk stays on container nodes and collects their
    /// member children for the caller instead of descending into them.
    fn walk(
        &self,
        ctx: &RuleContext<'_>,
        root: NodeId,
        enabled: &[bool],
        cancel: &CancellationToken,
        mut shards: Option<&mut Vec<NodeId>>,
    ) -> Result<Vec<Diagnostic>> {
        let tree = ctx.tree();
        let mut out = Vec::new();
        let mut nodes = tree.descendants(root);

        while let Some(node) = nodes.next() {
            cancel.check()?;

            let kind = tree.kind(node);
            let mut skip = false;
            for &index in self.registry.rules_for(kind) {
                if !enabled[index] {
                    continue;
                }
                let mut sink = DiagnosticSink::new();
                self.registry.rule(index).check(ctx, node, &mut sink);
                skip |= sink.skips_descendants();
                out.extend(sink.into_diagnostics());
            }

            if skip {
                nodes.skip_children(node);
                continue;
            }
            if let Some(shards) = shards.as_deref_mut() {
                if is_container(kind) {
                    let members = tree.children(node);
                    shards.extend(members.iter().filter(|m| !is_container(tree.kind(**m))));
                    nodes.skip_children(node);
                    for &member in members {
                        if is_container(tree.kind(member)) {
                            // containers stay on this thread
                            let nested =
                                self.walk(ctx, member, enabled, cancel, Some(&mut *shards))?;
                            out.extend(nested);
                        }
                    }
                }
            }
        }
        Ok(out)
    }
}
