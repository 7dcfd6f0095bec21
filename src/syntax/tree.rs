//! Immutable arena-indexed syntax trees.
//!
//! A [`Tree`] owns the source text and a flat arena of nodes. Nodes refer to
//! their children and parent by [`NodeId`], so parent links are plain
//! lookup indices and never own anything. Trees are never mutated: the only
//! way to change one is [`Tree::with_replacement`], which yields a new tree
//! with a fresh generation number.
//!
//! Each arena slot is reference counted. An edit re-parses the smallest
//! statement or member around it and copies only the nodes whose data
//! changed; everything else is shared with the previous tree.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::kind::NodeKind;
use super::span::{LineIndex, TextSpan};
use crate::error::{Error, Result};

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Tallest tree accepted; anything deeper is reported as a syntax error.
pub const MAX_DEPTH: usize = 512;

/// Index of a node inside its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Arena index of this node.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    span: TextSpan,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Frontend that turns source text into a tree.
///
/// The engine is grammar-agnostic; every tree remembers the parser that
/// produced it so edits can be re-parsed the same way.
pub trait SourceParser: Send + Sync + fmt::Debug {
    /// Short name of the language, used in logs.
    fn language(&self) -> &str;

    /// Build the nodes for `text` and return the root.
    fn build(&self, text: &str, builder: &mut TreeBuilder) -> Result<NodeId>;

    /// Build the nodes for `text` as one node of `kind`, with spans relative
    /// to `text`.
    ///
    /// `None` means the frontend cannot parse `kind` on its own; edits inside
    /// such nodes re-parse the whole source.
    fn build_fragment(
        &self,
        _kind: NodeKind,
        _text: &str,
        _builder: &mut TreeBuilder,
    ) -> Option<Result<NodeId>> {
        None
    }
}

/// Collects nodes bottom-up while a parser runs.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<NodeData>,
}

impl TreeBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node whose children were already added.
    pub fn node(&mut self, kind: NodeKind, span: TextSpan, children: Vec<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            kind,
            span,
            parent: None,
            children,
        });
        id
    }

    /// Add a leaf node.
    pub fn leaf(&mut self, kind: NodeKind, span: TextSpan) -> NodeId {
        self.node(kind, span, Vec::new())
    }

    /// Span of a node added earlier.
    pub fn span(&self, id: NodeId) -> TextSpan {
        self.nodes[id.index()].span
    }

    /// Kind of a node added earlier.
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id.index()].kind
    }
}

/// An immutable syntax tree over one source unit.
#[derive(Clone)]
pub struct Tree {
    source: Arc<str>,
    nodes: Arc<[Arc<NodeData>]>,
    live: usize,
    root: NodeId,
    generation: u64,
    lines: Arc<LineIndex>,
    parser: Arc<dyn SourceParser>,
}

impl Tree {
    /// Parse `text` with `parser`.
    ///
    /// Fails with [`Error::Syntax`] only when the text cannot be structured;
    /// semantically wrong code still produces a tree.
    pub fn parse(parser: &Arc<dyn SourceParser>, text: impl Into<Arc<str>>) -> Result<Tree> {
        let source: Arc<str> = text.into();
        let mut builder = TreeBuilder::new();
        let root = parser.build(&source, &mut builder)?;
        let mut nodes = builder.nodes;
        check_height(&nodes, MAX_DEPTH, 0)?;

        for index in 0..nodes.len() {
            let children = std::mem::take(&mut nodes[index].children);
            for child in &children {
                nodes[child.index()].parent = Some(NodeId(index as u32));
            }
            nodes[index].children = children;
        }

        let generation = NEXT_GENERATION.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(
            language = parser.language(),
            nodes = nodes.len(),
            generation,
            "parsed tree"
        );

        Ok(Tree {
            lines: Arc::new(LineIndex::new(&source)),
            source,
            live: nodes.len(),
            nodes: nodes.into_iter().map(Arc::new).collect(),
            root,
            generation,
            parser: Arc::clone(parser),
        })
    }

    /// Root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Full source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Unique number of this tree instance. Edits always yield a new one.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Line/column mapping for the source.
    pub fn line_index(&self) -> &LineIndex {
        &self.lines
    }

    /// Parser that produced the tree.
    pub fn parser(&self) -> &Arc<dyn SourceParser> {
        &self.parser
    }

    /// Number of nodes reachable from the root.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Kind of a node.
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id.index()].kind
    }

    /// Span of a node.
    pub fn span(&self, id: NodeId) -> TextSpan {
        self.nodes[id.index()].span
    }

    /// Source text of a node.
    pub fn text(&self, id: NodeId) -> &str {
        let span = self.span(id);
        &self.source[span.start..span.end]
    }

    /// Source text of a span.
    pub fn text_at(&self, span: TextSpan) -> &str {
        &self.source[span.start..span.end]
    }

    /// Ordered children of a node.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    /// The `n`th child, if present.
    pub fn child(&self, id: NodeId, n: usize) -> Option<NodeId> {
        self.children(id).get(n).copied()
    }

    /// First child of the given kind.
    pub fn child_of_kind(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|c| self.kind(*c) == kind)
    }

    /// Parent of a node (`None` for the root).
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |n| self.parent(*n))
    }

    /// Nearest ancestor of the given kind.
    pub fn ancestor_of_kind(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.ancestors(id).find(|a| self.kind(*a) == kind)
    }

    /// The node and all its descendants, in pre-order.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            stack: vec![id],
        }
    }

    /// Deepest node whose span contains `span`.
    ///
    /// Children of a node are ordered and disjoint, so each level is a binary
    /// search over child start offsets.
    pub fn covering_node(&self, span: TextSpan) -> NodeId {
        let mut current = self.root;
        loop {
            let children = self.children(current);
            let idx = children.partition_point(|c| self.span(*c).start <= span.start);
            let next = idx
                .checked_sub(1)
                .map(|i| children[i])
                .filter(|c| self.span(*c).contains_span(span));
            match next {
                Some(child) => current = child,
                None => return current,
            }
        }
    }

    /// Node with exactly this span and kind, if any.
    pub fn find_node(&self, span: TextSpan, kind: NodeKind) -> Option<NodeId> {
        let covering = self.covering_node(span);
        std::iter::once(covering)
            .chain(self.ancestors(covering))
            .take_while(|n| self.span(*n) == span)
            .find(|n| self.kind(*n) == kind)
    }

    /// Produce a new tree with `span` replaced by `text`.
    pub fn with_replacement(&self, span: TextSpan, text: &str) -> Result<Tree> {
        self.with_replacements(&[(span, text)])
    }

    /// Produce a new tree with several disjoint replacements applied at once.
    ///
    /// Spans are relative to this tree's source. When the parser can re-parse
    /// the statement or member strictly enclosing every edit on its own, only
    /// that node is rebuilt; otherwise the whole text is parsed again.
    pub fn with_replacements(&self, edits: &[(TextSpan, &str)]) -> Result<Tree> {
        let mut ordered: Vec<_> = edits.to_vec();
        ordered.sort_by(|a, b| b.0.start.cmp(&a.0.start).then(b.0.end.cmp(&a.0.end)));

        for pair in ordered.windows(2) {
            if pair[0].0.overlaps(pair[1].0) {
                return Err(Error::Other(anyhow::anyhow!(
                    "overlapping replacements {} and {}",
                    pair[1].0,
                    pair[0].0
                )));
            }
        }

        let mut text = self.source.to_string();
        for (span, replacement) in &ordered {
            if span.end > text.len()
                || !text.is_char_boundary(span.start)
                || !text.is_char_boundary(span.end)
            {
                return Err(Error::Other(anyhow::anyhow!(
                    "replacement span {} is outside the source",
                    span
                )));
            }
            text.replace_range(span.start..span.end, replacement);
        }

        if let (Some(last), Some(first)) = (ordered.first(), ordered.last()) {
            let region = TextSpan::new(first.0.start, last.0.end);
            let delta = text.len() as isize - self.source.len() as isize;
            if let Some(tree) = self.reparse_around(region, delta, &text) {
                return Ok(tree);
            }
        }
        Tree::parse(&self.parser, text)
    }

    /// Re-parse the innermost fragment-capable node strictly enclosing
    /// `region` and splice it into a copy of this tree.
    fn reparse_around(&self, region: TextSpan, delta: isize, text: &str) -> Option<Tree> {
        let covering = self.covering_node(region);
        for node in std::iter::once(covering).chain(self.ancestors(covering)) {
            let span = self.span(node);
            if span.start >= region.start || span.end <= region.end {
                continue;
            }
            let end = span.end.checked_add_signed(delta)?;
            let mut builder = TreeBuilder::new();
            match self
                .parser
                .build_fragment(self.kind(node), &text[span.start..end], &mut builder)
            {
                None => continue,
                Some(Ok(root)) => return self.splice(node, builder.nodes, root, delta, text),
                Some(Err(e)) => {
                    tracing::trace!(
                        kind = self.kind(node).name(),
                        error = %e,
                        "fragment re-parse failed"
                    );
                    return None;
                }
            }
        }
        None
    }

    /// Replace the subtree at `target` with `fragment`, whose spans start at
    /// the target's start offset.
    fn splice(
        &self,
        target: NodeId,
        fragment: Vec<NodeData>,
        fragment_root: NodeId,
        delta: isize,
        text: &str,
    ) -> Option<Tree> {
        if fragment[fragment_root.index()].kind != self.kind(target) {
            return None;
        }
        let ancestors: HashSet<NodeId> = self.ancestors(target).collect();
        let limit = MAX_DEPTH.saturating_sub(ancestors.len());
        check_height(&fragment, limit, self.span(target).start).ok()?;

        let mut order = Vec::with_capacity(fragment.len());
        let mut parents = vec![None; fragment.len()];
        let mut stack = vec![fragment_root];
        while let Some(local) = stack.pop() {
            order.push(local);
            for child in fragment[local.index()].children.iter().rev() {
                parents[child.index()] = Some(local);
                stack.push(*child);
            }
        }

        // The fragment root takes over the target's slot so the parent's
        // child list stays valid; the rest reuse freed slots, then grow.
        let replaced: Vec<NodeId> = self.descendants(target).collect();
        let mut free = replaced.iter().copied();
        let mut next = self.nodes.len();
        let mut ids = vec![target; fragment.len()];
        for local in &order {
            ids[local.index()] = free.next().unwrap_or_else(|| {
                next += 1;
                NodeId((next - 1) as u32)
            });
        }

        let base = self.span(target).start;
        let mut nodes: Vec<Arc<NodeData>> = self.nodes.to_vec();
        for local in &order {
            let data = &fragment[local.index()];
            let node = Arc::new(NodeData {
                kind: data.kind,
                span: TextSpan::new(data.span.start + base, data.span.end + base),
                parent: match parents[local.index()] {
                    Some(parent) => Some(ids[parent.index()]),
                    None => self.parent(target),
                },
                children: data.children.iter().map(|c| ids[c.index()]).collect(),
            });
            let id = ids[local.index()].index();
            if id < nodes.len() {
                nodes[id] = node;
            } else {
                nodes.push(node);
            }
        }

        let old = self.span(target);
        let shift = |offset: usize| offset.checked_add_signed(delta);
        let mut walk = self.descendants(self.root);
        while let Some(id) = walk.next() {
            if id == target {
                walk.skip_children(id);
                continue;
            }
            let span = self.span(id);
            let moved = if ancestors.contains(&id) {
                TextSpan::new(span.start, shift(span.end)?)
            } else if span.start >= old.end {
                TextSpan::new(shift(span.start)?, shift(span.end)?)
            } else {
                continue;
            };
            let mut data = NodeData::clone(&self.nodes[id.index()]);
            data.span = moved;
            nodes[id.index()] = Arc::new(data);
        }

        let generation = NEXT_GENERATION.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(
            kind = self.kind(target).name(),
            rebuilt = order.len(),
            generation,
            "re-parsed fragment"
        );

        let source: Arc<str> = text.into();
        Some(Tree {
            lines: Arc::new(LineIndex::new(&source)),
            source,
            live: self.live - replaced.len() + order.len(),
            nodes: nodes.into(),
            root: self.root,
            generation,
            parser: Arc::clone(&self.parser),
        })
    }
}

/// Fail when any node of a bottom-up built arena is taller than `limit`.
fn check_height(nodes: &[NodeData], limit: usize, base: usize) -> Result<()> {
    let mut heights = vec![0usize; nodes.len()];
    for (index, node) in nodes.iter().enumerate() {
        let height = 1 + node
            .children
            .iter()
            .map(|c| heights.get(c.index()).copied().unwrap_or(0))
            .max()
            .unwrap_or(0);
        if height > limit {
            return Err(Error::syntax(
                base + node.span.start,
                format!("nesting exceeds {} levels", MAX_DEPTH),
            ));
        }
        heights[index] = height;
    }
    Ok(())
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("generation", &self.generation)
            .field("nodes", &self.live)
            .field("language", &self.parser.language())
            .finish()
    }
}

/// Pre-order iterator over a subtree.
pub struct Descendants<'a> {
    tree: &'a Tree,
    stack: Vec<NodeId>,
}

impl Descendants<'_> {
    /// Do not descend into the children of the node returned last.
    pub fn skip_children(&mut self, of: NodeId) {
        let count = self.tree.children(of).len();
        let keep = self.stack.len().saturating_sub(count);
        self.stack.truncate(keep);
    }
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let node = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(node).iter().rev().copied());
        Some(node)
    }
}
