//! Tree model.
//!
//! Source text is parsed into an immutable, arena-indexed [`Tree`]. The
//! engine only depends on the [`SourceParser`] trait; [`CurlyParser`] is the
//! bundled reference frontend.

pub mod kind;
pub mod lexer;
pub mod parser;
pub mod span;
pub mod tree;

pub use kind::NodeKind;
pub use parser::CurlyParser;
pub use span::{LineIndex, Position, TextSpan};
pub use tree::{Descendants, NodeId, SourceParser, Tree, TreeBuilder};

use std::sync::Arc;

use crate::error::Result;

/// Shared handle to the reference frontend.
pub fn curly() -> Arc<dyn SourceParser> {
    Arc::new(CurlyParser::new())
}

/// Parse `text` with the reference frontend.
pub fn parse(text: &str) -> Result<Tree> {
    Tree::parse(&curly(), text)
}
