//! Text edits.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::syntax::TextSpan;

/// Replacement of one span of the original text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TextEdit {
    pub span: TextSpan,
    pub replacement: String,
}

impl TextEdit {
    pub fn replace(span: TextSpan, replacement: impl Into<String>) -> Self {
        Self {
            span,
            replacement: replacement.into(),
        }
    }

    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self::replace(TextSpan::empty(offset), text)
    }

    pub fn delete(span: TextSpan) -> Self {
        Self::replace(span, String::new())
    }

    /// Whether both edits cannot be applied in the same pass.
    pub fn conflicts_with(&self, other: &TextEdit) -> bool {
        self.span.overlaps(other.span)
    }

    /// Whether applying the edit leaves `source` unchanged.
    pub fn is_noop(&self, source: &str) -> bool {
        source.get(self.span.start..self.span.end) == Some(self.replacement.as_str())
    }
}

/// Apply pairwise disjoint edits to `source`.
///
/// Edits are applied from the highest offset down so earlier spans stay
/// valid.
pub fn apply_edits(source: &str, edits: &[TextEdit]) -> Result<String> {
    let mut ordered: Vec<&TextEdit> = edits.iter().collect();
    ordered.sort_by(|a, b| {
        b.span
            .start
            .cmp(&a.span.start)
            .then(b.span.end.cmp(&a.span.end))
    });

    if let Some(pair) = ordered.windows(2).find(|w| w[0].conflicts_with(w[1])) {
        return Err(Error::Other(anyhow::anyhow!(
            "edits at {} and {} overlap",
            pair[1].span,
            pair[0].span
        )));
    }

    let mut text = source.to_string();
    for edit in ordered {
        let span = edit.span;
        if span.end > text.len() || !text.is_char_boundary(span.start) || !text.is_char_boundary(span.end) {
            return Err(Error::Other(anyhow::anyhow!(
                "edit span {} is outside the source",
                span
            )));
        }
        text.replace_range(span.start..span.end, &edit.replacement);
    }
    Ok(text)
}
