//! Error types for ruleforge operations.
//!
//! This module defines [`Error`], the error type used throughout the
//! engine, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Conditions a caller can act on per unit (unparsable source, a fix
//!   that cannot be computed) get a dedicated variant
//! - "Insufficient information" is never an error: the semantic model
//!   answers with `None` and rules abstain
//! - Overrunning the fix iteration cap is an engine bug and is fatal
//! - Use `anyhow::Error` (via `Error::Other`) for unexpected errors

use std::path::PathBuf;
use thiserror::Error;

use crate::lint::RuleId;

/// Core error type for ruleforge operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Source text could not be tokenized or structured.
    #[error("Syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    /// A diagnostic exists but no safe rewrite could be computed.
    #[error("Diagnostic {rule_id} is not fixable: {reason}")]
    NotFixable { rule_id: RuleId, reason: String },

    /// A computed fix produced text that no longer parses.
    #[error("Fix for {rule_id} produced invalid source: {message}")]
    InvalidFix { rule_id: RuleId, message: String },

    /// The batch fixer did not converge within its pass budget.
    #[error("Batch fix did not converge after {passes} passes")]
    IterationCapExceeded { passes: usize },

    /// Analysis was cancelled through a cancellation token.
    #[error("Analysis cancelled")]
    Cancelled,

    /// A configuration source could not be read or interpreted.
    #[error("Invalid configuration in {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create a syntax error at the given byte offset.
    pub fn syntax(offset: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            offset,
            message: message.into(),
        }
    }

    /// Create a "not fixable" error for the given rule.
    pub fn not_fixable(rule_id: RuleId, reason: impl Into<String>) -> Self {
        Self::NotFixable {
            rule_id,
            reason: reason.into(),
        }
    }

    /// Whether this error should abort the whole run rather than one unit.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::IterationCapExceeded { .. } | Self::Cancelled)
    }
}

/// Result type alias for ruleforge operations.
pub type Result<T> = std::result::Result<T, Error>;
