//! Diagnostic output formatters.
//!
//! This module provides formatters for outputting diagnostics in different
//! formats (human-readable, JSON). Formatters work on [`FileDiagnostics`],
//! which pair a file's finalized diagnostics with the line index needed to
//! turn byte spans into line and column numbers.

pub mod human;
pub mod json;

use std::io::Write;
use std::path::Path;

use crate::lint::Diagnostic;
use crate::syntax::{LineIndex, Position};

/// Output format for check results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

/// The diagnostics of one analyzed file.
#[derive(Debug, Clone, Copy)]
pub struct FileDiagnostics<'a> {
    pub path: &'a Path,
    pub lines: &'a LineIndex,
    pub diagnostics: &'a [Diagnostic],
}

impl<'a> FileDiagnostics<'a> {
    pub fn new(path: &'a Path, lines: &'a LineIndex, diagnostics: &'a [Diagnostic]) -> Self {
        Self {
            path,
            lines,
            diagnostics,
        }
    }

    /// 1-based position of a diagnostic's start.
    pub fn position(&self, diagnostic: &Diagnostic) -> Position {
        self.lines.position(diagnostic.span.start)
    }
}

/// Trait for formatting check output.
pub trait LintFormatter {
    /// Format diagnostics to the given writer.
    fn format<W: Write>(&self, files: &[FileDiagnostics<'_>], writer: &mut W) -> std::io::Result<()>;
}

pub use human::HumanFormatter;
pub use json::JsonFormatter;
