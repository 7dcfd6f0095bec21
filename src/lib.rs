//! ruleforge - Rule-driven source analysis with conflict-free batch fixes.
//!
//! ruleforge parses source text into an immutable tree, answers semantic
//! questions about it lazily, runs rules over it in a single traversal and
//! turns their diagnostics into verified text edits.
//!
//! # Modules
//!
//! - [`analyzer`] - Per-file pipeline and parallel analysis of many files
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Editorconfig-style option files and typed lookup
//! - [`error`] - Error types and result aliases
//! - [`fix`] - Code fixes, single and iterative batch application
//! - [`lint`] - Rules, dispatch, diagnostics and output formatting
//! - [`semantic`] - Symbols, types, constants and reachability
//! - [`syntax`] - Tree model and the reference frontend
//! - [`testing`] - Marked sources and assertions for rule tests
//! - [`ui`] - Terminal output
//!
//! # Example
//!
//! ```
//! use ruleforge::analyzer::Analyzer;
//! use ruleforge::config::AnalyzerConfig;
//! use ruleforge::lint::CancellationToken;
//!
//! let source = "class C { bool M(bool b) => b == true; }";
//! let analyzer = Analyzer::new();
//! let cancel = CancellationToken::new();
//!
//! let analysis = analyzer.analyze(source, None, &AnalyzerConfig::new(), &cancel).unwrap();
//! assert_eq!(analysis.diagnostics[0].rule_id.as_str(), "MA0073");
//!
//! let report = analyzer.fix(source, None, &AnalyzerConfig::new(), &cancel).unwrap();
//! assert_eq!(report.source, "class C { bool M(bool b) => b; }");
//! ```

pub mod analyzer;
pub mod cli;
pub mod config;
pub mod error;
pub mod fix;
pub mod lint;
pub mod semantic;
pub mod syntax;
pub mod testing;
pub mod ui;

pub use error::{Error, Result};
