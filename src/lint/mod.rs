//! Rules, dispatch and diagnostics.
//!
//! # Overview
//!
//! The lint system consists of:
//!
//! - **Rules** - Individual checks keyed by node kind ([`Rule`] trait)
//! - **Registry** - Collection of all available rules ([`RuleRegistry`])
//! - **Dispatcher** - One traversal feeding every node to the interested rules ([`Dispatcher`])
//! - **Diagnostics** - Findings and their final ordering ([`Diagnostic`], [`DiagnosticEngine`])
//!
//! # Example
//!
//! ```
//! use ruleforge::lint::{RuleRegistry, RuleId, Severity};
//!
//! let registry = RuleRegistry::with_builtins();
//! assert!(registry.get(&RuleId::new("MA0031")).is_some());
//! assert!(registry.get(&RuleId::new("nonexistent")).is_none());
//!
//! assert!(Severity::Info < Severity::Warning);
//! assert!(Severity::Warning < Severity::Error);
//! ```

pub mod diagnostic;
pub mod dispatcher;
pub mod output;
pub mod registry;
pub mod rule;
pub mod rules;

pub use diagnostic::{Diagnostic, DiagnosticEngine, DiagnosticSink, Summary};
pub use dispatcher::{CancellationToken, Dispatcher};
pub use output::{FileDiagnostics, HumanFormatter, JsonFormatter, LintFormatter, OutputFormat};
pub use registry::RuleRegistry;
pub use rule::{Rule, RuleContext, RuleId, Severity};
