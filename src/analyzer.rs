//! Per-unit analysis pipeline.
//!
//! [`Analyzer`] owns the rule and fix registries and runs the whole
//! pipeline for one source unit: parse, semantic model, dispatch,
//! finalize. [`Analyzer::analyze_all`] fans units out over `rayon`; a unit
//! that fails to parse reports its own error and leaves the others alone.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;

use crate::config::AnalyzerConfig;
use crate::error::Result;
use crate::fix::{BatchReport, FixEngine, FixRegistry, DEFAULT_MAX_PASSES};
use crate::lint::{
    CancellationToken, Diagnostic, DiagnosticEngine, Dispatcher, RuleContext, RuleId,
    RuleRegistry, Summary,
};
use crate::semantic::SemanticModel;
use crate::syntax::{self, LineIndex, SourceParser, Tree};

/// One source file queued for analysis.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub path: PathBuf,
    pub source: String,
    pub config: AnalyzerConfig,
}

impl SourceUnit {
    pub fn new(path: impl Into<PathBuf>, source: impl Into<String>, config: AnalyzerConfig) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
            config,
        }
    }
}

/// Finalized diagnostics for one tree, together with the model they were
/// computed against.
#[derive(Debug)]
pub struct Analysis {
    pub model: SemanticModel,
    pub diagnostics: Vec<Diagnostic>,
}

impl Analysis {
    pub fn tree(&self) -> &Tree {
        self.model.tree()
    }

    pub fn line_index(&self) -> &LineIndex {
        self.model.tree().line_index()
    }

    pub fn summary(&self) -> Summary {
        Summary::of(&self.diagnostics)
    }
}

/// Result of analyzing one unit in [`Analyzer::analyze_all`].
#[derive(Debug)]
pub struct UnitAnalysis {
    pub path: PathBuf,
    pub result: Result<Analysis>,
}

/// Entry point tying the tree model, resolver, dispatcher and fix engine
/// together.
pub struct Analyzer {
    rules: RuleRegistry,
    fixes: FixRegistry,
    parser: Arc<dyn SourceParser>,
    parallel: bool,
    only: HashSet<RuleId>,
    max_passes: usize,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    /// Analyzer with every built-in rule and fix.
    pub fn new() -> Self {
        Self::with_registries(RuleRegistry::with_builtins(), FixRegistry::with_builtins())
    }

    pub fn with_registries(rules: RuleRegistry, fixes: FixRegistry) -> Self {
        Self {
            rules,
            fixes,
            parser: syntax::curly(),
            parallel: false,
            only: HashSet::new(),
            max_passes: DEFAULT_MAX_PASSES,
        }
    }

    /// Use a different frontend.
    pub fn parser(mut self, parser: Arc<dyn SourceParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Shard each tree's top-level members across threads.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Restrict analysis and fixing to these rules. Empty means all rules.
    pub fn only(mut self, rules: impl IntoIterator<Item = RuleId>) -> Self {
        self.only = rules.into_iter().collect();
        self
    }

    pub fn max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    pub fn fixes(&self) -> &FixRegistry {
        &self.fixes
    }

    /// Parse and analyze one source text.
    pub fn analyze(
        &self,
        source: &str,
        path: Option<&Path>,
        config: &AnalyzerConfig,
        cancel: &CancellationToken,
    ) -> Result<Analysis> {
        let tree = Tree::parse(&self.parser, source)?;
        self.analyze_tree(tree, path, config, cancel)
    }

    /// Analyze an already parsed tree.
    pub fn analyze_tree(
        &self,
        tree: Tree,
        path: Option<&Path>,
        config: &AnalyzerConfig,
        cancel: &CancellationToken,
    ) -> Result<Analysis> {
        let model = SemanticModel::new(tree);
        let ctx = RuleContext::new(&model, config, path);
        let raw = Dispatcher::new(&self.rules)
            .parallel(self.parallel)
            .only(self.only.iter().cloned())
            .run(&ctx, cancel)?;
        let diagnostics = DiagnosticEngine::new(config).finalize(raw);
        tracing::debug!(
            path = ?path,
            generation = model.generation(),
            diagnostics = diagnostics.len(),
            "analyzed unit"
        );
        Ok(Analysis { model, diagnostics })
    }

    /// Analyze many units in parallel, returning results in input order.
    pub fn analyze_all(&self, units: &[SourceUnit], cancel: &CancellationToken) -> Vec<UnitAnalysis> {
        units
            .par_iter()
            .map(|unit| {
                let result = self.analyze(&unit.source, Some(&unit.path), &unit.config, cancel);
                if let Err(e) = &result {
                    tracing::warn!(path = %unit.path.display(), error = %e, "analysis failed");
                }
                UnitAnalysis {
                    path: unit.path.clone(),
                    result,
                }
            })
            .collect()
    }

    /// Batch-fix one source text.
    pub fn fix(
        &self,
        source: &str,
        path: Option<&Path>,
        config: &AnalyzerConfig,
        cancel: &CancellationToken,
    ) -> Result<BatchReport> {
        let tree = Tree::parse(&self.parser, source)?;
        FixEngine::new(&self.rules, &self.fixes)
            .max_passes(self.max_passes)
            .only(self.only.iter().cloned())
            .fix_all(tree, config, path, cancel)
    }
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("rules", &self.rules)
            .field("fixes", &self.fixes)
            .field("parallel", &self.parallel)
            .field("max_passes", &self.max_passes)
            .finish()
    }
}
