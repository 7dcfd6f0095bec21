//! Fix command implementation.
//!
//! The `ruleforge fix` command runs the batch fixer over source files and
//! writes the results back.

use std::fs;
use std::path::{Path, PathBuf};

use crate::analyzer::Analyzer;
use crate::cli::args::FixArgs;
use crate::error::Result;
use crate::fix::BatchReport;
use crate::lint::CancellationToken;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult, EXIT_FAILURE};
use super::{load_unit, rule_filter, source_files};

/// The fix command implementation.
pub struct FixCommand {
    config_override: Option<PathBuf>,
    args: FixArgs,
}

impl FixCommand {
    /// Create a new fix command.
    pub fn new(config_override: Option<&Path>, args: FixArgs) -> Self {
        Self {
            config_override: config_override.map(Path::to_path_buf),
            args,
        }
    }

    /// Get the command arguments.
    pub fn args(&self) -> &FixArgs {
        &self.args
    }

    fn fix_file(&self, analyzer: &Analyzer, path: &Path, cancel: &CancellationToken) -> Result<(String, BatchReport)> {
        let (source, config) = load_unit(path, self.config_override.as_deref())?;
        let report = analyzer.fix(&source, Some(path), &config, cancel)?;
        Ok((source, report))
    }

    fn describe(&self, path: &Path, report: &BatchReport, ui: &mut dyn UserInterface) {
        let verb = if self.args.dry_run { "Would fix" } else { "Fixed" };
        ui.success(&format!(
            "{} {} issue(s) in {} ({} pass(es))",
            verb,
            report.applied,
            path.display(),
            report.passes
        ));
        let left = report.remaining.len() + report.unfixable.len();
        if left > 0 {
            ui.warning(&format!(
                "{}: {} issue(s) could not be fixed automatically",
                path.display(),
                left
            ));
        }
    }
}

impl Command for FixCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let analyzer = Analyzer::new().max_passes(self.args.max_passes);
        let Some(only) = rule_filter(&self.args.rules, analyzer.rules(), ui) else {
            return Ok(CommandResult::failure(EXIT_FAILURE));
        };
        let analyzer = analyzer.only(only);
        let cancel = CancellationToken::new();

        let mut failed = false;
        let mut changed = 0;
        for path in source_files(&self.args.paths)? {
            let (source, report) = match self.fix_file(&analyzer, &path, &cancel) {
                Ok(fixed) => fixed,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    ui.error(&format!("{}: {}", path.display(), e));
                    failed = true;
                    continue;
                }
            };
            if report.source == source {
                continue;
            }
            if !self.args.dry_run {
                fs::write(&path, &report.source)?;
            }
            tracing::debug!(path = %path.display(), passes = report.passes, applied = report.applied, "fixed file");
            self.describe(&path, &report, ui);
            changed += 1;
        }

        if changed == 0 && !failed {
            ui.success("Nothing to fix");
        }
        if failed {
            Ok(CommandResult::failure(EXIT_FAILURE))
        } else {
            Ok(CommandResult::success())
        }
    }
}
