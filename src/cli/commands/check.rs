//! Check command implementation.
//!
//! The `ruleforge check` command analyzes source files and prints their
//! diagnostics.

use std::path::{Path, PathBuf};

use crate::analyzer::{Analyzer, SourceUnit};
use crate::cli::args::CheckArgs;
use crate::error::Result;
use crate::lint::{
    CancellationToken, FileDiagnostics, HumanFormatter, JsonFormatter, LintFormatter,
    OutputFormat, Severity,
};
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult, EXIT_DIAGNOSTICS, EXIT_FAILURE};
use super::{load_unit, rule_filter, source_files};

/// The check command implementation.
pub struct CheckCommand {
    config_override: Option<PathBuf>,
    args: CheckArgs,
}

impl CheckCommand {
    /// Create a new check command.
    pub fn new(config_override: Option<&Path>, args: CheckArgs) -> Self {
        Self {
            config_override: config_override.map(Path::to_path_buf),
            args,
        }
    }

    /// Get the command arguments.
    pub fn args(&self) -> &CheckArgs {
        &self.args
    }

    fn format_output(&self, files: &[FileDiagnostics<'_>], use_color: bool) -> Result<String> {
        let mut output = Vec::new();
        match self.args.format {
            OutputFormat::Json => JsonFormatter::new().format(files, &mut output)?,
            OutputFormat::Human => HumanFormatter::new(use_color).format(files, &mut output)?,
        }
        Ok(String::from_utf8_lossy(&output).into_owned())
    }
}

impl Command for CheckCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let analyzer = Analyzer::new().parallel(self.args.parallel);
        let Some(only) = rule_filter(&self.args.rules, analyzer.rules(), ui) else {
            return Ok(CommandResult::failure(EXIT_FAILURE));
        };
        let analyzer = analyzer.only(only);

        let mut failed = false;
        let mut units = Vec::new();
        for path in source_files(&self.args.paths)? {
            match load_unit(&path, self.config_override.as_deref()) {
                Ok((source, config)) => units.push(SourceUnit::new(path, source, config)),
                Err(e) => {
                    ui.error(&format!("{}: {}", path.display(), e));
                    failed = true;
                }
            }
        }

        let results = analyzer.analyze_all(&units, &CancellationToken::new());
        let mut analyses = Vec::new();
        for unit in results {
            match unit.result {
                Ok(analysis) => analyses.push((unit.path, analysis)),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    ui.error(&format!("{}: {}", unit.path.display(), e));
                    failed = true;
                }
            }
        }

        let files: Vec<FileDiagnostics<'_>> = analyses
            .iter()
            .map(|(path, analysis)| FileDiagnostics::new(path, analysis.line_index(), &analysis.diagnostics))
            .collect();
        let total: usize = files.iter().map(|f| f.diagnostics.len()).sum();
        let has_errors = files
            .iter()
            .flat_map(|f| f.diagnostics)
            .any(|d| d.severity == Severity::Error);

        if total == 0 && self.args.format == OutputFormat::Human {
            if !failed {
                ui.success(&format!("No issues found in {} file(s)", files.len()));
            }
        } else {
            let output = self.format_output(&files, ui.use_color())?;
            ui.report(&output);
        }

        if failed {
            Ok(CommandResult::failure(EXIT_FAILURE))
        } else if has_errors {
            Ok(CommandResult::failure(EXIT_DIAGNOSTICS))
        } else {
            Ok(CommandResult::success())
        }
    }
}
