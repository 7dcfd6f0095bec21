//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::fix::DEFAULT_MAX_PASSES;
use crate::lint::OutputFormat;

/// ruleforge - Rule-driven source analysis and batch fixing.
#[derive(Debug, Parser)]
#[command(name = "ruleforge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file to use instead of discovered .editorconfig files
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Report diagnostics for source files
    Check(CheckArgs),

    /// Apply fixes to source files
    Fix(FixArgs),
}

/// Arguments for the `check` command.
#[derive(Debug, Clone, clap::Args)]
pub struct CheckArgs {
    /// Files or directories to analyze
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,

    /// Only run these rules (repeatable, or comma-separated)
    #[arg(long = "rule", value_delimiter = ',')]
    pub rules: Vec<String>,

    /// Shard each file's top-level members across threads
    #[arg(long)]
    pub parallel: bool,
}

/// Arguments for the `fix` command.
#[derive(Debug, Clone, clap::Args)]
pub struct FixArgs {
    /// Files or directories to fix
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Only fix diagnostics of these rules (repeatable, or comma-separated)
    #[arg(long = "rule", value_delimiter = ',')]
    pub rules: Vec<String>,

    /// Report what would change without writing files
    #[arg(long)]
    pub dry_run: bool,

    /// Maximum number of fix passes per file
    #[arg(long, default_value_t = DEFAULT_MAX_PASSES)]
    pub max_passes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn check_defaults() {
        let cli = Cli::parse_from(["ruleforge", "check", "src"]);
        let Commands::Check(args) = cli.command else {
            panic!("expected check");
        };
        assert_eq!(args.paths, vec![PathBuf::from("src")]);
        assert_eq!(args.format, OutputFormat::Human);
        assert!(args.rules.is_empty());
    }

    #[test]
    fn check_with_format_and_rules() {
        let cli = Cli::parse_from([
            "ruleforge", "check", "a.cs", "--format", "json", "--rule", "MA0031,MA0073", "--rule",
            "MA0048",
        ]);
        let Commands::Check(args) = cli.command else {
            panic!("expected check");
        };
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.rules, vec!["MA0031", "MA0073", "MA0048"]);
    }

    #[test]
    fn fix_flags() {
        let cli = Cli::parse_from(["ruleforge", "--quiet", "fix", "src", "--dry-run", "--max-passes", "3"]);
        assert!(cli.quiet);
        let Commands::Fix(args) = cli.command else {
            panic!("expected fix");
        };
        assert!(args.dry_run);
        assert_eq!(args.max_passes, 3);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["ruleforge", "check", "src", "--no-color", "--config", "rules.ini"]);
        assert!(cli.no_color);
        assert_eq!(cli.config, Some(PathBuf::from("rules.ini")));
    }

    #[test]
    fn paths_are_required() {
        assert!(Cli::try_parse_from(["ruleforge", "check"]).is_err());
    }
}
