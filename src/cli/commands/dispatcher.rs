//! Command dispatching.
//!
//! This module provides the core command infrastructure:
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::path::{Path, PathBuf};

use crate::cli::args::{Cli, Commands};
use crate::error::Result;
use crate::ui::UserInterface;

/// Trait for command implementations.
///
/// Each CLI subcommand implements this trait to provide its execution logic.
pub trait Command {
    /// Execute the command, reporting through `ui`.
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    /// Create a failure result.
    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }
}

/// Exit code when error-severity diagnostics remain.
pub const EXIT_DIAGNOSTICS: i32 = 1;

/// Exit code when some input could not be read, parsed or fixed.
pub const EXIT_FAILURE: i32 = 2;

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    config_override: Option<PathBuf>,
}

impl CommandDispatcher {
    /// Create a dispatcher; `config_override` replaces configuration discovery.
    pub fn new(config_override: Option<PathBuf>) -> Self {
        Self { config_override }
    }

    pub fn config_override(&self) -> Option<&Path> {
        self.config_override.as_deref()
    }

    /// Dispatch and execute a command.
    pub fn dispatch(&self, cli: &Cli, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        match &cli.command {
            Commands::Check(args) => {
                let cmd = super::check::CheckCommand::new(self.config_override(), args.clone());
                cmd.execute(ui)
            }
            Commands::Fix(args) => {
                let cmd = super::fix::FixCommand::new(self.config_override(), args.clone());
                cmd.execute(ui)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_result_success() {
        let result = CommandResult::success();
        assert!(result.success);
        assert_eq!(result.exit_code, 0);
    }

    #[test]
    fn command_result_failure() {
        let result = CommandResult::failure(EXIT_FAILURE);
        assert!(!result.success);
        assert_eq!(result.exit_code, 2);
    }

    #[test]
    fn dispatcher_keeps_config_override() {
        let dispatcher = CommandDispatcher::new(Some(PathBuf::from("/test/.editorconfig")));
        assert_eq!(dispatcher.config_override(), Some(Path::new("/test/.editorconfig")));
        assert_eq!(CommandDispatcher::new(None).config_override(), None);
    }
}
