//! User interface abstraction.
//!
//! This module provides:
//! - [`UserInterface`] trait for UI abstraction
//! - [`TerminalUI`] writing styled text through `console`
//! - [`MockUI`] capturing everything for tests
//!
//! # Example
//!
//! ```
//! use ruleforge::ui::{MockUI, UserInterface};
//!
//! let mut ui = MockUI::new();
//! ui.success("2 fixes applied");
//! assert_eq!(ui.successes(), &["2 fixes applied"]);
//! ```

pub mod mock;
pub mod terminal;

pub use mock::MockUI;
pub use terminal::{create_ui, should_use_colors, TerminalUI, Theme};

/// Output verbosity mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Status messages and reports.
    #[default]
    Normal,
    /// Reports and errors only.
    Quiet,
}

impl OutputMode {
    /// Check if this mode shows status messages.
    pub fn shows_status(&self) -> bool {
        matches!(self, Self::Normal)
    }
}

/// Trait for user interface interactions.
///
/// This trait allows mocking the UI in tests.
pub trait UserInterface {
    /// Get the current output mode.
    fn output_mode(&self) -> OutputMode;

    /// Display a status message.
    fn message(&mut self, msg: &str);

    /// Display a success message.
    fn success(&mut self, msg: &str);

    /// Display a warning message.
    fn warning(&mut self, msg: &str);

    /// Display an error message. Shown in every mode.
    fn error(&mut self, msg: &str);

    /// Write command output (formatted diagnostics, fixed sources) verbatim.
    /// Shown in every mode.
    fn report(&mut self, text: &str);

    /// Whether reports may contain ANSI styling.
    fn use_color(&self) -> bool;
}
