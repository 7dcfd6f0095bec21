//! Human-readable output formatter.
//!
//! Formats diagnostics for terminal display with optional color support.

use std::io::Write;

use console::Style;

use super::{FileDiagnostics, LintFormatter};
use crate::lint::{Severity, Summary};

/// Formats check output for human consumption.
pub struct HumanFormatter {
    /// Whether to use colors (ANSI escape codes).
    pub use_color: bool,
}

impl HumanFormatter {
    /// Create a new human formatter.
    pub fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    fn severity_style(severity: Severity) -> Style {
        match severity {
            Severity::Error => Style::new().red().bold(),
            Severity::Warning => Style::new().yellow().bold(),
            Severity::Info => Style::new().cyan(),
            Severity::Hidden => Style::new().dim(),
        }
    }

    fn paint(&self, style: Style, text: &str) -> String {
        if self.use_color {
            style.force_styling(true).apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }
}

impl LintFormatter for HumanFormatter {
    fn format<W: Write>(&self, files: &[FileDiagnostics<'_>], writer: &mut W) -> std::io::Result<()> {
        for file in files {
            for diag in file.diagnostics {
                // Header line: warning[MA0073]: message
                let prefix = format!("{}[{}]", diag.severity, diag.rule_id);
                writeln!(
                    writer,
                    "{}: {}",
                    self.paint(Self::severity_style(diag.severity), &prefix),
                    diag.message
                )?;

                let pos = file.position(diag);
                writeln!(
                    writer,
                    "  {} {}:{}:{}",
                    self.paint(Style::new().blue(), "-->"),
                    file.path.display(),
                    pos.line,
                    pos.column
                )?;

                for span in &diag.additional_spans {
                    let related = file.lines.position(span.start);
                    writeln!(
                        writer,
                        "   = note: related location at {}:{}",
                        related.line, related.column
                    )?;
                }

                writeln!(writer)?;
            }
        }

        let summary = Summary::of(files.iter().flat_map(|f| f.diagnostics));
        if summary.total > 0 {
            writeln!(
                writer,
                "Found {} error(s), {} warning(s) and {} info(s) in {} file(s)",
                summary.errors,
                summary.warnings,
                summary.infos,
                files.iter().filter(|f| !f.diagnostics.is_empty()).count()
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::lint::{Diagnostic, RuleId};
    use crate::syntax::{LineIndex, TextSpan};

    const SOURCE: &str = "class A\n{\n    bool b = x == true;\n}\n";

    fn render(diagnostics: &[Diagnostic], use_color: bool) -> String {
        let lines = LineIndex::new(SOURCE);
        let files = [FileDiagnostics::new(Path::new("src/A.cs"), &lines, diagnostics)];
        let mut output = Vec::new();
        HumanFormatter::new(use_color)
            .format(&files, &mut output)
            .unwrap();
        String::from_utf8(output).unwrap()
    }

    fn warning() -> Diagnostic {
        Diagnostic::new(
            RuleId::new("MA0073"),
            Severity::Warning,
            TextSpan::new(25, 27),
            "Remove the comparison to 'true'",
        )
    }

    #[test]
    fn formats_header_and_location() {
        let output = render(&[warning()], false);
        insta::assert_snapshot!(output, @r"
        warning[MA0073]: Remove the comparison to 'true'
          --> src/A.cs:3:16

        Found 0 error(s), 1 warning(s) and 0 info(s) in 1 file(s)
        ");
    }

    #[test]
    fn formats_related_locations() {
        let output = render(&[warning().with_additional_span(TextSpan::new(0, 5))], false);
        assert!(output.contains("= note: related location at 1:1"));
    }

    #[test]
    fn colors_only_when_enabled() {
        assert!(!render(&[warning()], false).contains('\u{1b}'));
        assert!(render(&[warning()], true).contains('\u{1b}'));
    }

    #[test]
    fn no_summary_when_no_issues() {
        let output = render(&[], false);
        assert!(!output.contains("Found"));
    }
}
