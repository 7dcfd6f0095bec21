//! JSON output formatter.
//!
//! Formats diagnostics as machine-readable JSON for tooling integration.

use std::io::Write;

use serde::Serialize;

use super::{FileDiagnostics, LintFormatter};
use crate::lint::{Severity, Summary};

/// Formats check output as JSON.
#[derive(Debug, Default)]
pub struct JsonFormatter;

#[derive(Serialize)]
struct JsonOutput<'a> {
    diagnostics: Vec<JsonDiagnostic<'a>>,
    summary: Summary,
}

#[derive(Serialize)]
struct JsonDiagnostic<'a> {
    rule_id: &'a str,
    severity: Severity,
    message: &'a str,
    file: String,
    line: usize,
    column: usize,
    start: usize,
    end: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    additional_spans: Vec<[usize; 2]>,
}

impl JsonFormatter {
    /// Create a new JSON formatter.
    pub fn new() -> Self {
        Self
    }
}

impl LintFormatter for JsonFormatter {
    fn format<W: Write>(&self, files: &[FileDiagnostics<'_>], writer: &mut W) -> std::io::Result<()> {
        let diagnostics = files
            .iter()
            .flat_map(|file| {
                file.diagnostics.iter().map(move |d| {
                    let pos = file.position(d);
                    JsonDiagnostic {
                        rule_id: d.rule_id.as_str(),
                        severity: d.severity,
                        message: &d.message,
                        file: file.path.display().to_string(),
                        line: pos.line,
                        column: pos.column,
                        start: d.span.start,
                        end: d.span.end,
                        additional_spans: d
                            .additional_spans
                            .iter()
                            .map(|s| [s.start, s.end])
                            .collect(),
                    }
                })
            })
            .collect();

        let output = JsonOutput {
            diagnostics,
            summary: Summary::of(files.iter().flat_map(|f| f.diagnostics)),
        };

        serde_json::to_writer_pretty(&mut *writer, &output).map_err(std::io::Error::other)?;
        writeln!(writer)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::lint::{Diagnostic, RuleId};
    use crate::syntax::{LineIndex, TextSpan};

    fn render(diagnostics: &[Diagnostic]) -> serde_json::Value {
        let lines = LineIndex::new("int a;\nint b;\n");
        let files = [FileDiagnostics::new(Path::new("B.cs"), &lines, diagnostics)];
        let mut output = Vec::new();
        JsonFormatter::new().format(&files, &mut output).unwrap();
        serde_json::from_slice(&output).unwrap()
    }

    #[test]
    fn produces_valid_json() {
        let parsed = render(&[Diagnostic::new(
            RuleId::new("MA0048"),
            Severity::Error,
            TextSpan::new(11, 12),
            "File name must match type name",
        )]);
        assert!(parsed["diagnostics"].is_array());
        assert_eq!(parsed["summary"]["total"], 1);
        let first = &parsed["diagnostics"][0];
        assert_eq!(first["rule_id"], "MA0048");
        assert_eq!(first["severity"], "error");
        assert_eq!(first["file"], "B.cs");
        assert_eq!(first["line"], 2);
        assert_eq!(first["column"], 5);
        assert!(first["additional_spans"].is_null());
    }

    #[test]
    fn summary_counts_by_severity() {
        let d = |rule: &str, severity| Diagnostic::new(RuleId::new(rule), severity, TextSpan::empty(0), "m");
        let parsed = render(&[
            d("r1", Severity::Error),
            d("r2", Severity::Warning),
            d("r3", Severity::Warning),
            d("r4", Severity::Info),
        ]);
        assert_eq!(parsed["summary"]["total"], 4);
        assert_eq!(parsed["summary"]["errors"], 1);
        assert_eq!(parsed["summary"]["warnings"], 2);
        assert_eq!(parsed["summary"]["infos"], 1);
    }

    #[test]
    fn empty_input_has_zero_total() {
        let parsed = render(&[]);
        assert_eq!(parsed["summary"]["total"], 0);
    }
}
