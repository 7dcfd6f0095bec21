//! Parsing of editorconfig-style configuration files.
//!
//! A file is a preamble of `key = value` pairs followed by `[glob]`
//! sections. Sections whose glob matches the analyzed path are merged in
//! file order, so later sections override earlier ones.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};

use crate::error::{Error, Result};

/// One `[glob]` section.
#[derive(Debug, Clone)]
pub struct Section {
    /// Glob as written in the file.
    pub pattern: String,
    matcher: GlobMatcher,
    /// Entries in file order, keys lowercased.
    pub entries: Vec<(String, String)>,
}

impl Section {
    /// Whether the section applies to `path`.
    pub fn matches(&self, path: &Path) -> bool {
        self.matcher.is_match(path)
    }
}

/// A parsed configuration file.
#[derive(Debug, Clone, Default)]
pub struct EditorConfig {
    /// Source file, if loaded from disk.
    pub path: Option<PathBuf>,
    /// Whether this file stops the upward search (`root = true`).
    pub root: bool,
    /// Entries before the first section; they apply to every file.
    pub preamble: Vec<(String, String)>,
    pub sections: Vec<Section>,
}

impl EditorConfig {
    /// Load and parse a file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Config {
                    path: path.to_path_buf(),
                    message: "file not found".to_string(),
                }
            } else {
                Error::Io(e)
            }
        })?;
        let mut config = Self::parse(&content, path);
        config.path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse configuration text. `source` is only used in log messages.
    ///
    /// Malformed lines are logged and skipped. Entries under a header that
    /// cannot be read are dropped up to the next valid header.
    pub fn parse(content: &str, source: &Path) -> Self {
        let mut config = EditorConfig::default();
        let mut in_broken_section = false;

        for (index, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                let Some(pattern) = rest.strip_suffix(']').map(str::trim) else {
                    tracing::debug!(file = %source.display(), line = index + 1, "skipping unterminated section header");
                    in_broken_section = true;
                    continue;
                };
                match compile_glob(pattern) {
                    Ok(matcher) => {
                        in_broken_section = false;
                        config.sections.push(Section {
                            pattern: pattern.to_string(),
                            matcher,
                            entries: Vec::new(),
                        });
                    }
                    Err(e) => {
                        tracing::debug!(file = %source.display(), line = index + 1, pattern, error = %e, "skipping section with invalid glob");
                        in_broken_section = true;
                    }
                }
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                tracing::debug!(file = %source.display(), line = index + 1, content = line, "skipping line without '='");
                continue;
            };
            if in_broken_section {
                continue;
            }
            let key = key.trim().to_ascii_lowercase();
            let value = strip_comment(value.trim()).to_string();

            match config.sections.last_mut() {
                Some(section) => section.entries.push((key, value)),
                None if key == "root" => config.root = value.eq_ignore_ascii_case("true"),
                None => config.preamble.push((key, value)),
            }
        }

        config
    }

    /// Effective properties for `path`: preamble first, then matching
    /// sections in file order.
    ///
    /// Paths under the file's own directory are matched relative to it.
    pub fn properties_for(&self, path: &Path) -> BTreeMap<String, String> {
        let relative = self
            .path
            .as_deref()
            .and_then(Path::parent)
            .and_then(|dir| path.strip_prefix(dir).ok())
            .unwrap_or(path);
        let mut properties = BTreeMap::new();
        let sections = self
            .sections
            .iter()
            .filter(|s| s.matches(relative))
            .flat_map(|s| s.entries.iter());
        for (key, value) in self.preamble.iter().chain(sections) {
            properties.insert(key.clone(), value.clone());
        }
        properties
    }
}

/// Patterns without a `/` match a file name in any directory.
fn compile_glob(pattern: &str) -> std::result::Result<GlobMatcher, globset::Error> {
    let pattern = match pattern.strip_prefix('/') {
        Some(anchored) => anchored.to_string(),
        None if !pattern.contains('/') => format!("**/{}", pattern),
        None => pattern.to_string(),
    };
    Ok(GlobBuilder::new(&pattern)
        .literal_separator(true)
        .build()?
        .compile_matcher())
}

fn strip_comment(value: &str) -> &str {
    match value.find(" #").or_else(|| value.find(" ;")) {
        Some(at) => value[..at].trim_end(),
        None => value,
    }
}

/// Configuration files that apply to `file`, outermost first.
///
/// Walks up from the file's directory collecting `.editorconfig` files and
/// stops after one that declares `root = true`.
pub fn discover(file: &Path) -> Result<Vec<EditorConfig>> {
    let mut found = Vec::new();
    let start = if file.is_dir() { Some(file) } else { file.parent() };
    for dir in start.into_iter().flat_map(Path::ancestors) {
        let candidate = dir.join(".editorconfig");
        if candidate.is_file() {
            let config = EditorConfig::load(&candidate)?;
            let root = config.root;
            found.push(config);
            if root {
                break;
            }
        }
    }
    found.reverse();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = "\
root = true
severity = warning

[*.cs]
MA0031.severity = error   # inline comment
dotnet_diagnostic.MA0073.severity = none

[src/generated/**]
MA0031.severity = none
";

    #[test]
    fn parses_preamble_and_sections() {
        let config = EditorConfig::parse(SAMPLE, Path::new(".editorconfig"));
        assert!(config.root);
        assert_eq!(config.preamble, vec![("severity".into(), "warning".into())]);
        assert_eq!(config.sections.len(), 2);
        assert_eq!(config.sections[0].entries[0].0, "ma0031.severity");
        assert_eq!(config.sections[0].entries[0].1, "error");
    }

    #[test]
    fn later_sections_win() {
        let config = EditorConfig::parse(SAMPLE, Path::new(".editorconfig"));

        let normal = config.properties_for(Path::new("src/app/Program.cs"));
        assert_eq!(normal.get("ma0031.severity").map(String::as_str), Some("error"));
        assert_eq!(normal.get("severity").map(String::as_str), Some("warning"));

        let generated = config.properties_for(Path::new("src/generated/Model.cs"));
        assert_eq!(generated.get("ma0031.severity").map(String::as_str), Some("none"));
    }

    #[test]
    fn unmatched_sections_are_ignored() {
        let config = EditorConfig::parse(SAMPLE, Path::new(".editorconfig"));
        let props = config.properties_for(Path::new("README.md"));
        assert!(!props.contains_key("ma0031.severity"));
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let config = EditorConfig::parse(
            "[*.cs]\nthis line is junk\nMA0031.severity = error\n",
            Path::new("x"),
        );
        let props = config.properties_for(Path::new("Program.cs"));
        assert_eq!(props.get("ma0031.severity").map(String::as_str), Some("error"));
    }

    #[test]
    fn entries_under_a_broken_header_are_dropped() {
        let config = EditorConfig::parse(
            "a = 1\n[*.cs\nb = 2\n[*.cs]\nc = 3\n",
            Path::new("x"),
        );
        let props = config.properties_for(Path::new("Program.cs"));
        assert_eq!(props.get("a").map(String::as_str), Some("1"));
        assert_eq!(props.get("b"), None);
        assert_eq!(props.get("c").map(String::as_str), Some("3"));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = EditorConfig::load(Path::new("/nonexistent/.editorconfig")).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn discover_stops_at_root() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp.path().join(".editorconfig"), "x = outer\n").unwrap();
        fs::write(
            temp.path().join("a").join(".editorconfig"),
            "root = true\nx = middle\n",
        )
        .unwrap();
        fs::write(nested.join(".editorconfig"), "x = inner\n").unwrap();

        let found = discover(&nested.join("File.cs")).unwrap();
        let values: Vec<_> = found.iter().map(|c| c.preamble[0].1.clone()).collect();
        assert_eq!(values, vec!["middle", "inner"]);
    }
}
