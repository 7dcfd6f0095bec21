//! Typed, hierarchical access to analyzer options.

use std::collections::BTreeMap;
use std::path::Path;

use super::editorconfig::EditorConfig;
use crate::lint::{RuleId, Severity};
use crate::syntax::NodeKind;

const DIAGNOSTIC_PREFIX: &str = "dotnet_diagnostic.";

/// Immutable option set handed to every rule invocation.
///
/// Lookups go from most to least specific: `<id>.<NodeKind>.<option>`,
/// then `<id>.<option>`, then the global `<option>`. Keys are
/// case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalyzerConfig {
    values: BTreeMap<String, String>,
}

enum SeveritySetting {
    Disabled,
    Level(Severity),
}

fn parse_severity(value: &str) -> Option<SeveritySetting> {
    Some(match value.trim().to_ascii_lowercase().as_str() {
        "none" => SeveritySetting::Disabled,
        "silent" | "hidden" => SeveritySetting::Level(Severity::Hidden),
        "suggestion" | "info" => SeveritySetting::Level(Severity::Info),
        "warning" => SeveritySetting::Level(Severity::Warning),
        "error" => SeveritySetting::Level(Severity::Error),
        _ => return None,
    })
}

fn normalize_key(key: &str) -> String {
    let key = key.trim().to_ascii_lowercase();
    match key.strip_prefix(DIAGNOSTIC_PREFIX) {
        Some(rest) => rest.to_string(),
        None => key,
    }
}

impl AnalyzerConfig {
    /// An empty configuration; every lookup falls back to defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from key/value pairs. Later pairs override earlier ones.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let values = pairs
            .into_iter()
            .map(|(k, v)| (normalize_key(k.as_ref()), v.into()))
            .collect();
        Self { values }
    }

    /// Add or replace one entry.
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.values.insert(normalize_key(key), value.into());
        self
    }

    /// Effective configuration for `file` from configuration files ordered
    /// outermost first.
    pub fn for_file(configs: &[EditorConfig], file: &Path) -> Self {
        let config = Self::from_pairs(
            configs
                .iter()
                .flat_map(|c| c.properties_for(file))
                .collect::<Vec<_>>(),
        );
        tracing::debug!(
            file = %file.display(),
            entries = config.values.len(),
            "resolved configuration"
        );
        config
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw value for `option`, most specific scope first.
    pub fn get_str(&self, rule: &RuleId, kind: Option<NodeKind>, option: &str) -> Option<&str> {
        let rule = rule.0.to_ascii_lowercase();
        let option = option.to_ascii_lowercase();

        let scoped = kind.map(|k| format!("{}.{}.{}", rule, k.name().to_ascii_lowercase(), option));
        let keys = scoped
            .into_iter()
            .chain([format!("{}.{}", rule, option), option.clone()]);
        for key in keys {
            if let Some(value) = self.values.get(&key) {
                return Some(value.as_str());
            }
        }
        None
    }

    fn get_parsed<T>(
        &self,
        rule: &RuleId,
        kind: Option<NodeKind>,
        option: &str,
        parse: impl Fn(&str) -> Option<T>,
        default: T,
    ) -> T {
        match self.get_str(rule, kind, option) {
            None => default,
            Some(raw) => parse(raw.trim()).unwrap_or_else(|| {
                tracing::debug!(rule = %rule, option, value = raw, "ignoring malformed option value");
                default
            }),
        }
    }

    /// Boolean option; malformed values fall back to `default`.
    pub fn get_bool(&self, rule: &RuleId, kind: Option<NodeKind>, option: &str, default: bool) -> bool {
        self.get_parsed(
            rule,
            kind,
            option,
            |v| match v.to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            default,
        )
    }

    /// Unsigned integer option; malformed values fall back to `default`.
    pub fn get_usize(
        &self,
        rule: &RuleId,
        kind: Option<NodeKind>,
        option: &str,
        default: usize,
    ) -> usize {
        self.get_parsed(rule, kind, option, |v| v.parse().ok(), default)
    }

    /// Configured severity for a rule, `None` when the rule is disabled.
    pub fn severity_for(&self, rule: &RuleId, default: Severity) -> Option<Severity> {
        let Some(raw) = self.get_str(rule, None, "severity") else {
            return Some(default);
        };
        match parse_severity(raw) {
            Some(SeveritySetting::Disabled) => None,
            Some(SeveritySetting::Level(level)) => Some(level),
            None => {
                tracing::debug!(rule = %rule, value = raw, "ignoring malformed severity");
                Some(default)
            }
        }
    }
}
