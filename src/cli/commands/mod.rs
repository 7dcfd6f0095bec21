//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait, which provides a uniform
//! interface for executing commands and reporting results.
//!
//! # Architecture
//!
//! Commands are dispatched via [`CommandDispatcher`], which routes CLI
//! subcommands to their implementations.

pub mod check;
pub mod dispatcher;
pub mod fix;

pub use dispatcher::{Command, CommandDispatcher, CommandResult};

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{load_config, AnalyzerConfig};
use crate::error::{Error, Result};
use crate::lint::{RuleId, RuleRegistry};
use crate::ui::UserInterface;

/// Extension of files picked up when walking directories.
const SOURCE_EXTENSION: &str = "cs";

/// Expand `paths` into the source files to process, sorted and unique.
///
/// Files named explicitly are always included; directories contribute
/// every `.cs` file below them.
pub(crate) fn source_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            walk(path, &mut files)?;
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            )));
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, files)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some(SOURCE_EXTENSION) {
            files.push(path);
        }
    }
    Ok(())
}

/// Source text and effective configuration of one file.
pub(crate) fn load_unit(path: &Path, config_override: Option<&Path>) -> Result<(String, AnalyzerConfig)> {
    let source = fs::read_to_string(path)?;
    let config = load_config(path, config_override)?;
    Ok((source, config))
}

/// Parse `--rule` values, reporting unknown IDs. `None` when any is unknown.
pub(crate) fn rule_filter(
    values: &[String],
    registry: &RuleRegistry,
    ui: &mut dyn UserInterface,
) -> Option<Vec<RuleId>> {
    let ids: Vec<RuleId> = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(RuleId::new)
        .collect();
    let unknown: Vec<&RuleId> = ids.iter().filter(|id| registry.get(id).is_none()).collect();
    if unknown.is_empty() {
        return Some(ids);
    }
    for id in unknown {
        ui.error(&format!("Unknown rule '{}'", id));
    }
    None
}
