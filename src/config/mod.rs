//! Configuration resolver.
//!
//! Options come from editorconfig-style files (see [`EditorConfig`]) and are
//! exposed to rules through the immutable [`AnalyzerConfig`].

mod editorconfig;
mod resolver;

pub use editorconfig::{discover, EditorConfig, Section};
pub use resolver::AnalyzerConfig;

use std::path::Path;

use crate::error::Result;

/// Load the configuration for `file`.
///
/// With an explicit `config_override` only that file is read; otherwise
/// `.editorconfig` files are discovered upward from the file.
pub fn load_config(file: &Path, config_override: Option<&Path>) -> Result<AnalyzerConfig> {
    let configs = match config_override {
        Some(path) => vec![EditorConfig::load(path)?],
        None => discover(file)?,
    };
    Ok(AnalyzerConfig::for_file(&configs, file))
}
