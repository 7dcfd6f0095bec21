//! ruleforge CLI entry point.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use ruleforge::cli::{Cli, CommandDispatcher};
use ruleforge::ui::{create_ui, OutputMode};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG
/// 2. `RUST_LOG` environment variable (if set)
/// 3. Default is INFO
///
/// Logs go to stderr so they never mix with reports on stdout.
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("ruleforge=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ruleforge=info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    tracing::debug!("ruleforge starting with args: {:?}", cli);

    let output_mode = if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let mut ui = create_ui(output_mode, cli.no_color);

    let dispatcher = CommandDispatcher::new(cli.config.clone());
    let result = dispatcher
        .dispatch(&cli, ui.as_mut())
        .context("command failed");

    match result {
        Ok(result) => ExitCode::from(result.exit_code as u8),
        Err(e) => {
            ui.error(&format!("Error: {:#}", e));
            ExitCode::from(2)
        }
    }
}
