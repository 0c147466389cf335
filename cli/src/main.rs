//! tooldist - versioned tools distribution and agent upgrades

#![cfg_attr(test, allow(clippy::expect_used))]

use std::process::ExitCode;

use clap::Parser;
use tooldist_cli::cli::Cli;
use tooldist_cli::output::OutputContext;
use tooldist_cli::output::json::{error_code, format_error};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so `--json` output on stdout stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    let (json, no_color) = (cli.json, cli.no_color);
    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            match format_error(&format!("{e:#}"), error_code(&e)) {
                Ok(out) if json => println!("{out}"),
                _ => OutputContext::new(no_color, false).error(&format!("{e:#}")),
            }
            ExitCode::FAILURE
        }
    }
}
