//! `tooldist set-version` — record the version an agent should run and show
//! what it reports running.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use tooldist_common::Number;

use crate::app::AppContext;
use crate::application::services::signal::{read_running, set_desired};
use crate::domain::config::validate_agent_tag;

/// Arguments for the set-version command.
#[derive(Args)]
pub struct SetVersionArgs {
    /// Agent tag
    pub tag: String,

    /// Version the agent should converge to
    pub version: String,
}

/// Run `tooldist set-version`.
///
/// # Errors
///
/// Returns an error if the tag or version is invalid or the store rejects
/// the write.
pub async fn run(args: &SetVersionArgs, app: &AppContext) -> Result<ExitCode> {
    validate_agent_tag(&args.tag)?;
    let version: Number = args
        .version
        .parse()
        .with_context(|| format!("invalid version {}", args.version))?;
    let store = app.primary_store();
    set_desired(&store, &args.tag, &version)
        .await
        .context("recording desired version")?;
    let running = read_running(&store, &args.tag)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(agent = %args.tag, error = %e, "cannot read running version");
            None
        });
    app.renderer()
        .render_desired(&args.tag, &version, running.as_ref())?;
    Ok(ExitCode::SUCCESS)
}
