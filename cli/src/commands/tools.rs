//! `tooldist tools` — list tools matching a version constraint.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use tooldist_common::Number;

use crate::app::AppContext;
use crate::application::services::select::select;
use crate::domain::{LookupParams, ToolsConstraint};

/// Arguments for the tools command.
#[derive(Args, Default)]
pub struct ToolsArgs {
    /// Exact version, e.g. 1.17.2
    #[arg(long, conflicts_with_all = ["major", "minor", "released"])]
    pub version: Option<String>,

    /// Major version to match
    #[arg(long)]
    pub major: Option<u32>,

    /// Minor version to match
    #[arg(long)]
    pub minor: Option<u32>,

    /// Exclude development builds
    #[arg(long)]
    pub released: bool,

    /// Series to look in (repeatable; defaults to agent.series)
    #[arg(long)]
    pub series: Vec<String>,

    /// Architecture to look in (repeatable; defaults to agent.arch)
    #[arg(long)]
    pub arch: Vec<String>,
}

impl ToolsArgs {
    fn constraint(&self, app: &AppContext) -> Result<ToolsConstraint> {
        let params = LookupParams {
            series: or_default(&self.series, &app.config.agent.series),
            arches: or_default(&self.arch, &app.config.agent.arch),
        };
        match &self.version {
            Some(v) => {
                let number: Number = v.parse().with_context(|| format!("invalid --version {v}"))?;
                Ok(ToolsConstraint::exact(number, params))
            }
            None => Ok(ToolsConstraint::family(
                self.major,
                self.minor,
                self.released,
                params,
            )),
        }
    }
}

fn or_default(values: &[String], default: &str) -> Vec<String> {
    if values.is_empty() {
        vec![default.to_string()]
    } else {
        values.to_vec()
    }
}

/// Run `tooldist tools`.
///
/// # Errors
///
/// Returns an error if the constraint is invalid or a catalog cannot be read.
pub async fn run(args: &ToolsArgs, app: &AppContext) -> Result<ExitCode> {
    let constraint = args.constraint(app)?;
    let found = select(&app.catalogs(), &constraint)
        .await
        .context("looking up tools")?;
    app.renderer().render_tools(&found)?;
    Ok(ExitCode::SUCCESS)
}
