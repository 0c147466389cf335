//! CLI argument parsing with clap derive

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags, OutputFlags};
use crate::commands;
use crate::output::{HumanRenderer, JsonRenderer, OutputContext, Renderer};

/// Publish versioned tools and keep agents on their desired version
#[derive(Parser)]
#[command(
    name = "tooldist",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Primary store: a directory or an http(s) URL (overrides config)
    #[arg(long, global = true, env = "TOOLDIST_STORE")]
    pub store: Option<String>,

    /// Increase log verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Upload tarballs and rebuild the catalog
    Publish(commands::publish::PublishArgs),

    /// List tools matching a version constraint
    Tools(commands::tools::ToolsArgs),

    /// Record the version an agent should run
    SetVersion(commands::set_version::SetVersionArgs),

    /// Keep this agent on its desired version
    Agent(commands::agent::AgentArgs),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid or the command fails.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            json,
            quiet,
            no_color,
            store,
            verbose: _,
            command,
        } = self;

        let flags = AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
            },
            store,
        };

        match command {
            Command::Version => {
                let ctx = OutputContext::new(no_color, quiet);
                let renderer = if json {
                    Renderer::Json(JsonRenderer)
                } else {
                    Renderer::Human(HumanRenderer::new(&ctx))
                };
                commands::version::run(&renderer)
            }
            Command::Publish(args) => commands::publish::run(&args, &AppContext::new(&flags)?).await,
            Command::Tools(args) => commands::tools::run(&args, &AppContext::new(&flags)?).await,
            Command::SetVersion(args) => {
                commands::set_version::run(&args, &AppContext::new(&flags)?).await
            }
            Command::Agent(args) => commands::agent::run(&args, &AppContext::new(&flags)?).await,
        }
    }

    /// Default log filter: the agent logs its progress, other commands only
    /// warnings. Each `-v` raises the level.
    #[must_use]
    pub fn default_log_filter(&self) -> &'static str {
        const LEVELS: [&str; 4] = ["warn", "info", "debug", "trace"];
        let base = usize::from(matches!(self.command, Command::Agent(_)));
        LEVELS[(base + usize::from(self.verbose)).min(LEVELS.len() - 1)]
    }
}
