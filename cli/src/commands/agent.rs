//! `tooldist agent` — run the upgrader for one agent.
//!
//! Reports the running tools, polls the agent's desired-version signal and
//! upgrades when it changes. Exits with code 3 once new tools are active so a
//! supervisor restarts the process on them. The first Ctrl-C stops the run
//! after any in-flight download; a second one abandons it.

use std::future::Future;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use tokio::sync::watch;

use crate::app::AppContext;
use crate::application::services::signal::poll_desired;
use crate::application::services::upgrader::Upgrader;
use crate::domain::config::validate_agent_tag;
use crate::domain::upgrade::{INTERRUPTED_EXIT_CODE, RESTART_EXIT_CODE};
use crate::domain::{AgentIdentity, ConfigError, UpgraderExit};
use crate::infra::fetch::UrlFetcher;
use crate::infra::install::TarballInstaller;
use crate::infra::timer::TokioRetryTimer;

/// Arguments for the agent command.
#[derive(Args, Default)]
pub struct AgentArgs {
    /// Agent tag (defaults to agent.tag / TOOLDIST_AGENT_TAG)
    #[arg(long)]
    pub tag: Option<String>,
}

impl AgentArgs {
    fn identity(&self, app: &AppContext) -> Result<AgentIdentity> {
        let cfg = &app.config.agent;
        let tag = self
            .tag
            .clone()
            .or_else(|| cfg.tag.clone())
            .ok_or(ConfigError::MissingAgentTag)?;
        validate_agent_tag(&tag)?;
        Ok(AgentIdentity {
            tag,
            data_dir: cfg.data_dir.clone(),
            series: cfg.series.clone(),
            arch: cfg.arch.clone(),
        })
    }
}

/// Run `tooldist agent`.
///
/// # Errors
///
/// Returns an error if the agent has no current tools or the upgrade fails
/// with a non-retryable error.
pub async fn run(args: &AgentArgs, app: &AppContext) -> Result<ExitCode> {
    let agent = args.identity(app)?;
    let cfg = &app.config.agent;
    tracing::info!(
        agent = %agent.tag,
        data_dir = %agent.data_dir.display(),
        series = %agent.series,
        arch = %agent.arch,
        "starting agent"
    );

    let (desired_tx, desired_rx) = watch::channel(None);
    let (stop_tx, stop_rx) = watch::channel(false);
    let signal_store = app.primary_store();
    let tag = agent.tag.clone();

    let mut upgrader = Upgrader::new(
        agent,
        app.primary_store(),
        app.catalogs(),
        UrlFetcher::new(app.http_client().clone()),
        TarballInstaller,
        TokioRetryTimer::new(cfg.retry_delay()),
        desired_rx,
        stop_rx,
    );

    let exit = tokio::select! {
        res = upgrader.run() => res.context("upgrader failed")?,
        () = poll_desired(&signal_store, &tag, cfg.poll_interval(), &desired_tx) => {
            anyhow::bail!("desired version poller exited")
        }
        () = forward_interrupts(tokio::signal::ctrl_c, &stop_tx) => {
            tracing::warn!(agent = %tag, "second interrupt; abandoning the run");
            return Ok(ExitCode::from(INTERRUPTED_EXIT_CODE));
        }
    };

    match exit {
        UpgraderExit::Upgraded(outcome) => {
            app.renderer().render_outcome(Some(&outcome))?;
            Ok(ExitCode::from(RESTART_EXIT_CODE))
        }
        UpgraderExit::Stopped => {
            app.renderer().render_outcome(None)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Turn the first interrupt into a stop request and return on the second.
/// Never returns if interrupts cannot be received.
async fn forward_interrupts<F, Fut>(mut interrupted: F, stop: &watch::Sender<bool>)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if interrupted().await.is_err() {
        return std::future::pending().await;
    }
    tracing::info!("interrupt received; stopping (interrupt again to exit now)");
    let _ = stop.send(true);
    if interrupted().await.is_err() {
        std::future::pending::<()>().await;
    }
}
