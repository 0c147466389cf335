//! Application service — per-agent upgrade coordinator.
//!
//! Reports the running tools to the agent's store, then watches the
//! desired-version signal. When the two differ it locates the matching
//! tarball, then fetches, verifies and installs it.
//! A successful install ends the run with [`UpgraderExit::Upgraded`]; the
//! owning process restarts itself.
//!
//! Transient failures wait on the injected [`RetryTimer`] and then start
//! over with whatever version is desired by then. A stop request preempts
//! waiting but never an in-flight download or install.

use tokio::sync::watch;
use tooldist_common::{Binary, Number};

use crate::application::ports::{ArtifactFetcher, RetryTimer, Storage, ToolsInstaller};
use crate::application::services::catalog::Catalog;
use crate::application::services::select::select;
use crate::application::services::signal::report_running;
use crate::domain::{
    AgentIdentity, ErrorKind, ToolsConstraint, ToolsError, UpgradeOutcome, UpgraderExit,
};

/// Upgrade coordinator for one agent.
pub struct Upgrader<S, F, I, T> {
    agent: AgentIdentity,
    status: S,
    sources: Vec<Catalog<S>>,
    fetcher: F,
    installer: I,
    timer: T,
    desired: watch::Receiver<Option<Number>>,
    stop: watch::Receiver<bool>,
}

impl<S, F, I, T> Upgrader<S, F, I, T>
where
    S: Storage,
    F: ArtifactFetcher,
    I: ToolsInstaller,
    T: RetryTimer,
{
    /// The running tools are reported to `status`. `sources` are consulted
    /// in priority order. Sending `true` on `stop` requests a stop; dropping
    /// its sender does the same.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        agent: AgentIdentity,
        status: S,
        sources: Vec<Catalog<S>>,
        fetcher: F,
        installer: I,
        timer: T,
        desired: watch::Receiver<Option<Number>>,
        stop: watch::Receiver<bool>,
    ) -> Self {
        Self {
            agent,
            status,
            sources,
            fetcher,
            installer,
            timer,
            desired,
            stop,
        }
    }

    /// Run until the agent is upgraded, a stop is requested, or a fatal
    /// error occurs.
    ///
    /// # Errors
    ///
    /// Returns [`ToolsError::NotFound`] if the agent has no current tools,
    /// and any malformed, precondition, or install error.
    pub async fn run(&mut self) -> Result<UpgraderExit, ToolsError> {
        let current = self.installer.current_tools(&self.agent).await?;
        tracing::info!(agent = %self.agent.tag, %current, "upgrader started");
        if let Err(e) = report_running(&self.status, &self.agent.tag, &current).await {
            tracing::warn!(agent = %self.agent.tag, error = %e, "cannot report running tools");
        }

        let mut desired_open = true;
        loop {
            if *self.stop.borrow_and_update() {
                return Ok(self.stopped());
            }

            let mut retry_pending = false;
            let wanted = self.desired.borrow_and_update().clone();
            if let Some(wanted) = wanted.filter(|w| *w != current.number) {
                match self.attempt(&wanted).await {
                    Ok(Some(new_tools)) => {
                        let outcome = UpgradeOutcome {
                            agent_tag: self.agent.tag.clone(),
                            old_tools: current,
                            new_tools,
                            data_dir: self.agent.data_dir.clone(),
                        };
                        tracing::info!(agent = %self.agent.tag, "{outcome}");
                        return Ok(UpgraderExit::Upgraded(outcome));
                    }
                    Ok(None) => {
                        tracing::info!(
                            agent = %self.agent.tag,
                            version = %wanted,
                            "no matching tools; waiting for desired version to change"
                        );
                    }
                    Err(e) if e.kind() == ErrorKind::Transient => {
                        tracing::warn!(
                            agent = %self.agent.tag,
                            version = %wanted,
                            error = %e,
                            "upgrade attempt failed; will retry"
                        );
                        retry_pending = true;
                    }
                    Err(e) => {
                        tracing::error!(agent = %self.agent.tag, error = %e, "upgrade failed");
                        return Err(e);
                    }
                }
            }

            tokio::select! {
                biased;
                res = self.stop.changed() => {
                    if res.is_err() || *self.stop.borrow() {
                        return Ok(self.stopped());
                    }
                }
                res = self.desired.changed(), if desired_open => {
                    if res.is_err() {
                        desired_open = false;
                    }
                }
                () = self.timer.wait(), if retry_pending => {
                    tracing::debug!(agent = %self.agent.tag, "retrying upgrade");
                }
            }
        }
    }

    fn stopped(&self) -> UpgraderExit {
        tracing::info!(agent = %self.agent.tag, "upgrader stopped");
        UpgraderExit::Stopped
    }

    /// One attempt at reaching `wanted`. `Ok(None)` means no matching tools
    /// exist in any source.
    async fn attempt(&self, wanted: &Number) -> Result<Option<Binary>, ToolsError> {
        let constraint = ToolsConstraint::exact(wanted.clone(), self.agent.lookup_params());
        let Some(desc) = select(&self.sources, &constraint).await?.into_iter().next() else {
            return Ok(None);
        };
        let binary = desc.binary();

        if self.installer.find_unpacked(&self.agent, &desc).await? {
            tracing::info!(agent = %self.agent.tag, %binary, "tools already unpacked");
        } else {
            let url = desc.resolved_url.clone().ok_or_else(|| {
                ToolsError::Precondition(format!("{binary} has no resolved location"))
            })?;
            tracing::info!(agent = %self.agent.tag, %binary, %url, "fetching tools");
            let body = self.fetcher.fetch(&url).await.map_err(|e| {
                if e.is_not_found() {
                    // Listed but unreachable.
                    ToolsError::io(
                        format!("fetching {url}"),
                        std::io::Error::new(std::io::ErrorKind::NotFound, e.to_string()),
                    )
                } else {
                    e
                }
            })?;
            let staged = self.installer.stage(&self.agent, &desc, body).await?;
            self.installer.unpack(&self.agent, &desc, &staged).await?;
        }

        self.installer.activate(&self.agent, &binary).await?;
        Ok(Some(binary))
    }
}
