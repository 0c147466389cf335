//! Application service — the desired-version signal of an agent.
//!
//! The controller writes one version string per agent into the store; agents
//! poll it and publish what they see into a `watch` channel. In the other
//! direction each agent records the binary it runs.

use std::time::Duration;

use tokio::sync::watch;
use tooldist_common::store_keys::{desired_version_key, running_version_key};
use tooldist_common::{Binary, Number};

use crate::application::ports::{StorageReader, StorageWriter};
use crate::application::services::body::{from_bytes, read_all};
use crate::domain::{ErrorKind, ToolsError};

/// The version `agent_tag` should run, or `None` if none was set.
///
/// # Errors
///
/// Returns a malformed error for an unparsable value and propagates store
/// failures other than a missing key.
pub async fn read_desired(
    store: &impl StorageReader,
    agent_tag: &str,
) -> Result<Option<Number>, ToolsError> {
    let key = desired_version_key(agent_tag);
    let body = match store.get(&key).await {
        Ok(body) => body,
        Err(e) if e.is_not_found() => return Ok(None),
        Err(e) => return Err(e),
    };
    let data = read_all(body, &key).await?;
    let text = String::from_utf8_lossy(&data);
    let version = text.trim().parse::<Number>()?;
    Ok(Some(version))
}

/// Record the version `agent_tag` should run.
///
/// # Errors
///
/// Propagates store write failures.
pub async fn set_desired(
    store: &impl StorageWriter,
    agent_tag: &str,
    version: &Number,
) -> Result<(), ToolsError> {
    let data = format!("{version}\n").into_bytes();
    let length = data.len() as u64;
    store
        .put(&desired_version_key(agent_tag), from_bytes(data), length)
        .await?;
    tracing::info!(agent = agent_tag, %version, "desired version set");
    Ok(())
}

/// The binary `agent_tag` last reported running, or `None` if it never did.
///
/// # Errors
///
/// Returns a malformed error for an unparsable value and propagates store
/// failures other than a missing key.
pub async fn read_running(
    store: &impl StorageReader,
    agent_tag: &str,
) -> Result<Option<Binary>, ToolsError> {
    let key = running_version_key(agent_tag);
    let body = match store.get(&key).await {
        Ok(body) => body,
        Err(e) if e.is_not_found() => return Ok(None),
        Err(e) => return Err(e),
    };
    let data = read_all(body, &key).await?;
    Ok(Some(String::from_utf8_lossy(&data).trim().parse::<Binary>()?))
}

/// Record that `agent_tag` runs `binary`.
///
/// # Errors
///
/// Propagates store write failures.
pub async fn report_running(
    store: &impl StorageWriter,
    agent_tag: &str,
    binary: &Binary,
) -> Result<(), ToolsError> {
    let data = format!("{binary}\n").into_bytes();
    let length = data.len() as u64;
    store
        .put(&running_version_key(agent_tag), from_bytes(data), length)
        .await?;
    tracing::debug!(agent = agent_tag, %binary, "running version reported");
    Ok(())
}

/// Poll the signal every `interval` and publish changes into `tx`.
///
/// Read failures are logged and the previous value is kept. Returns once
/// every receiver has been dropped.
pub async fn poll_desired(
    store: &impl StorageReader,
    agent_tag: &str,
    interval: Duration,
    tx: &watch::Sender<Option<Number>>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            () = tx.closed() => return,
            _ = ticker.tick() => {}
        }
        match read_desired(store, agent_tag).await {
            Ok(version) => {
                tx.send_if_modified(|current| {
                    if *current == version {
                        return false;
                    }
                    tracing::info!(
                        agent = agent_tag,
                        desired = ?version.as_ref().map(ToString::to_string),
                        "desired version changed"
                    );
                    *current = version;
                    true
                });
            }
            Err(e) if e.kind() == ErrorKind::Transient => {
                tracing::warn!(agent = agent_tag, error = %e, "cannot read desired version");
            }
            Err(e) => {
                tracing::error!(agent = agent_tag, error = %e, "invalid desired version");
            }
        }
    }
}
