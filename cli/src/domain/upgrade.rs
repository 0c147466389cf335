//! Agent identity, install layout, and upgrade outcomes.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `tokio`, `std::fs`, `std::process`, or `std::net`.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tooldist_common::{ArtifactDescriptor, Binary};

use crate::domain::constraint::LookupParams;

/// Subdirectory of the data dir holding installed tools.
pub const TOOLS_DIR: &str = "tools";

/// Record written into every unpacked version directory.
pub const DOWNLOADED_TOOLS_FILE: &str = "downloaded-tools.txt";

/// Process exit code telling a supervisor to restart the agent.
pub const RESTART_EXIT_CODE: u8 = 3;

/// Process exit code of an agent abandoned by a second interrupt.
pub const INTERRUPTED_EXIT_CODE: u8 = 130;

/// Who an agent is and where it keeps its tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentIdentity {
    pub tag: String,
    pub data_dir: PathBuf,
    pub series: String,
    pub arch: String,
}

impl AgentIdentity {
    /// Lookup scope matching this agent's platform.
    #[must_use]
    pub fn lookup_params(&self) -> LookupParams {
        LookupParams {
            series: vec![self.series.clone()],
            arches: vec![self.arch.clone()],
        }
    }

    /// The agent's current-tools pointer.
    #[must_use]
    pub fn tools_link(&self) -> PathBuf {
        agent_tools_link(&self.data_dir, &self.tag)
    }
}

/// `<data_dir>/tools`
#[must_use]
pub fn tools_root(data_dir: &Path) -> PathBuf {
    data_dir.join(TOOLS_DIR)
}

/// `<data_dir>/tools/<binary>`
#[must_use]
pub fn version_dir(data_dir: &Path, binary: &Binary) -> PathBuf {
    tools_root(data_dir).join(binary.to_string())
}

/// `<data_dir>/tools/<agent tag>`, a symlink to the active version dir.
#[must_use]
pub fn agent_tools_link(data_dir: &Path, tag: &str) -> PathBuf {
    tools_root(data_dir).join(tag)
}

/// Contents of [`DOWNLOADED_TOOLS_FILE`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledTools {
    pub version: Binary,
    pub url: String,
    pub size: u64,
    pub sha256: String,
}

impl InstalledTools {
    #[must_use]
    pub fn from_descriptor(desc: &ArtifactDescriptor, sha256: &str, size: u64) -> Self {
        Self {
            version: desc.binary(),
            url: desc.resolved_url.clone().unwrap_or_default(),
            size,
            sha256: sha256.to_string(),
        }
    }

    /// Whether this install is the artifact `desc` describes. The digest is
    /// compared only when both sides know it.
    #[must_use]
    pub fn matches(&self, desc: &ArtifactDescriptor) -> bool {
        if self.version != desc.binary() {
            return false;
        }
        desc.sha256.is_empty() || self.sha256.is_empty() || self.sha256 == desc.sha256
    }
}

/// Terminal record of a successful upgrade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpgradeOutcome {
    pub agent_tag: String,
    pub old_tools: Binary,
    pub new_tools: Binary,
    pub data_dir: PathBuf,
}

impl fmt::Display for UpgradeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "must restart: agent {} has upgraded from {} to {}",
            self.agent_tag, self.old_tools, self.new_tools
        )
    }
}

/// How an upgrader run ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgraderExit {
    /// New tools are active; the process should restart.
    Upgraded(UpgradeOutcome),
    /// A stop was requested before any upgrade completed.
    Stopped,
}
