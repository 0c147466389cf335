//! Domain types and validators for tooldist configuration.
//!
//! Pure functions only. No I/O, no async, no filesystem access.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tooldist_common::series_version;
use tooldist_common::store_keys::DEFAULT_NAMESPACE;

use crate::domain::error::ConfigError;

#[allow(clippy::expect_used)] // Pattern is a compile-time constant
static AGENT_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$").expect("valid regex")
});

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.tooldist/config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Catalog namespace, e.g. `io.tooldist`.
    pub namespace: String,
    /// Primary store. Publishing writes here.
    pub source: SourceConfig,
    /// Extra read-only sources, consulted after `source` in order.
    pub mirrors: Vec<SourceConfig>,
    pub agent: AgentConfig,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            source: SourceConfig::default(),
            mirrors: Vec::new(),
            agent: AgentConfig::default(),
        }
    }
}

/// Where a store lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceConfig {
    /// A directory on the local filesystem.
    Local { path: PathBuf },
    /// A read-only HTTP(S) mirror.
    Http { url: String },
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::Local {
            path: PathBuf::from("tooldist-store"),
        }
    }
}

impl FromStr for SourceConfig {
    type Err = ConfigError;

    /// `http://` and `https://` strings are HTTP sources; anything else is a
    /// local path.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ConfigError::InvalidSource("empty source".to_string()));
        }
        if s.starts_with("http://") || s.starts_with("https://") {
            Ok(Self::Http { url: s.to_string() })
        } else {
            Ok(Self::Local {
                path: PathBuf::from(s),
            })
        }
    }
}

/// Settings of the `agent` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Agent identity. Required to run an agent.
    pub tag: Option<String>,
    pub data_dir: PathBuf,
    pub series: String,
    pub arch: String,
    pub retry_delay_secs: u64,
    pub poll_interval_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            tag: None,
            data_dir: PathBuf::from("/var/lib/tooldist"),
            series: "jammy".to_string(),
            arch: host_arch().to_string(),
            retry_delay_secs: 5,
            poll_interval_secs: 10,
        }
    }
}

impl AgentConfig {
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Map the compile target architecture to its catalog name.
#[must_use]
pub fn host_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "powerpc64" => "ppc64el",
        other => other,
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

impl ToolsConfig {
    /// Validate the whole configuration once after loading.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_namespace(&self.namespace)?;
        validate_source(&self.source)?;
        for mirror in &self.mirrors {
            validate_source(mirror)?;
        }
        if let Some(tag) = &self.agent.tag {
            validate_agent_tag(tag)?;
        }
        if series_version(&self.agent.series).is_err() {
            return Err(ConfigError::UnknownSeries(self.agent.series.clone()));
        }
        if self.agent.arch.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "agent.arch".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.agent.retry_delay_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "agent.retry_delay_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.agent.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "agent.poll_interval_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Primary source followed by the mirrors, in priority order.
    #[must_use]
    pub fn sources(&self) -> Vec<SourceConfig> {
        std::iter::once(self.source.clone())
            .chain(self.mirrors.iter().cloned())
            .collect()
    }
}

/// Validates a catalog namespace.
///
/// # Errors
///
/// Returns an error if the namespace is empty or holds whitespace or `:`.
pub fn validate_namespace(ns: &str) -> Result<(), ConfigError> {
    if ns.is_empty() || ns.contains(':') || ns.chars().any(char::is_whitespace) {
        return Err(ConfigError::InvalidNamespace(ns.to_string()));
    }
    Ok(())
}

/// Validates an agent tag.
///
/// # Errors
///
/// Returns an error if the tag does not match the tag pattern.
pub fn validate_agent_tag(tag: &str) -> Result<(), ConfigError> {
    if !AGENT_TAG_RE.is_match(tag) {
        return Err(ConfigError::InvalidAgentTag(tag.to_string()));
    }
    Ok(())
}

fn validate_source(source: &SourceConfig) -> Result<(), ConfigError> {
    match source {
        SourceConfig::Local { path } if path.as_os_str().is_empty() => {
            Err(ConfigError::InvalidSource("empty local path".to_string()))
        }
        SourceConfig::Http { url }
            if !(url.starts_with("http://") || url.starts_with("https://")) =>
        {
            Err(ConfigError::InvalidSource(format!(
                "{url}: expected an http:// or https:// URL"
            )))
        }
        _ => Ok(()),
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
