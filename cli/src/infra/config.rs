//! Infrastructure implementation of the `ConfigStore` port.
//!
//! The YAML file is read first; `TOOLDIST_AGENT_*` environment variables
//! then override individual agent settings.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::application::ports::ConfigStore;
use crate::domain::config::{AgentConfig, ToolsConfig};

/// Prefix of agent override variables, e.g. `TOOLDIST_AGENT_TAG`.
pub const AGENT_ENV_PREFIX: &str = "TOOLDIST_AGENT_";

/// Production implementation of `ConfigStore` that uses a YAML file on disk.
pub struct YamlConfigStore;

impl ConfigStore for YamlConfigStore {
    fn load(&self) -> Result<ToolsConfig> {
        let path = self.path()?;
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("cannot parse {}", path.display()))?
        } else {
            ToolsConfig::default()
        };
        let overrides: AgentEnv = envy::prefixed(AGENT_ENV_PREFIX)
            .from_env()
            .context("cannot parse TOOLDIST_AGENT_* environment variables")?;
        overrides.apply(&mut config.agent);
        Ok(config)
    }

    fn path(&self) -> Result<PathBuf> {
        if let Ok(val) = std::env::var("TOOLDIST_CONFIG") {
            return Ok(PathBuf::from(val));
        }
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(home.join(".tooldist").join("config.yaml"))
    }
}

/// Agent settings taken from the environment. Unset variables leave the
/// file value alone.
#[derive(Debug, Default, Deserialize)]
pub struct AgentEnv {
    pub tag: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub series: Option<String>,
    pub arch: Option<String>,
    pub retry_delay_secs: Option<u64>,
    pub poll_interval_secs: Option<u64>,
}

impl AgentEnv {
    pub fn apply(self, agent: &mut AgentConfig) {
        if let Some(tag) = self.tag {
            agent.tag = Some(tag);
        }
        if let Some(dir) = self.data_dir {
            agent.data_dir = dir;
        }
        if let Some(series) = self.series {
            agent.series = series;
        }
        if let Some(arch) = self.arch {
            agent.arch = arch;
        }
        if let Some(secs) = self.retry_delay_secs {
            agent.retry_delay_secs = secs;
        }
        if let Some(secs) = self.poll_interval_secs {
            agent.poll_interval_secs = secs;
        }
    }
}
