//! Application context — unified state passed to every command handler.
//!
//! `AppContext` is built once from the top-level flags and the validated
//! configuration; command handlers never load configuration themselves.

use anyhow::{Context, Result};

use crate::application::ports::ConfigStore;
use crate::application::services::catalog::Catalog;
use crate::domain::{SourceConfig, ToolsConfig};
use crate::infra::config::YamlConfigStore;
use crate::infra::store::AnyStore;
use crate::output::{HumanRenderer, JsonRenderer, OutputContext, Renderer, TerminalReporter};

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Output rendering options.
    pub output: OutputFlags,
    /// Replaces the configured primary source.
    pub store: Option<String>,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// Validated configuration. Never mutated after construction.
    pub config: ToolsConfig,
    client: reqwest::Client,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags and the config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or is invalid.
    pub fn new(flags: &AppFlags) -> Result<Self> {
        let config = YamlConfigStore.load()?;
        Self::with_config(flags, config)
    }

    /// Construct an `AppContext` around an already loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the `--store` override or the resulting
    /// configuration is invalid, or the HTTP client cannot be built.
    pub fn with_config(flags: &AppFlags, mut config: ToolsConfig) -> Result<Self> {
        if let Some(store) = &flags.store {
            config.source = store
                .parse::<SourceConfig>()
                .context("invalid --store")?;
        }
        config.validate().context("invalid configuration")?;

        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };
        let client = reqwest::Client::builder()
            .user_agent(concat!("tooldist/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("cannot build HTTP client")?;

        Ok(Self {
            output: OutputContext::new(flags.output.no_color, flags.output.quiet),
            mode,
            config,
            client,
        })
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Returns the appropriate `Renderer` variant for the current output mode.
    #[must_use]
    pub fn renderer(&self) -> Renderer<'_> {
        match self.mode {
            OutputMode::Human => Renderer::Human(HumanRenderer::new(&self.output)),
            OutputMode::Json => Renderer::Json(JsonRenderer),
        }
    }

    /// Progress reporter for application services.
    #[must_use]
    pub fn reporter(&self) -> TerminalReporter<'_> {
        TerminalReporter::new(&self.output, self.is_json())
    }

    #[must_use]
    pub fn http_client(&self) -> &reqwest::Client {
        &self.client
    }

    /// The primary store: publish target and desired-version signal home.
    #[must_use]
    pub fn primary_store(&self) -> AnyStore {
        AnyStore::from_config(&self.config.source, &self.client)
    }

    /// Catalog of the primary store.
    #[must_use]
    pub fn primary_catalog(&self) -> Catalog<AnyStore> {
        Catalog::new(self.primary_store(), &self.config.namespace)
    }

    /// Catalogs of every configured source, in priority order.
    #[must_use]
    pub fn catalogs(&self) -> Vec<Catalog<AnyStore>> {
        self.config
            .sources()
            .iter()
            .map(|s| Catalog::new(AnyStore::from_config(s, &self.client), &self.config.namespace))
            .collect()
    }
}
