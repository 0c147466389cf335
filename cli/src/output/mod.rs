//! Output formatting module

pub mod human;
pub mod json;
pub mod reporter;
pub mod styles;

use console::Term;
use owo_colors::OwoColorize as _;
use tooldist_common::{ArtifactDescriptor, Binary, Number};

use crate::domain::UpgradeOutcome;
pub use human::HumanRenderer;
pub use json::JsonRenderer;
pub use reporter::TerminalReporter;
pub use styles::Styles;

/// Output context carrying styling and terminal state.
pub struct OutputContext {
    /// Stylesheet for colored output.
    pub styles: Styles,
    /// Whether to suppress non-error output.
    pub quiet: bool,
}

impl OutputContext {
    /// Create output context based on CLI flags and environment.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let use_colors = !no_color && is_tty && std::env::var("NO_COLOR").is_err();

        let mut styles = Styles::default();
        if use_colors {
            styles.colorize();
        }

        Self { styles, quiet }
    }

    /// Print a success message prefixed with `✓`. Suppressed when `quiet`.
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "✓".style(self.styles.success));
        }
    }

    /// Print a warning message prefixed with `⚠` to stderr. Suppressed when `quiet`.
    pub fn warn(&self, msg: &str) {
        if !self.quiet {
            eprintln!("  {} {msg}", "⚠".style(self.styles.warning));
        }
    }

    /// Print an error message prefixed with `✗` to stderr. Never suppressed.
    pub fn error(&self, msg: &str) {
        eprintln!("  {} {msg}", "✗".style(self.styles.error));
    }

    /// Print a section header. Suppressed when `quiet`.
    pub fn header(&self, msg: &str) {
        if !self.quiet {
            println!("  {}", msg.style(self.styles.header));
        }
    }

    /// Print a key-value pair with the key dimmed. Suppressed when `quiet`.
    pub fn kv(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {:<14} {value}", key.style(self.styles.dim));
        }
    }
}

/// Renderer for the active output mode.
pub enum Renderer<'a> {
    Human(HumanRenderer<'a>),
    Json(JsonRenderer),
}

impl Renderer<'_> {
    /// Render descriptors found by a lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_tools(&self, tools: &[ArtifactDescriptor]) -> anyhow::Result<()> {
        match self {
            Self::Human(r) => {
                r.render_tools(tools);
                Ok(())
            }
            Self::Json(r) => r.render_tools(tools),
        }
    }

    /// Render the catalog written by a publish.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_published(
        &self,
        namespace: &str,
        tools: &[ArtifactDescriptor],
    ) -> anyhow::Result<()> {
        match self {
            Self::Human(r) => {
                r.render_published(namespace, tools);
                Ok(())
            }
            Self::Json(r) => r.render_published(namespace, tools),
        }
    }

    /// Render a recorded desired version.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_desired(
        &self,
        agent_tag: &str,
        version: &Number,
        running: Option<&Binary>,
    ) -> anyhow::Result<()> {
        match self {
            Self::Human(r) => {
                r.render_desired(agent_tag, version, running);
                Ok(())
            }
            Self::Json(r) => r.render_desired(agent_tag, version, running),
        }
    }

    /// Render the end of an agent run.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_outcome(&self, outcome: Option<&UpgradeOutcome>) -> anyhow::Result<()> {
        match self {
            Self::Human(r) => {
                r.render_outcome(outcome);
                Ok(())
            }
            Self::Json(r) => r.render_outcome(outcome),
        }
    }

    /// Render the CLI version.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_version(&self, version: &str) -> anyhow::Result<()> {
        match self {
            Self::Human(r) => {
                r.render_version(version);
                Ok(())
            }
            Self::Json(r) => r.render_version(version),
        }
    }
}
