//! Human-readable terminal renderer.

use owo_colors::OwoColorize as _;
use tooldist_common::{ArtifactDescriptor, Binary, Number};

use crate::domain::UpgradeOutcome;
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the CLI version.
    pub fn render_version(&self, version: &str) {
        println!("tooldist {version}");
    }

    /// Render descriptors found by a lookup, one per line.
    pub fn render_tools(&self, tools: &[ArtifactDescriptor]) {
        if tools.is_empty() {
            self.ctx.warn("no matching tools found");
            return;
        }
        for desc in tools {
            self.print_row(desc);
        }
    }

    /// Render the catalog written by a publish.
    pub fn render_published(&self, namespace: &str, tools: &[ArtifactDescriptor]) {
        if self.ctx.quiet {
            return;
        }
        println!();
        self.ctx.header(&format!("Catalog {namespace}"));
        for desc in tools {
            self.print_row(desc);
        }
        let unresolved = tools.iter().filter(|d| !d.is_resolved()).count();
        if unresolved > 0 {
            self.ctx
                .warn(&format!("{unresolved} tarball(s) have no recorded size or sha256"));
        }
    }

    /// Render a recorded desired version.
    pub fn render_desired(&self, agent_tag: &str, version: &Number, running: Option<&Binary>) {
        self.ctx
            .success(&format!("agent {agent_tag} will upgrade to {version}"));
        match running {
            Some(running) if running.number == *version => {
                self.ctx.kv("running:", &format!("{running} (up to date)"));
            }
            Some(running) => self.ctx.kv("running:", &running.to_string()),
            None => self.ctx.kv("running:", "unknown"),
        }
    }

    /// Render the end of an agent run.
    pub fn render_outcome(&self, outcome: Option<&UpgradeOutcome>) {
        match outcome {
            Some(outcome) => {
                self.ctx.success(&outcome.to_string());
                self.ctx.kv("data dir:", &outcome.data_dir.display().to_string());
            }
            None => self.ctx.kv("agent:", "stopped"),
        }
    }

    fn print_row(&self, desc: &ArtifactDescriptor) {
        let binary = desc.binary().to_string();
        let binary = if desc.version.is_dev() {
            format!("{}", binary.style(self.ctx.styles.dev))
        } else {
            format!("{}", binary.style(self.ctx.styles.version))
        };
        let size = if desc.is_resolved() {
            format_size(desc.size)
        } else {
            "?".to_string()
        };
        let sha = if desc.sha256.is_empty() {
            "-"
        } else {
            desc.sha256.get(..12).unwrap_or(&desc.sha256)
        };
        println!(
            "  {binary:<32} {size:>9}  {}  {}",
            sha.style(self.ctx.styles.dim),
            desc.resolved_url.as_deref().unwrap_or(&desc.path)
        );
    }
}

/// Format a byte count with a binary unit.
fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    #[allow(clippy::cast_precision_loss)]
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
