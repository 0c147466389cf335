//! JSON output.
//!
//! Every `--json` code path prints exactly one JSON document to stdout.
//! Failures print the error object from [`format_error`].

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;
use tooldist_common::{ArtifactDescriptor, Binary, Number};

use crate::domain::{ConfigError, ToolsError, UpgradeOutcome};

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Error code for a failure chain: the kind of the first typed error found.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<ToolsError>() {
            return e.kind().code();
        }
        if cause.downcast_ref::<ConfigError>().is_some() {
            return "INVALID_CONFIG";
        }
    }
    "ERROR"
}

/// One descriptor as shown to users: the wire fields plus where it resolves.
#[derive(Debug, Serialize)]
pub struct ToolsView<'a> {
    pub binary: String,
    #[serde(flatten)]
    pub descriptor: &'a ArtifactDescriptor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<&'a str>,
}

impl<'a> From<&'a ArtifactDescriptor> for ToolsView<'a> {
    fn from(desc: &'a ArtifactDescriptor) -> Self {
        Self {
            binary: desc.binary().to_string(),
            descriptor: desc,
            url: desc.resolved_url.as_deref(),
        }
    }
}

#[derive(Serialize)]
struct OutcomeView<'a> {
    upgraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    agent: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    old_tools: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    new_tools: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_dir: Option<&'a PathBuf>,
}

/// Renders domain types as JSON on stdout.
pub struct JsonRenderer;

impl JsonRenderer {
    fn print<T: Serialize>(value: &T) -> Result<()> {
        let out = serde_json::to_string_pretty(value).context("JSON serialization failed")?;
        println!("{out}");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_tools(&self, tools: &[ArtifactDescriptor]) -> Result<()> {
        let views: Vec<ToolsView<'_>> = tools.iter().map(ToolsView::from).collect();
        Self::print(&views)
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_published(&self, namespace: &str, tools: &[ArtifactDescriptor]) -> Result<()> {
        let views: Vec<ToolsView<'_>> = tools.iter().map(ToolsView::from).collect();
        Self::print(&serde_json::json!({
            "namespace": namespace,
            "tools": views,
        }))
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_desired(
        &self,
        agent_tag: &str,
        version: &Number,
        running: Option<&Binary>,
    ) -> Result<()> {
        Self::print(&serde_json::json!({
            "agent": agent_tag,
            "desired_version": version,
            "running_version": running.map(ToString::to_string),
        }))
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_outcome(&self, outcome: Option<&UpgradeOutcome>) -> Result<()> {
        let view = match outcome {
            Some(o) => OutcomeView {
                upgraded: true,
                agent: Some(&o.agent_tag),
                old_tools: Some(o.old_tools.to_string()),
                new_tools: Some(o.new_tools.to_string()),
                data_dir: Some(&o.data_dir),
            },
            None => OutcomeView {
                upgraded: false,
                agent: None,
                old_tools: None,
                new_tools: None,
                data_dir: None,
            },
        };
        Self::print(&view)
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_version(&self, version: &str) -> Result<()> {
        Self::print(&serde_json::json!({ "version": version }))
    }
}
