//! `tooldist publish` — upload tarballs and rebuild the catalog.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use tooldist_common::Binary;
use tooldist_common::store_keys::parse_artifact_name;

use crate::app::AppContext;
use crate::application::ports::ProgressReporter as _;
use crate::infra::fs::file_stream;

/// Arguments for the publish command.
#[derive(Args, Default)]
pub struct PublishArgs {
    /// Tarballs named `tooldist-<version>-<series>-<arch>.tgz`. Without any,
    /// the tarballs already in the store are published.
    pub files: Vec<PathBuf>,

    /// Do not fetch tarballs to fill in missing sizes and digests
    #[arg(long)]
    pub no_resolve: bool,
}

/// Run `tooldist publish`.
///
/// # Errors
///
/// Returns an error if a file name is not a tools tarball name, or if an
/// upload, catalog read, or catalog write fails.
pub async fn run(args: &PublishArgs, app: &AppContext) -> Result<ExitCode> {
    let catalog = app.primary_catalog();
    let reporter = app.reporter();

    let artifacts = if args.files.is_empty() {
        reporter.step("discovering tarballs in store...");
        catalog.discover(&reporter).await?
    } else {
        let mut uploaded = Vec::with_capacity(args.files.len());
        for file in &args.files {
            let binary = binary_of(file)?;
            let length = tokio::fs::metadata(file)
                .await
                .with_context(|| format!("cannot stat {}", file.display()))?
                .len();
            let body = file_stream(file)
                .await
                .with_context(|| format!("cannot open {}", file.display()))?;
            let artifact = catalog
                .upload(&binary, body, length)
                .await
                .with_context(|| format!("uploading {}", file.display()))?;
            reporter.success(&format!("uploaded {}", artifact.version));
            uploaded.push(artifact);
        }
        uploaded
    };

    let published = catalog
        .publish(&artifacts, !args.no_resolve, Utc::now(), &reporter)
        .await
        .context("publishing catalog")?;
    app.renderer()
        .render_published(catalog.namespace(), &published)?;
    Ok(ExitCode::SUCCESS)
}

fn binary_of(file: &Path) -> Result<Binary> {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    parse_artifact_name(&name).with_context(|| {
        format!(
            "{} is not named tooldist-<version>-<series>-<arch>.tgz",
            file.display()
        )
    })
}
