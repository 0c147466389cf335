//! Local tools install area — implements the `ToolsInstaller` port.
//!
//! Layout under `<data_dir>/tools/`:
//! - `<binary>/` unpacked tarball plus `downloaded-tools.txt`
//! - `<agent tag>` symlink to `<binary>`, the agent's current tools
//!
//! Every step that makes something visible is a rename, so a crash leaves
//! either the old state or the new one plus stray `.tmp-*` entries.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tooldist_common::{ArtifactDescriptor, Binary};

use crate::application::ports::{ByteStream, StagedArtifact, ToolsInstaller};
use crate::domain::digest::DigestCounter;
use crate::domain::upgrade::{DOWNLOADED_TOOLS_FILE, tools_root, version_dir};
use crate::domain::{AgentIdentity, InstalledTools, ToolsError};

/// Prefix of staged downloads in the tools root.
const DOWNLOAD_PREFIX: &str = ".tmp-download-";

/// Staged downloads untouched for this long belong to a dead run.
const STALE_DOWNLOAD_AGE: Duration = Duration::from_secs(60 * 60);

/// Production `ToolsInstaller` backed by the agent's data directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct TarballInstaller;

impl TarballInstaller {
    async fn read_installed(dir: &Path) -> Option<InstalledTools> {
        let data = tokio::fs::read(dir.join(DOWNLOADED_TOOLS_FILE)).await.ok()?;
        serde_json::from_slice(&data).ok()
    }
}

impl ToolsInstaller for TarballInstaller {
    async fn current_tools(&self, agent: &AgentIdentity) -> Result<Binary, ToolsError> {
        let link = agent.tools_link();
        let target = match read_pointer(&link).await {
            Ok(target) => target,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ToolsError::NotFound(format!(
                    "current tools of agent {} ({})",
                    agent.tag,
                    link.display()
                )));
            }
            Err(e) => {
                return Err(ToolsError::install(format!("reading {}", link.display()), e));
            }
        };
        Ok(target.parse::<Binary>()?)
    }

    async fn find_unpacked(
        &self,
        agent: &AgentIdentity,
        desc: &ArtifactDescriptor,
    ) -> Result<bool, ToolsError> {
        let dir = version_dir(&agent.data_dir, &desc.binary());
        Ok(Self::read_installed(&dir)
            .await
            .is_some_and(|installed| installed.matches(desc)))
    }

    async fn stage(
        &self,
        agent: &AgentIdentity,
        desc: &ArtifactDescriptor,
        mut body: ByteStream,
    ) -> Result<StagedArtifact, ToolsError> {
        let root = tools_root(&agent.data_dir);
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| ToolsError::install(format!("creating {}", root.display()), e))?;
        remove_stale_downloads(&root).await;
        let temp = tempfile::Builder::new()
            .prefix(DOWNLOAD_PREFIX)
            .tempfile_in(&root)
            .map_err(|e| ToolsError::install(format!("staging in {}", root.display()), e))?;
        let std_file = temp
            .reopen()
            .map_err(|e| ToolsError::install(format!("opening {}", temp.path().display()), e))?;
        let mut file = tokio::fs::File::from_std(std_file);

        let binary = desc.binary();
        let mut counter = DigestCounter::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| ToolsError::io(format!("downloading {binary}"), e))?;
            counter.update(&chunk);
            file.write_all(&chunk)
                .await
                .map_err(|e| ToolsError::install(format!("writing {}", temp.path().display()), e))?;
        }
        file.sync_all()
            .await
            .map_err(|e| ToolsError::install(format!("syncing {}", temp.path().display()), e))?;
        drop(file);

        let (size, sha256) = counter.finish();
        if desc.size > 0 && size != desc.size {
            return Err(ToolsError::SizeMismatch {
                artifact: binary.to_string(),
                expected: desc.size,
                actual: size,
            });
        }
        if !desc.sha256.is_empty() && sha256 != desc.sha256 {
            return Err(ToolsError::ChecksumMismatch {
                artifact: binary.to_string(),
                expected: desc.sha256.clone(),
                actual: sha256,
            });
        }

        let path = temp
            .into_temp_path()
            .keep()
            .map_err(|e| ToolsError::install("keeping staged download", e.error))?;
        tracing::debug!(%binary, size, path = %path.display(), "staged tools");
        Ok(StagedArtifact { path, size, sha256 })
    }

    async fn unpack(
        &self,
        agent: &AgentIdentity,
        desc: &ArtifactDescriptor,
        staged: &StagedArtifact,
    ) -> Result<(), ToolsError> {
        let target = version_dir(&agent.data_dir, &desc.binary());
        let installed = InstalledTools::from_descriptor(desc, &staged.sha256, staged.size);

        let done = Self::read_installed(&target)
            .await
            .is_some_and(|existing| existing.matches(desc));
        let unpacked = if done {
            Ok(())
        } else {
            let root = tools_root(&agent.data_dir);
            let archive = staged.path.clone();
            let dest = target.clone();
            tokio::task::spawn_blocking(move || unpack_into(&root, &archive, &dest, &installed))
                .await
                .map_err(|e| ToolsError::install("unpack task", std::io::Error::other(e)))
                .and_then(|res| res)
        };

        // The staged file goes on every exit; a retry downloads afresh.
        let removed = match tokio::fs::remove_file(&staged.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ToolsError::install(
                format!("removing {}", staged.path.display()),
                e,
            )),
        };
        unpacked?;
        if !done {
            tracing::info!(binary = %desc.binary(), dir = %target.display(), "unpacked tools");
        }
        removed
    }

    async fn activate(&self, agent: &AgentIdentity, binary: &Binary) -> Result<(), ToolsError> {
        let dir = version_dir(&agent.data_dir, binary);
        if !tokio::fs::try_exists(&dir).await.unwrap_or(false) {
            return Err(ToolsError::Precondition(format!(
                "tools {binary} are not unpacked in {}",
                dir.display()
            )));
        }
        let link = agent.tools_link();
        let wanted = binary.to_string();
        if read_pointer(&link).await.is_ok_and(|current| current == wanted) {
            return Ok(());
        }
        let temp = tools_root(&agent.data_dir).join(format!(".tmp-link-{}", agent.tag));
        let _ = tokio::fs::remove_file(&temp).await;
        write_pointer(&temp, &wanted)
            .await
            .map_err(|e| ToolsError::install(format!("creating {}", temp.display()), e))?;
        tokio::fs::rename(&temp, &link)
            .await
            .map_err(|e| ToolsError::install(format!("replacing {}", link.display()), e))?;
        tracing::info!(agent = %agent.tag, %binary, "activated tools");
        Ok(())
    }
}

/// Unpack `archive` into a fresh directory next to `dest`, record the
/// install, and rename it into place.
fn unpack_into(
    root: &Path,
    archive: &Path,
    dest: &Path,
    installed: &InstalledTools,
) -> Result<(), ToolsError> {
    let temp = tempfile::Builder::new()
        .prefix(".tmp-unpack-")
        .tempdir_in(root)
        .map_err(|e| ToolsError::install(format!("creating temp dir in {}", root.display()), e))?;

    let file = std::fs::File::open(archive)
        .map_err(|e| ToolsError::install(format!("opening {}", archive.display()), e))?;
    tar::Archive::new(flate2::read::GzDecoder::new(file))
        .unpack(temp.path())
        .map_err(|e| ToolsError::io(format!("unpacking {}", installed.version), e))?;

    let record = serde_json::to_vec(installed)
        .map_err(|e| ToolsError::install("encoding install record", std::io::Error::other(e)))?;
    std::fs::write(temp.path().join(DOWNLOADED_TOOLS_FILE), record)
        .map_err(|e| ToolsError::install("writing install record", e))?;

    if dest.exists() {
        std::fs::remove_dir_all(dest)
            .map_err(|e| ToolsError::install(format!("removing stale {}", dest.display()), e))?;
    }
    let unpacked: PathBuf = temp.keep();
    std::fs::rename(&unpacked, dest).map_err(|e| {
        let _ = std::fs::remove_dir_all(&unpacked);
        ToolsError::install(format!("renaming into {}", dest.display()), e)
    })
}

/// Remove staged downloads left behind by runs that died mid-install.
async fn remove_stale_downloads(root: &Path) {
    let Ok(mut entries) = tokio::fs::read_dir(root).await else {
        return;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        if !entry.file_name().to_string_lossy().starts_with(DOWNLOAD_PREFIX) {
            continue;
        }
        let stale = entry
            .metadata()
            .await
            .ok()
            .and_then(|m| m.modified().ok())
            .and_then(|t| t.elapsed().ok())
            .is_some_and(|age| age >= STALE_DOWNLOAD_AGE);
        if !stale {
            continue;
        }
        let path = entry.path();
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::debug!(path = %path.display(), "removed stale download"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "cannot remove stale download"),
        }
    }
}

// ── Current pointer ──────────────────────────────────────────────────────────

#[cfg(unix)]
async fn read_pointer(link: &Path) -> std::io::Result<String> {
    let target = tokio::fs::read_link(link).await?;
    Ok(target.to_string_lossy().into_owned())
}

#[cfg(unix)]
async fn write_pointer(at: &Path, target: &str) -> std::io::Result<()> {
    tokio::fs::symlink(target, at).await
}

#[cfg(not(unix))]
async fn read_pointer(link: &Path) -> std::io::Result<String> {
    Ok(tokio::fs::read_to_string(link).await?.trim().to_string())
}

#[cfg(not(unix))]
async fn write_pointer(at: &Path, target: &str) -> std::io::Result<()> {
    tokio::fs::write(at, target).await
}
