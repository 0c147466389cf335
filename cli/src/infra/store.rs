//! Store implementations of the `StorageReader` / `StorageWriter` ports.
//!
//! `DirStore` keeps objects as files under a root directory and writes them
//! atomically (temp file + rename). `HttpStore` is a read-only mirror.

use std::path::{Component, Path, PathBuf};

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::application::ports::{ByteStream, StorageReader, StorageWriter};
use crate::domain::{SourceConfig, ToolsError};
use crate::infra::fetch::{http_get, open_local};

/// Prefix of in-progress files; never listed.
const TEMP_PREFIX: &str = ".tmp-";

// ── Directory store ──────────────────────────────────────────────────────────

/// A store rooted at a local directory.
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// Create a store at `root`. Relative roots are made absolute so that
    /// URLs handed out stay valid from any working directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key to a path under the root. Keys are `/`-separated and may not
    /// escape the root.
    fn resolve(&self, key: &str) -> Result<PathBuf, ToolsError> {
        let rel = Path::new(key);
        let valid = !key.is_empty()
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(ToolsError::Precondition(format!("invalid store key {key:?}")));
        }
        Ok(self.root.join(rel))
    }
}

impl StorageReader for DirStore {
    async fn get(&self, key: &str) -> Result<ByteStream, ToolsError> {
        let path = self.resolve(key)?;
        open_local(&path, key).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, ToolsError> {
        let root = self.root.clone();
        let prefix = prefix.to_string();
        tokio::task::spawn_blocking(move || {
            let mut keys = Vec::new();
            walk(&root, &root, &mut keys)?;
            keys.retain(|k| k.starts_with(&prefix));
            keys.sort();
            Ok(keys)
        })
        .await
        .map_err(|e| ToolsError::io("listing store", std::io::Error::other(e)))?
    }

    fn url(&self, key: &str) -> String {
        format!("file://{}", self.root.join(key).display())
    }
}

fn walk(root: &Path, dir: &Path, keys: &mut Vec<String>) -> Result<(), ToolsError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(ToolsError::io(format!("listing {}", dir.display()), e)),
    };
    for entry in entries {
        let entry = entry.map_err(|e| ToolsError::io(format!("listing {}", dir.display()), e))?;
        let path = entry.path();
        if entry.file_name().to_string_lossy().starts_with(TEMP_PREFIX) {
            continue;
        }
        if path.is_dir() {
            walk(root, &path, keys)?;
        } else if let Ok(rel) = path.strip_prefix(root) {
            let key: Vec<_> = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            keys.push(key.join("/"));
        }
    }
    Ok(())
}

impl StorageWriter for DirStore {
    async fn put(&self, key: &str, mut body: ByteStream, length: u64) -> Result<(), ToolsError> {
        let path = self.resolve(key)?;
        let parent = path
            .parent()
            .ok_or_else(|| ToolsError::Precondition(format!("invalid store key {key:?}")))?;
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ToolsError::io(format!("creating {}", parent.display()), e))?;

        let temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(parent)
            .map_err(|e| ToolsError::io(format!("creating temp file in {}", parent.display()), e))?;
        let std_file = temp
            .reopen()
            .map_err(|e| ToolsError::io(format!("opening {}", temp.path().display()), e))?;
        let mut file = tokio::fs::File::from_std(std_file);

        let mut written = 0u64;
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| ToolsError::io(format!("reading body for {key}"), e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| ToolsError::io(format!("writing {key}"), e))?;
            written += chunk.len() as u64;
        }
        file.sync_all()
            .await
            .map_err(|e| ToolsError::io(format!("syncing {key}"), e))?;
        drop(file);

        if written != length {
            return Err(ToolsError::SizeMismatch {
                artifact: key.to_string(),
                expected: length,
                actual: written,
            });
        }
        temp.persist(&path)
            .map_err(|e| ToolsError::io(format!("finalizing {key}"), e.error))?;
        tracing::debug!(key, length, "stored object");
        Ok(())
    }
}

// ── HTTP store ───────────────────────────────────────────────────────────────

/// A read-only store served over HTTP(S).
pub struct HttpStore {
    base: String,
    client: reqwest::Client,
}

impl HttpStore {
    #[must_use]
    pub fn new(base: &str, client: reqwest::Client) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            client,
        }
    }
}

impl StorageReader for HttpStore {
    async fn get(&self, key: &str) -> Result<ByteStream, ToolsError> {
        http_get(&self.client, &self.url(key)).await
    }

    async fn list(&self, _prefix: &str) -> Result<Vec<String>, ToolsError> {
        Err(ToolsError::Precondition(format!(
            "cannot list objects of HTTP store {}",
            self.base
        )))
    }

    fn url(&self, key: &str) -> String {
        format!("{}/{key}", self.base)
    }
}

// ── Configured store ─────────────────────────────────────────────────────────

/// The store a [`SourceConfig`] names.
pub enum AnyStore {
    Dir(DirStore),
    Http(HttpStore),
}

impl AnyStore {
    #[must_use]
    pub fn from_config(source: &SourceConfig, client: &reqwest::Client) -> Self {
        match source {
            SourceConfig::Local { path } => Self::Dir(DirStore::new(path.clone())),
            SourceConfig::Http { url } => Self::Http(HttpStore::new(url, client.clone())),
        }
    }
}

impl StorageReader for AnyStore {
    async fn get(&self, key: &str) -> Result<ByteStream, ToolsError> {
        match self {
            Self::Dir(s) => s.get(key).await,
            Self::Http(s) => s.get(key).await,
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, ToolsError> {
        match self {
            Self::Dir(s) => s.list(prefix).await,
            Self::Http(s) => s.list(prefix).await,
        }
    }

    fn url(&self, key: &str) -> String {
        match self {
            Self::Dir(s) => s.url(key),
            Self::Http(s) => s.url(key),
        }
    }
}

impl StorageWriter for AnyStore {
    async fn put(&self, key: &str, body: ByteStream, length: u64) -> Result<(), ToolsError> {
        match self {
            Self::Dir(s) => s.put(key, body, length).await,
            Self::Http(s) => Err(ToolsError::Precondition(format!(
                "HTTP store {} is read-only",
                s.base
            ))),
        }
    }
}
