//! Artifact fetching over `file://` and `http(s)://` URLs.

use std::path::Path;

use futures_util::StreamExt;

use crate::application::ports::{ArtifactFetcher, ByteStream};
use crate::domain::ToolsError;
use crate::infra::fs::file_stream;

/// Open `url` with a GET request. A 404 is [`ToolsError::NotFound`]; any
/// other failure is transient.
///
/// # Errors
///
/// See above.
pub async fn http_get(client: &reqwest::Client, url: &str) -> Result<ByteStream, ToolsError> {
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| ToolsError::io(format!("GET {url}"), std::io::Error::other(e)))?;
    let status = resp.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ToolsError::NotFound(url.to_string()));
    }
    if !status.is_success() {
        return Err(ToolsError::io(
            format!("GET {url}"),
            std::io::Error::other(format!("HTTP {status}")),
        ));
    }
    Ok(Box::pin(resp.bytes_stream().map(|chunk| {
        chunk.map(|b| b.to_vec()).map_err(std::io::Error::other)
    })))
}

/// Open a local file, mapping a missing file to [`ToolsError::NotFound`].
///
/// # Errors
///
/// See above.
pub async fn open_local(path: &Path, what: &str) -> Result<ByteStream, ToolsError> {
    file_stream(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ToolsError::NotFound(what.to_string())
        } else {
            ToolsError::io(format!("opening {}", path.display()), e)
        }
    })
}

/// Production [`ArtifactFetcher`].
pub struct UrlFetcher {
    client: reqwest::Client,
}

impl UrlFetcher {
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl ArtifactFetcher for UrlFetcher {
    async fn fetch(&self, url: &str) -> Result<ByteStream, ToolsError> {
        if let Some(path) = url.strip_prefix("file://") {
            return open_local(Path::new(path), url).await;
        }
        if url.starts_with("http://") || url.starts_with("https://") {
            return http_get(&self.client, url).await;
        }
        Err(ToolsError::Precondition(format!(
            "unsupported artifact URL {url}"
        )))
    }
}
