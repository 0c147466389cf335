//! Application service — reading, resolving, and publishing a tools catalog.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! All I/O is routed through the injected store.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use tokio::sync::oneshot;
use tooldist_common::store_keys::{
    INDEX_PATH, RELEASES_DIR, artifact_path, parse_artifact_name, tools_key,
};
use tooldist_common::{Artifact, ArtifactDescriptor, Binary, IndexDocument, decode_index, decode_products};

use crate::application::ports::{ByteStream, ProgressReporter, StorageReader, StorageWriter};
use crate::application::services::body::{from_bytes, read_all};
use crate::domain::digest::DigestCounter;
use crate::domain::{ToolsError, check_listing, encode_catalog, from_artifacts, merge};

/// Pass `body` through unchanged, sending its size and digest on `done`
/// once it is exhausted.
fn counted(body: ByteStream, done: oneshot::Sender<(u64, String)>) -> ByteStream {
    Box::pin(futures_util::stream::unfold(
        (body, DigestCounter::new(), Some(done)),
        |(mut body, mut counter, mut done)| async move {
            match body.next().await {
                Some(Ok(chunk)) => {
                    counter.update(&chunk);
                    Some((Ok(chunk), (body, counter, done)))
                }
                Some(Err(e)) => Some((Err(e), (body, counter, done))),
                None => {
                    if let Some(tx) = done.take() {
                        let _ = tx.send(counter.finish());
                    }
                    None
                }
            }
        },
    ))
}

/// The catalog of one namespace in one store.
pub struct Catalog<S> {
    store: S,
    namespace: String,
}

impl<S> Catalog<S> {
    pub fn new(store: S, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

// ── Read side ─────────────────────────────────────────────────────────────────

impl<S: StorageReader> Catalog<S> {
    /// Location of a catalog-relative path in this store.
    pub fn locate(&self, path: &str) -> String {
        self.store.url(&tools_key(path))
    }

    /// The index document, or `None` if the store has no catalog.
    ///
    /// # Errors
    ///
    /// Propagates every failure other than a missing index.
    pub async fn read_index(&self) -> Result<Option<IndexDocument>, ToolsError> {
        let body = match self.store.get(&tools_key(INDEX_PATH)).await {
            Ok(body) => body,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };
        let data = read_all(body, INDEX_PATH).await?;
        decode_index(&data)
            .map(Some)
            .map_err(|e| ToolsError::stream(INDEX_PATH, &e))
    }

    /// Every descriptor in the catalog. A store without an index yields an
    /// empty catalog.
    ///
    /// # Errors
    ///
    /// Propagates read and decode failures, including a listing the index
    /// names but the store lacks.
    pub async fn read(&self) -> Result<Vec<ArtifactDescriptor>, ToolsError> {
        self.read_products(None).await
    }

    /// Descriptors of the given product streams only. `None` reads all.
    ///
    /// # Errors
    ///
    /// See [`Catalog::read`].
    pub async fn read_products(
        &self,
        products: Option<&BTreeSet<String>>,
    ) -> Result<Vec<ArtifactDescriptor>, ToolsError> {
        let Some(index) = self.read_index().await? else {
            tracing::debug!(namespace = %self.namespace, "no catalog index");
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        for (id, product) in &index.products {
            if products.is_some_and(|wanted| !wanted.contains(id)) {
                continue;
            }
            let body = self
                .store
                .get(&tools_key(&product.path))
                .await
                .map_err(|e| {
                    if e.is_not_found() {
                        ToolsError::malformed(
                            "catalog",
                            format!("index names missing listing {}", product.path),
                        )
                    } else {
                        e
                    }
                })?;
            let data = read_all(body, &product.path).await?;
            let doc =
                decode_products(&data).map_err(|e| ToolsError::stream(&product.path, &e))?;
            check_listing(&doc, &self.namespace, id, &product.path)?;
            out.extend(doc.items.into_iter().map(|mut d| {
                d.resolved_url = Some(self.locate(&d.path));
                d
            }));
        }
        tracing::debug!(namespace = %self.namespace, count = out.len(), "read catalog");
        Ok(out)
    }

    /// Fill in size and digest of every unresolved descriptor by streaming
    /// its tarball from the store once.
    ///
    /// Returns a new list only when every descriptor resolved.
    ///
    /// # Errors
    ///
    /// Propagates the first fetch failure.
    pub async fn resolve_missing(
        &self,
        descriptors: &[ArtifactDescriptor],
    ) -> Result<Vec<ArtifactDescriptor>, ToolsError> {
        let mut out = Vec::with_capacity(descriptors.len());
        for desc in descriptors {
            if desc.is_resolved() {
                out.push(desc.clone());
                continue;
            }
            tracing::info!(binary = %desc.binary(), "resolving size and sha256");
            let mut body = self.store.get(&tools_key(&desc.path)).await?;
            let mut counter = DigestCounter::new();
            while let Some(chunk) = body.next().await {
                let chunk =
                    chunk.map_err(|e| ToolsError::io(format!("reading {}", desc.path), e))?;
                counter.update(&chunk);
            }
            let (size, sha256) = counter.finish();
            out.push(ArtifactDescriptor {
                size,
                sha256,
                ..desc.clone()
            });
        }
        Ok(out)
    }

    /// Known artifacts present under `releases/`. Files whose names do not
    /// parse as a binary version are skipped.
    ///
    /// # Errors
    ///
    /// Propagates listing failures.
    pub async fn discover(&self, reporter: &impl ProgressReporter) -> Result<Vec<Artifact>, ToolsError> {
        let prefix = format!("{}/", tools_key(RELEASES_DIR));
        let mut found = Vec::new();
        for key in self.store.list(&prefix).await? {
            match parse_artifact_name(&key) {
                Some(version) => found.push(Artifact {
                    url: self.store.url(&key),
                    ..Artifact::unresolved(version)
                }),
                None => {
                    tracing::warn!(key, "skipping unrecognised file in releases");
                    reporter.warn(&format!("skipping {key}: not a tools tarball"));
                }
            }
        }
        Ok(found)
    }
}

// ── Write side ────────────────────────────────────────────────────────────────

impl<S: StorageReader + StorageWriter> Catalog<S> {
    /// Persist a catalog: every listing, then the index.
    ///
    /// # Errors
    ///
    /// Returns the first encode or write failure. Listings already written
    /// stay in place.
    pub async fn write(
        &self,
        descriptors: &[ArtifactDescriptor],
        updated: DateTime<Utc>,
    ) -> Result<(), ToolsError> {
        for file in encode_catalog(&self.namespace, descriptors, updated)? {
            let length = file.data.len() as u64;
            tracing::debug!(path = %file.path, length, "writing catalog document");
            self.store
                .put(&tools_key(&file.path), from_bytes(file.data), length)
                .await?;
        }
        Ok(())
    }

    /// Store a tarball under `releases/`, computing its size and digest on
    /// the way through.
    ///
    /// # Errors
    ///
    /// Returns a write failure, or a size mismatch if `body` did not yield
    /// `length` bytes.
    pub async fn upload(
        &self,
        binary: &Binary,
        body: ByteStream,
        length: u64,
    ) -> Result<Artifact, ToolsError> {
        let key = tools_key(&artifact_path(binary));
        let (digest_tx, digest_rx) = oneshot::channel();
        self.store.put(&key, counted(body, digest_tx), length).await?;

        let (size, sha256) = digest_rx.await.map_err(|_| {
            ToolsError::Precondition(format!("store stopped reading the body of {binary}"))
        })?;
        if size != length {
            return Err(ToolsError::SizeMismatch {
                artifact: binary.to_string(),
                expected: length,
                actual: size,
            });
        }
        tracing::info!(%binary, size, %sha256, "uploaded tools");
        Ok(Artifact {
            version: binary.clone(),
            url: self.store.url(&key),
            size,
            sha256,
        })
    }

    /// One publish cycle: read, merge the new artifacts in, optionally
    /// resolve missing digests, and write the result back.
    ///
    /// This is the only write path of the catalog. Callers serialize
    /// publishers per namespace.
    ///
    /// # Errors
    ///
    /// Propagates read, resolve, and write failures. Nothing is written if
    /// reading or resolving fails.
    pub async fn publish(
        &self,
        artifacts: &[Artifact],
        resolve: bool,
        updated: DateTime<Utc>,
        reporter: &impl ProgressReporter,
    ) -> Result<Vec<ArtifactDescriptor>, ToolsError> {
        reporter.step("reading existing catalog...");
        let old = self.read().await?;
        let mut merged = merge(from_artifacts(artifacts), old);

        if resolve {
            let missing = merged.iter().filter(|d| !d.is_resolved()).count();
            if missing > 0 {
                reporter.step(&format!("resolving {missing} unresolved tarball(s)..."));
                merged = self.resolve_missing(&merged).await?;
            }
        }

        reporter.step("writing catalog...");
        self.write(&merged, updated).await?;
        reporter.success(&format!(
            "published {} tools to {}",
            merged.len(),
            self.namespace
        ));
        tracing::info!(namespace = %self.namespace, count = merged.len(), "catalog published");
        Ok(merged)
    }
}
