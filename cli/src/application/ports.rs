//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` — never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::PathBuf;
use std::pin::Pin;

use anyhow::Result;
use futures_util::Stream;
use tooldist_common::{ArtifactDescriptor, Binary};

use crate::domain::{AgentIdentity, ToolsConfig, ToolsError};

// ── Value Types ───────────────────────────────────────────────────────────────

/// A streamed body. Chunks arrive in order; an `Err` ends the stream.
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Vec<u8>>> + Send>>;

/// An artifact written to a staging location and verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedArtifact {
    pub path: PathBuf,
    pub size: u64,
    pub sha256: String,
}

// ── Storage Ports ─────────────────────────────────────────────────────────────

/// Read side of a shared store.
#[allow(async_fn_in_trait)]
pub trait StorageReader {
    /// Open the object at `key`. A missing object is [`ToolsError::NotFound`].
    async fn get(&self, key: &str) -> Result<ByteStream, ToolsError>;
    /// Keys of all objects whose key starts with `prefix`, sorted.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, ToolsError>;
    /// Location from which `key` can be fetched by an agent.
    fn url(&self, key: &str) -> String;
}

/// Write side of a shared store.
#[allow(async_fn_in_trait)]
pub trait StorageWriter {
    /// Store `length` bytes from `body` at `key`, replacing any prior object.
    async fn put(&self, key: &str, body: ByteStream, length: u64) -> Result<(), ToolsError>;
}

/// Composite trait — any type that can both read and write is a `Storage`.
pub trait Storage: StorageReader + StorageWriter {}

/// Blanket implementation: any reader + writer is a `Storage`.
impl<T> Storage for T where T: StorageReader + StorageWriter {}

// ── Agent Ports ───────────────────────────────────────────────────────────────

/// Opens artifact bodies by resolved URL.
#[allow(async_fn_in_trait)]
pub trait ArtifactFetcher {
    async fn fetch(&self, url: &str) -> Result<ByteStream, ToolsError>;
}

/// The wait between a transient failure and the next attempt.
#[allow(async_fn_in_trait)]
pub trait RetryTimer {
    /// Resolve when the next attempt is due.
    async fn wait(&self);
}

/// Local install area of an agent.
#[allow(async_fn_in_trait)]
pub trait ToolsInstaller {
    /// Binary version the agent's current pointer selects.
    /// A missing pointer is [`ToolsError::NotFound`].
    async fn current_tools(&self, agent: &AgentIdentity) -> Result<Binary, ToolsError>;

    /// Whether `desc` is already unpacked locally.
    async fn find_unpacked(
        &self,
        agent: &AgentIdentity,
        desc: &ArtifactDescriptor,
    ) -> Result<bool, ToolsError>;

    /// Stream `body` to a staging file, verifying size and digest against
    /// `desc` where recorded. Mismatches are transient errors.
    async fn stage(
        &self,
        agent: &AgentIdentity,
        desc: &ArtifactDescriptor,
        body: ByteStream,
    ) -> Result<StagedArtifact, ToolsError>;

    /// Unpack a staged artifact into its version directory. Idempotent.
    async fn unpack(
        &self,
        agent: &AgentIdentity,
        desc: &ArtifactDescriptor,
        staged: &StagedArtifact,
    ) -> Result<(), ToolsError>;

    /// Point the agent's current pointer at `binary`. Idempotent.
    async fn activate(&self, agent: &AgentIdentity, binary: &Binary) -> Result<(), ToolsError>;
}

// ── Presentation Ports ────────────────────────────────────────────────────────

/// Abstracts progress reporting so services don't depend on the output layer.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

// ── Config Port ───────────────────────────────────────────────────────────────

/// Abstracts loading the configuration file.
pub trait ConfigStore {
    /// Load the configuration, returning defaults if no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    fn load(&self) -> Result<ToolsConfig>;

    /// Path of the configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    fn path(&self) -> Result<PathBuf>;
}
