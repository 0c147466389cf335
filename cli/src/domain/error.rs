//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use thiserror::Error;
use tooldist_common::{StreamError, VersionError};

// ── Tools errors ──────────────────────────────────────────────────────────────

/// Classification of a [`ToolsError`]; callers branch on this, never on
/// message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Catalog, index, artifact or signal absent.
    NotFound,
    /// Network or storage failure while fetching; worth retrying.
    Transient,
    /// Unparsable version string or catalog record.
    Malformed,
    /// Operation invoked with arguments it cannot work with.
    Precondition,
    /// Local failure that leaves nothing sensible to retry.
    Fatal,
}

impl ErrorKind {
    /// Stable code used in machine-readable error output.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Transient => "TRANSIENT",
            Self::Malformed => "MALFORMED",
            Self::Precondition => "PRECONDITION",
            Self::Fatal => "FATAL",
        }
    }
}

/// Errors raised by catalog, storage, and install operations.
#[derive(Debug, Error)]
pub enum ToolsError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("size mismatch for {artifact}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        artifact: String,
        expected: u64,
        actual: u64,
    },

    #[error("sha256 mismatch for {artifact}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        artifact: String,
        expected: String,
        actual: String,
    },

    #[error("malformed {what}: {reason}")]
    Malformed { what: String, reason: String },

    #[error("{0}")]
    Precondition(String),

    #[error("install failed: {context}: {source}")]
    Install {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl ToolsError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Io { .. } | Self::SizeMismatch { .. } | Self::ChecksumMismatch { .. } => {
                ErrorKind::Transient
            }
            Self::Malformed { .. } => ErrorKind::Malformed,
            Self::Precondition(_) => ErrorKind::Precondition,
            Self::Install { .. } => ErrorKind::Fatal,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Transient I/O failure with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Local filesystem failure during install.
    pub fn install(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Install {
            context: context.into(),
            source,
        }
    }

    /// Malformed data found in `what`.
    pub fn malformed(what: impl Into<String>, reason: impl ToString) -> Self {
        Self::Malformed {
            what: what.into(),
            reason: reason.to_string(),
        }
    }

    /// Decoding failure of the catalog document at `path`.
    pub fn stream(path: &str, err: &StreamError) -> Self {
        Self::malformed(format!("catalog document {path}"), err)
    }
}

impl From<VersionError> for ToolsError {
    fn from(err: VersionError) -> Self {
        match err {
            VersionError::UnknownSeries(_) => Self::Precondition(err.to_string()),
            VersionError::InvalidNumber(_) | VersionError::InvalidBinary(_) => {
                Self::malformed("version", err)
            }
        }
    }
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors raised while validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid namespace {0:?}: must be non-empty and contain no whitespace or ':'")]
    InvalidNamespace(String),

    #[error("Invalid source: {0}")]
    InvalidSource(String),

    #[error("Invalid agent tag '{0}': must match ^[a-z0-9]([a-z0-9-]{{0,61}}[a-z0-9])?$")]
    InvalidAgentTag(String),

    #[error("No agent tag configured. Set agent.tag, TOOLDIST_AGENT_TAG, or pass --tag.")]
    MissingAgentTag,

    #[error("Unknown series '{0}'")]
    UnknownSeries(String),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}
