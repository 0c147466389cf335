use serde::{Deserialize, Serialize};

use crate::series::series_version;
use crate::version::{Binary, Number, VersionError};

/// Metadata describing one published tools tarball.
///
/// `size == 0` marks a descriptor whose size and digest have not been
/// resolved yet. `resolved_url` is derived from the source the descriptor
/// was read from and is never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    pub release: String,
    pub version: Number,
    pub arch: String,
    #[serde(default)]
    pub size: u64,
    pub path: String,
    #[serde(skip)]
    pub resolved_url: Option<String>,
    #[serde(rename = "ftype")]
    pub file_type: String,
    #[serde(default)]
    pub sha256: String,
}

impl ArtifactDescriptor {
    /// Identity key of the descriptor.
    #[must_use]
    pub fn binary(&self) -> Binary {
        Binary::new(self.version.clone(), &self.release, &self.arch)
    }

    /// Whether size and digest are known.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.size > 0
    }

    /// Product stream this descriptor belongs to.
    ///
    /// # Errors
    ///
    /// Returns an error if the release series is unknown.
    pub fn product_id(&self, namespace: &str) -> Result<String, VersionError> {
        product_id(namespace, &self.release, &self.arch)
    }
}

/// A tools tarball known to a publisher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub version: Binary,
    /// Where the tarball can be fetched from, if known.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub sha256: String,
}

impl Artifact {
    /// An artifact whose size and digest are not yet known.
    #[must_use]
    pub fn unresolved(version: Binary) -> Self {
        Self {
            version,
            url: String::new(),
            size: 0,
            sha256: String::new(),
        }
    }
}

/// Build the product stream id for a series and architecture.
///
/// # Errors
///
/// Returns an error if the series is unknown.
pub fn product_id(namespace: &str, series: &str, arch: &str) -> Result<String, VersionError> {
    Ok(format!("{namespace}:{}:{arch}", series_version(series)?))
}
