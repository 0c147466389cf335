//! Version constraints and descriptor matching.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `tokio`, `std::fs`, `std::process`, or `std::net`.

use std::collections::BTreeSet;

use tooldist_common::{ArtifactDescriptor, Binary, Number, VersionError, product_id};

/// Series and architectures a lookup is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupParams {
    pub series: Vec<String>,
    pub arches: Vec<String>,
}

/// Which versions a lookup accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionFilter {
    /// Only this exact version.
    Exact(Number),
    /// A version family. `None` leaves the field unconstrained.
    Family {
        major: Option<u32>,
        minor: Option<u32>,
        released_only: bool,
    },
}

impl VersionFilter {
    #[must_use]
    pub fn accepts(&self, version: &Number) -> bool {
        match self {
            Self::Exact(target) => version == target,
            Self::Family {
                major,
                minor,
                released_only,
            } => {
                if *released_only && version.is_dev() {
                    return false;
                }
                if major.is_some_and(|m| m != version.major) {
                    return false;
                }
                !minor.is_some_and(|m| m != version.minor)
            }
        }
    }
}

/// A catalog lookup: scope plus version filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolsConstraint {
    pub params: LookupParams,
    pub filter: VersionFilter,
}

impl ToolsConstraint {
    /// Exact-version lookup for the given scope.
    #[must_use]
    pub fn exact(version: Number, params: LookupParams) -> Self {
        Self {
            params,
            filter: VersionFilter::Exact(version),
        }
    }

    /// Family lookup for the given scope.
    #[must_use]
    pub fn family(
        major: Option<u32>,
        minor: Option<u32>,
        released_only: bool,
        params: LookupParams,
    ) -> Self {
        Self {
            params,
            filter: VersionFilter::Family {
                major,
                minor,
                released_only,
            },
        }
    }

    /// Product stream ids for every requested series × arch.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::UnknownSeries`] for a series missing from the
    /// series table.
    pub fn product_ids(&self, namespace: &str) -> Result<BTreeSet<String>, VersionError> {
        let mut ids = BTreeSet::new();
        for series in &self.params.series {
            for arch in &self.params.arches {
                ids.insert(product_id(namespace, series, arch)?);
            }
        }
        Ok(ids)
    }

    /// Whether a descriptor satisfies both the series scope and the version
    /// filter. Architecture scoping happens through the product ids.
    #[must_use]
    pub fn matches(&self, desc: &ArtifactDescriptor) -> bool {
        self.params.series.iter().any(|s| *s == desc.release)
            && self.filter.accepts(&desc.version)
    }
}

/// Append the candidates matching `constraint` to `acc`.
///
/// A candidate whose identity key is already in `acc` is discarded, so the
/// first source to contribute a binary wins. Each kept descriptor has its
/// `resolved_url` recomputed from `locate`.
pub fn append_matching<F>(
    acc: &mut Vec<ArtifactDescriptor>,
    candidates: impl IntoIterator<Item = ArtifactDescriptor>,
    constraint: &ToolsConstraint,
    locate: F,
) where
    F: Fn(&str) -> String,
{
    let mut seen: BTreeSet<Binary> = acc.iter().map(ArtifactDescriptor::binary).collect();
    for mut desc in candidates {
        if !constraint.matches(&desc) {
            continue;
        }
        if !seen.insert(desc.binary()) {
            continue;
        }
        desc.resolved_url = Some(locate(&desc.path));
        acc.push(desc);
    }
}
