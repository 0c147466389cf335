//! Application service — constraint lookup across prioritized catalogs.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use tooldist_common::ArtifactDescriptor;

use crate::application::ports::StorageReader;
use crate::application::services::catalog::Catalog;
use crate::domain::{ToolsConstraint, ToolsError, append_matching};

/// Descriptors matching `constraint`, gathered source by source.
///
/// Earlier sources take precedence: a binary already found is not taken
/// again from a later source. Every returned descriptor's `resolved_url`
/// points into the source it came from. An empty result means no match.
///
/// # Errors
///
/// Returns a precondition error for an unknown series, and propagates read
/// failures other than a missing index.
pub async fn select<S: StorageReader>(
    sources: &[Catalog<S>],
    constraint: &ToolsConstraint,
) -> Result<Vec<ArtifactDescriptor>, ToolsError> {
    let mut found = Vec::new();
    for source in sources {
        let products = constraint.product_ids(source.namespace())?;
        let candidates = source.read_products(Some(&products)).await?;
        append_matching(&mut found, candidates, constraint, |path| {
            source.locate(path)
        });
    }
    tracing::debug!(
        sources = sources.len(),
        matches = found.len(),
        filter = ?constraint.filter,
        "selected tools"
    );
    Ok(found)
}
